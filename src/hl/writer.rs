// Writers for the extracted rows (CSV) and the highlighted report (XLSX).

use std::fs;
use std::path::{Path, PathBuf};

use attendance_core::{Cell, HighlightedOutput};
use log::{debug, warn};
use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, Worksheet, XlsxError};
use snafu::prelude::*;

use crate::hl::*;

/// The fill of highlighted cells.
pub const HIGHLIGHT_COLOR: u32 = 0xFFFF00;

/// Writes the rows as read from the document, before any header handling.
pub fn write_csv(rows: &[Vec<Cell>], path: &Path) -> HlResult<()> {
    let p = path.display().to_string();
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .context(CsvWriteSnafu { path: p.clone() })?;
    for row in rows {
        let record: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        wtr.write_record(&record)
            .context(CsvWriteSnafu { path: p.clone() })?;
    }
    wtr.flush().context(IoSnafu { path: p })?;
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    match (cell, format) {
        (Cell::Empty, None) => {}
        (Cell::Empty, Some(f)) => {
            worksheet.write_blank(row, col, f)?;
        }
        (Cell::Int(i), None) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        (Cell::Int(i), Some(f)) => {
            worksheet.write_number_with_format(row, col, *i as f64, f)?;
        }
        (Cell::Float(x), None) => {
            worksheet.write_number(row, col, *x)?;
        }
        (Cell::Float(x), Some(f)) => {
            worksheet.write_number_with_format(row, col, *x, f)?;
        }
        (Cell::Text(s), None) => {
            worksheet.write_string(row, col, s)?;
        }
        (Cell::Text(s), Some(f)) => {
            worksheet.write_string_with_format(row, col, s, f)?;
        }
    }
    Ok(())
}

fn column_index(col: usize) -> Result<u16, XlsxError> {
    u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)
}

fn build_workbook(output: &HighlightedOutput) -> Result<Workbook, XlsxError> {
    let highlight = Format::new()
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(HIGHLIGHT_COLOR));
    let header_format = Format::new().set_bold();

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Attendance")?;

    for (col, label) in output.table.header().labels().iter().enumerate() {
        if label.is_empty() {
            continue;
        }
        worksheet.write_string_with_format(0, column_index(col)?, label, &header_format)?;
    }
    for (idx, cells) in output.table.rows().iter().enumerate() {
        let row = u32::try_from(idx + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (col, cell) in cells.iter().enumerate() {
            let format = if output.is_marked(idx, col) {
                Some(&highlight)
            } else {
                None
            };
            write_cell(worksheet, row, column_index(col)?, cell, format)?;
        }
    }
    Ok(workbook)
}

/// Writes the highlighted report.
///
/// The workbook is first saved next to the destination and then renamed, so that an
/// interrupted write never leaves a complete-looking file behind.
pub fn write_highlighted(output: &HighlightedOutput, path: &Path) -> HlResult<()> {
    let p = path.display().to_string();
    if let Some(parent) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context(IoSnafu {
            path: parent.display().to_string(),
        })?;
    }
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".partial");
    let tmp = PathBuf::from(tmp_name);

    let saved = build_workbook(output).and_then(|mut wb| wb.save(&tmp));
    if let Err(e) = saved {
        warn!("write_highlighted: could not write {}: {}", p, e);
        let _ = fs::remove_file(&tmp);
        return Err(e).context(WritingXlsxSnafu { path: p });
    }
    debug!("write_highlighted: renaming {:?} to {:?}", tmp, path);
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e).context(IoSnafu { path: p });
    }
    Ok(())
}
