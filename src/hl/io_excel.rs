use std::path::Path;

use attendance_core::Cell;
use calamine::{open_workbook_auto, DataType, Reader};
use log::debug;
use snafu::prelude::*;

use crate::hl::*;

/// Reads the rows of a worksheet: the named one, or the first one.
pub fn read_excel_rows(path: &Path, worksheet: Option<&str>) -> HlResult<Vec<Vec<Cell>>> {
    let p = path.display().to_string();
    let mut workbook = open_workbook_auto(path).context(OpeningExcelSnafu { path: p.clone() })?;
    let wrange = match worksheet {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu {
                path: p.clone(),
                name,
            })?
            .context(OpeningExcelSnafu { path: p.clone() })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path: p.clone() })?
            .context(OpeningExcelSnafu { path: p })?,
    };

    let mut res: Vec<Vec<Cell>> = Vec::new();
    for (idx, row) in wrange.rows().enumerate() {
        debug!("read_excel_rows: idx: {:?} row: {:?}", idx, row);
        res.push(row.iter().map(read_cell_calamine).collect());
    }
    Ok(res)
}

fn read_cell_calamine(cell: &DataType) -> Cell {
    match cell {
        DataType::Int(i) => Cell::Int(*i),
        DataType::Float(f) => Cell::Float(*f),
        DataType::String(s) => Cell::Text(s.clone()),
        DataType::Bool(b) => Cell::Text(b.to_string()),
        // Dates are not attendance figures: keep them as the serial number text.
        DataType::DateTime(f) => Cell::Text(f.to_string()),
        DataType::Empty => Cell::Empty,
        #[allow(unreachable_patterns)]
        _ => Cell::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_conversion() {
        assert_eq!(read_cell_calamine(&DataType::Int(7)), Cell::Int(7));
        assert_eq!(read_cell_calamine(&DataType::Float(59.9)), Cell::Float(59.9));
        assert_eq!(
            read_cell_calamine(&DataType::String("CN".to_string())),
            Cell::Text("CN".to_string())
        );
        assert_eq!(read_cell_calamine(&DataType::Empty), Cell::Empty);
    }

    #[test]
    fn missing_file() {
        let root = crate::hl::tests::test_dir("excel-missing");
        assert!(matches!(
            read_excel_rows(&root.join("nope.xlsx"), None),
            Err(HlError::OpeningExcel { .. })
        ));
    }
}
