// Primitives for reading CSV files.

use std::path::Path;

use attendance_core::Cell;
use log::debug;
use snafu::prelude::*;

use crate::hl::*;

/// Reads all the records of a CSV file. Rows may have different lengths.
pub fn read_csv_rows(path: &Path) -> HlResult<Vec<Vec<Cell>>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu {
            path: path.display().to_string(),
        })?;

    let mut res: Vec<Vec<Cell>> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        let lineno = idx + 1;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        debug!("read_csv_rows: lineno: {:?} row: {:?}", lineno, line);
        res.push(line.iter().map(|s| Cell::Text(s.to_string())).collect());
    }
    Ok(res)
}
