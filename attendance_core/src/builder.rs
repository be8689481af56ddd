pub use crate::config::*;

use log::debug;

/// A builder for assembling a table one row at a time.
///
/// The first `header_skip_count` rows pushed are dropped, the next one is the header.
///
/// ```
/// use attendance_core::builder::TableBuilder;
/// use attendance_core::Cell;
/// # use attendance_core::AttendanceError;
///
/// let mut builder = TableBuilder::new(1);
/// builder.add_text_row(&["Attendance report, semester 5"]);
/// builder.add_text_row(&["Name", "DBMS", "", ""]);
/// builder.add_text_row(&["Anna", "30", "28", "93.3"]);
/// let table = builder.build()?;
///
/// assert_eq!(table.cell(0, 3), Some(&Cell::Float(93.3)));
/// # Ok::<(), AttendanceError>(())
/// ```
pub struct TableBuilder {
    pub(crate) _header_skip_count: usize,
    pub(crate) _skipped: usize,
    pub(crate) _header: Option<Vec<String>>,
    pub(crate) _rows: Vec<Vec<Cell>>,
}

impl TableBuilder {
    pub fn new(header_skip_count: usize) -> TableBuilder {
        TableBuilder {
            _header_skip_count: header_skip_count,
            _skipped: 0,
            _header: None,
            _rows: Vec::new(),
        }
    }

    /// Adds a row of cells.
    pub fn add_row(&mut self, row: Vec<Cell>) {
        if self._skipped < self._header_skip_count {
            debug!("add_row: skipping metadata row {:?}", row);
            self._skipped += 1;
            return;
        }
        if self._header.is_none() {
            self._header = Some(row.iter().map(|c| c.to_string()).collect());
            return;
        }
        self._rows
            .push(row.into_iter().map(|c| c.normalized()).collect());
    }

    /// Adds a row of raw text cells. Numbers are recognized.
    pub fn add_text_row<S: AsRef<str>>(&mut self, row: &[S]) {
        self.add_row(row.iter().map(|s| Cell::from_text(s.as_ref())).collect())
    }

    /// Builds the table. Fails if there is no header or no data row.
    pub fn build(self) -> Result<Table, AttendanceError> {
        let labels = match self._header {
            Some(h) => h,
            None => return Err(AttendanceError::EmptyTable),
        };
        if self._rows.is_empty() {
            return Err(AttendanceError::EmptyTable);
        }
        let width = self
            ._rows
            .iter()
            .map(|r| r.len())
            .chain(std::iter::once(labels.len()))
            .max()
            .unwrap_or(0);

        let mut labels = labels;
        labels.resize(width, String::new());
        let rows: Vec<Vec<Cell>> = self
            ._rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, Cell::Empty);
                r
            })
            .collect();
        let header = Header::new(&labels);
        debug!(
            "build: {} columns, {} data rows, subjects: {:?}",
            width,
            rows.len(),
            header.subjects()
        );
        Ok(Table { header, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_rows(rows: &[&[&str]]) -> Vec<Vec<Cell>> {
        rows.iter()
            .map(|r| r.iter().map(|s| Cell::Text(s.to_string())).collect())
            .collect()
    }

    #[test]
    fn skips_metadata_rows() {
        let rows = text_rows(&[
            &["University"],
            &["Department"],
            &["Name", "DBMS"],
            &["Anna", "71"],
        ]);
        let table = crate::ingest(rows, 2).unwrap();
        assert_eq!(table.header().labels(), &["Name", "DBMS"]);
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.cell(0, 1), Some(&Cell::Int(71)));
    }

    #[test]
    fn pads_ragged_rows() {
        let rows = text_rows(&[&["Name", "DBMS", "", ""], &["Anna", "30"], &["Bob", "30", "20", "66.7", "x"]]);
        let table = crate::ingest(rows, 0).unwrap();
        assert_eq!(table.width(), 5);
        assert_eq!(table.header().label(4), Some(""));
        assert_eq!(table.cell(0, 3), Some(&Cell::Empty));
        assert_eq!(table.cell(1, 4), Some(&Cell::Text("x".to_string())));
    }

    #[test]
    fn trims_header_labels() {
        let rows = text_rows(&[&["  Name ", " dbms\n"], &["Anna", "12"]]);
        let table = crate::ingest(rows, 0).unwrap();
        assert_eq!(table.header().labels(), &["Name", "dbms"]);
        assert_eq!(table.header().position("DBMS"), Some(1));
    }

    #[test]
    fn empty_after_skip() {
        let rows = text_rows(&[&["a"], &["b"], &["Name", "DBMS"]]);
        assert_eq!(crate::ingest(rows, 2), Err(AttendanceError::EmptyTable));
        assert_eq!(crate::ingest(vec![], 5), Err(AttendanceError::EmptyTable));
    }

    #[test]
    fn keeps_numbers_from_spreadsheets() {
        let rows = vec![
            vec![Cell::Text("Name".to_string()), Cell::Text("TOTAL".to_string())],
            vec![Cell::Text("Anna".to_string()), Cell::Float(59.5)],
        ];
        let table = crate::ingest(rows, 0).unwrap();
        assert_eq!(table.cell(0, 1).and_then(|c| c.as_number()), Some(59.5));
    }
}
