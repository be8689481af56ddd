/*!
Column resolution and highlighting for attendance tables.

Attendance reports exported from student information systems are wide tables: a few
identification columns, then for every subject a block of `(total, attended, percentage)`
columns, sometimes followed by a second block for the lab sessions of the same subject.
Only the first column of a block carries the subject name; the other cells of the
merged header are blank.

This crate finds the columns of a given subject and marks the percentages that fall
below a threshold:

```
use attendance_core::*;

let rows: Vec<Vec<Cell>> = vec![
    vec!["Name", "DBMS", "", "", "TOTAL"],
    vec!["Anna", "30", "28", "93.3", "88"],
    vec!["Bob", "30", "15", "50", "55.5"],
]
.into_iter()
.map(|r| r.into_iter().map(Cell::from_text).collect())
.collect();

let settings = Settings {
    header_skip_count: 0,
    ..Settings::DEFAULT_SETTINGS
};
let request = AttendanceRequest::new("dbms", Some("TH"), false)?;
let output = process(rows, &request, &settings)?;
assert!(output.is_marked(1, 3));
assert!(!output.is_marked(0, 3));
# Ok::<(), AttendanceError>(())
```

See the [manual] for the layouts that are recognized.
*/
mod config;
pub mod builder;
pub mod events;
pub mod manual;
pub mod resolver;

use log::{debug, info};

use std::collections::BTreeSet;

pub use crate::config::*;
use crate::builder::TableBuilder;
use crate::events::{Event, EventSink, LogSink};
pub use crate::resolver::resolve;

/// Builds a table from raw rows, dropping the first `header_skip_count` rows.
///
/// The next row is the header. Fails with [AttendanceError::EmptyTable] when no data row
/// remains.
pub fn ingest(
    raw_rows: Vec<Vec<Cell>>,
    header_skip_count: usize,
) -> Result<Table, AttendanceError> {
    let mut builder = TableBuilder::new(header_skip_count);
    for row in raw_rows {
        builder.add_row(row);
    }
    builder.build()
}

/// Marks the numeric cells of the target column that are strictly below the threshold.
///
/// Cells that are empty or not numbers are never marked.
pub fn highlight(
    table: &Table,
    target: HighlightTarget,
    threshold: f64,
) -> Result<HighlightedOutput, AttendanceError> {
    let width = table.width();
    let column = match target {
        HighlightTarget::LastColumn => match width.checked_sub(1) {
            Some(c) => c,
            None => return Err(AttendanceError::ColumnOutOfRange { column: 0, width }),
        },
        HighlightTarget::Triplet(t) => t.percentage,
    };
    if column >= width {
        return Err(AttendanceError::ColumnOutOfRange { column, width });
    }

    let mut marks: BTreeSet<CellPosition> = BTreeSet::new();
    for (row, cells) in table.rows.iter().enumerate() {
        let value = cells.get(column).and_then(|c| c.as_number());
        if let Some(v) = value {
            if v < threshold {
                debug!("highlight: row {} column {} value {}", row, column, v);
                marks.insert(CellPosition { row, column });
            }
        }
    }
    Ok(HighlightedOutput {
        table: table.clone(),
        target_column: column,
        threshold,
        marks,
    })
}

/// Runs the whole pipeline: ingestion, column resolution and highlighting.
pub fn process(
    raw_rows: Vec<Vec<Cell>>,
    request: &AttendanceRequest,
    settings: &Settings,
) -> Result<HighlightedOutput, AttendanceError> {
    process_observed(raw_rows, request, settings, &LogSink)
}

/// Same as [process], reporting resolution and highlighting events to the sink.
pub fn process_observed(
    raw_rows: Vec<Vec<Cell>>,
    request: &AttendanceRequest,
    settings: &Settings,
    sink: &dyn EventSink,
) -> Result<HighlightedOutput, AttendanceError> {
    info!(
        "Processing {} rows for {:?} (skipping {} rows, threshold {})",
        raw_rows.len(),
        request,
        settings.header_skip_count,
        settings.threshold
    );
    let table = ingest(raw_rows, settings.header_skip_count)?;

    let target = match request.attendance_type() {
        _ if request.highlight_last_column() => HighlightTarget::LastColumn,
        Some(t) => HighlightTarget::Triplet(resolver::resolve_observed(
            table.header(),
            request.subject(),
            t,
            sink,
        )?),
        None => {
            return Err(AttendanceError::InvalidRequest {
                reason: format!("no attendance type for subject {}", request.subject()),
            })
        }
    };

    let output = highlight(&table, target, settings.threshold)?;
    sink.emit(&Event::Highlighted {
        column: output.target_column,
        marked: output.marks.len(),
        threshold: output.threshold,
    });
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn rows(text: &[&[&str]]) -> Vec<Vec<Cell>> {
        text.iter()
            .map(|r| r.iter().map(|s| Cell::from_text(s)).collect())
            .collect()
    }

    // Five metadata rows, then a grouped header and three students.
    fn report() -> Vec<Vec<Cell>> {
        rows(&[
            &["XYZ Institute of Technology"],
            &["Attendance Report"],
            &["Semester: 5", "", "Section: A"],
            &["From: 01/08", "To: 30/09"],
            &[""],
            &[
                "S.No", "Enroll", "Name", "DBMS", "", "", "Batch", "CN", "", "", "", "", "",
                "Overall %",
            ],
            &["1", "E001", "Anna", "30", "28", "93.3", "B1", "20", "19", "95", "5", "4", "80", "90"],
            &["2", "E002", "Bob", "30", "15", "50", "B1", "20", "10", "50", "5", "2", "55", "51.2"],
            &["3", "E003", "Chen", "30", "", "absent", "B2", "20", "12", "60", "5", "5", "", "60"],
        ])
    }

    fn settings() -> Settings {
        Settings::DEFAULT_SETTINGS
    }

    #[test]
    fn theory_scenario() {
        init_logger();
        let req = AttendanceRequest::new("DBMS", Some("TH"), false).unwrap();
        let out = process(report(), &req, &settings()).unwrap();
        assert_eq!(out.target_column, 5);
        assert!(!out.is_marked(0, 5));
        assert!(out.is_marked(1, 5));
        // Non numeric values are skipped.
        assert!(!out.is_marked(2, 5));
        assert_eq!(out.marks.len(), 1);
    }

    #[test]
    fn lab_scenario() {
        init_logger();
        let req = AttendanceRequest::new("cn", Some("lab"), false).unwrap();
        let out = process(report(), &req, &settings()).unwrap();
        assert_eq!(out.target_column, 12);
        assert!(!out.is_marked(0, 12));
        assert!(out.is_marked(1, 12));
        assert!(!out.is_marked(2, 12));
    }

    #[test]
    fn theory_threshold_is_strict() {
        let req = AttendanceRequest::new("CN", Some("THEORY"), false).unwrap();
        let out = process(report(), &req, &settings()).unwrap();
        assert_eq!(out.target_column, 9);
        let marked: Vec<usize> = out.marks.iter().map(|p| p.row).collect();
        assert_eq!(marked, vec![1]);
    }

    #[test]
    fn total_uses_last_column() {
        init_logger();
        // The attendance type is ignored for TOTAL.
        let req = AttendanceRequest::new(" total ", Some("nonsense"), false).unwrap();
        assert!(req.highlight_last_column());
        assert_eq!(req.attendance_type(), None);
        let out = process(report(), &req, &settings()).unwrap();
        assert_eq!(out.target_column, 13);
        let marked: Vec<usize> = out.marks.iter().map(|p| p.row).collect();
        assert_eq!(marked, vec![1]);
    }

    #[test]
    fn last_column_flag() {
        let req = AttendanceRequest::new("DBMS", Some("TH"), true).unwrap();
        let out = process(report(), &req, &settings()).unwrap();
        assert_eq!(out.target_column, 13);
    }

    #[test]
    fn missing_subject() {
        let req = AttendanceRequest::new("PHYSICS", Some("TH"), false).unwrap();
        assert_eq!(
            process(report(), &req, &settings()),
            Err(AttendanceError::SubjectNotFound {
                subject: "PHYSICS".to_string()
            })
        );
    }

    #[test]
    fn no_lab_block() {
        let req = AttendanceRequest::new("DBMS", Some("LAB"), false).unwrap();
        assert_eq!(
            process(report(), &req, &settings()),
            Err(AttendanceError::NoLabData {
                subject: "DBMS".to_string()
            })
        );
    }

    #[test]
    fn empty_table() {
        let mut raw = report();
        raw.truncate(6);
        let req = AttendanceRequest::new("TOTAL", None, false).unwrap();
        assert_eq!(
            process(raw, &req, &settings()),
            Err(AttendanceError::EmptyTable)
        );
    }

    #[test]
    fn request_validation() {
        assert!(matches!(
            AttendanceRequest::new("DBMS", None, false),
            Err(AttendanceError::InvalidRequest { .. })
        ));
        assert!(matches!(
            AttendanceRequest::new("DBMS", Some("  "), false),
            Err(AttendanceError::InvalidRequest { .. })
        ));
        assert!(matches!(
            AttendanceRequest::new("DBMS", Some("practical"), false),
            Err(AttendanceError::InvalidRequest { .. })
        ));
        assert!(matches!(
            AttendanceRequest::new("", Some("TH"), false),
            Err(AttendanceError::InvalidRequest { .. })
        ));
        let req = AttendanceRequest::new(" dbms ", Some(" th"), false).unwrap();
        assert_eq!(req.subject(), "DBMS");
        assert_eq!(req.attendance_type(), Some(AttendanceType::Theory));
    }

    #[test]
    fn highlighting_is_monotonic_in_threshold() {
        let table = ingest(report(), 5).unwrap();
        let mut previous: Option<BTreeSet<CellPosition>> = None;
        for threshold in [0.0, 50.0, 50.5, 55.0, 60.0, 80.0, 95.0, 100.0] {
            let out = highlight(&table, HighlightTarget::LastColumn, threshold).unwrap();
            if let Some(p) = previous {
                assert!(p.is_subset(&out.marks));
            }
            previous = Some(out.marks);
        }
    }

    #[test]
    fn highlight_out_of_range() {
        let table = ingest(report(), 5).unwrap();
        let triplet = ColumnTriplet {
            total: 12,
            attended: 13,
            percentage: 14,
        };
        assert_eq!(
            highlight(&table, HighlightTarget::Triplet(triplet), 60.0),
            Err(AttendanceError::ColumnOutOfRange {
                column: 14,
                width: 14
            })
        );
    }

    #[test]
    fn highlight_keeps_cells() {
        let table = ingest(report(), 5).unwrap();
        let out = highlight(&table, HighlightTarget::LastColumn, 60.0).unwrap();
        assert_eq!(out.table, table);
    }
}
