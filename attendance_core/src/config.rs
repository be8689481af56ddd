// ********* Input data structures ***********

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::Display;

/// The content of a single cell, as produced by the document readers.
///
/// Text readers (csv, pdf, ocr) only produce text; numbers are recovered
/// when the table is ingested.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Builds a cell from raw text, turning numbers into numeric cells.
    pub fn from_text(s: &str) -> Cell {
        let t = s.trim();
        if t.is_empty() {
            Cell::Empty
        } else if let Ok(i) = t.parse::<i64>() {
            Cell::Int(i)
        } else if let Ok(f) = t.parse::<f64>() {
            // "nan" and "inf" parse as floats but are not attendance figures.
            if f.is_finite() {
                Cell::Float(f)
            } else {
                Cell::Text(t.to_string())
            }
        } else {
            Cell::Text(s.to_string())
        }
    }

    /// The numeric value, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            Cell::Empty | Cell::Text(_) => None,
        }
    }

    /// Converts a text cell into a numeric one when possible.
    pub(crate) fn normalized(self) -> Cell {
        match self {
            Cell::Text(s) => Cell::from_text(&s),
            c => c,
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(x) => write!(f, "{}", x),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

/// The kind of attendance that is requested for a subject.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum AttendanceType {
    Theory,
    Lab,
}

impl AttendanceType {
    /// Parses the selector sent by users: `TH`, `THEORY` or `LAB`, in any case.
    pub fn parse(s: &str) -> Result<AttendanceType, AttendanceError> {
        match s.trim().to_uppercase().as_str() {
            "TH" | "THEORY" => Ok(AttendanceType::Theory),
            "LAB" => Ok(AttendanceType::Lab),
            x => Err(AttendanceError::InvalidRequest {
                reason: format!("unknown attendance type {:?} (expected TH or LAB)", x),
            }),
        }
    }

    /// Short code used in file names and summaries.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceType::Theory => "TH",
            AttendanceType::Lab => "LAB",
        }
    }
}

/// The subject that selects the last column of the table.
pub const TOTAL_SUBJECT: &str = "TOTAL";

/// A validated request for one subject.
///
/// Invariant: `attendance_type` is set unless the subject is `TOTAL`, in which case
/// `highlight_last_column` is always true.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AttendanceRequest {
    subject: String,
    attendance_type: Option<AttendanceType>,
    highlight_last_column: bool,
}

impl AttendanceRequest {
    pub fn new(
        subject: &str,
        attendance_type: Option<&str>,
        highlight_last_column: bool,
    ) -> Result<AttendanceRequest, AttendanceError> {
        let subject = subject.trim().to_uppercase();
        if subject.is_empty() {
            return Err(AttendanceError::InvalidRequest {
                reason: "a subject is required".to_string(),
            });
        }
        if subject == TOTAL_SUBJECT {
            return Ok(AttendanceRequest {
                subject,
                attendance_type: None,
                highlight_last_column: true,
            });
        }
        let attendance_type = match attendance_type {
            Some(s) if !s.trim().is_empty() => AttendanceType::parse(s)?,
            _ => {
                return Err(AttendanceError::InvalidRequest {
                    reason: format!(
                        "attendance type is required when subject is not \"{}\"",
                        TOTAL_SUBJECT
                    ),
                })
            }
        };
        Ok(AttendanceRequest {
            subject,
            attendance_type: Some(attendance_type),
            highlight_last_column,
        })
    }

    /// The normalized (trimmed, uppercased) subject.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn attendance_type(&self) -> Option<AttendanceType> {
        self.attendance_type
    }

    pub fn highlight_last_column(&self) -> bool {
        self.highlight_last_column
    }

    pub fn is_total(&self) -> bool {
        self.subject == TOTAL_SUBJECT
    }
}

// ********* Table data structures ***********

/// How the columns following a subject label are grouped.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ColumnLayout {
    /// Only the (total, attended, percentage) theory block.
    TheoryOnly,
    /// A theory block followed by a lab block under the same merged label.
    TheoryAndLab,
}

/// Labels that stand for a cell of a merged header.
pub fn is_placeholder_label(label: &str) -> bool {
    let t = label.trim();
    t.is_empty() || t.starts_with("Unnamed")
}

/// The header row of a table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Header {
    labels: Vec<String>,
    keys: Vec<String>,
    // One entry per labelled column, None for placeholders.
    layouts: Vec<Option<ColumnLayout>>,
}

impl Header {
    pub fn new(labels: &[String]) -> Header {
        let labels: Vec<String> = labels.iter().map(|s| s.trim().to_string()).collect();
        let keys: Vec<String> = labels.iter().map(|s| s.to_uppercase()).collect();
        let layouts = (0..labels.len())
            .map(|idx| {
                if is_placeholder_label(&labels[idx]) {
                    None
                } else if labels
                    .get(idx + 3)
                    .map(|l| is_placeholder_label(l))
                    .unwrap_or(false)
                {
                    Some(ColumnLayout::TheoryAndLab)
                } else {
                    Some(ColumnLayout::TheoryOnly)
                }
            })
            .collect();
        Header {
            labels,
            keys,
            layouts,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The trimmed labels, with their original casing.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, column: usize) -> Option<&str> {
        self.labels.get(column).map(|s| s.as_str())
    }

    /// The first column whose label matches the given key (already uppercased).
    pub(crate) fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    pub fn layout(&self, column: usize) -> Option<ColumnLayout> {
        self.layouts.get(column).cloned().flatten()
    }

    /// All the labelled columns with their layout, in order.
    pub fn subjects(&self) -> Vec<(usize, &str, ColumnLayout)> {
        self.layouts
            .iter()
            .enumerate()
            .filter_map(|(idx, l)| l.map(|l| (idx, self.labels[idx].as_str(), l)))
            .collect()
    }
}

/// A rectangular table: a header and data rows of the same width.
#[derive(PartialEq, Debug, Clone)]
pub struct Table {
    pub(crate) header: Header,
    pub(crate) rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}

/// The (total, attended, percentage) columns of one attendance block.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct ColumnTriplet {
    pub total: usize,
    pub attended: usize,
    pub percentage: usize,
}

impl ColumnTriplet {
    pub(crate) fn starting_at(column: usize) -> ColumnTriplet {
        ColumnTriplet {
            total: column,
            attended: column + 1,
            percentage: column + 2,
        }
    }
}

/// The column that receives the highlight pass.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum HighlightTarget {
    LastColumn,
    Triplet(ColumnTriplet),
}

// ******** Output data structures *********

/// A marked cell. `row` counts data rows only (the header is not a row here).
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct CellPosition {
    pub row: usize,
    pub column: usize,
}

#[derive(PartialEq, Debug, Clone)]
pub struct HighlightedOutput {
    pub table: Table,
    pub target_column: usize,
    pub threshold: f64,
    pub marks: BTreeSet<CellPosition>,
}

impl HighlightedOutput {
    pub fn is_marked(&self, row: usize, column: usize) -> bool {
        self.marks.contains(&CellPosition { row, column })
    }
}

/// Errors caused by the content of the table or by the request.
///
/// None of them are transient: retrying with the same input fails the same way.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AttendanceError {
    EmptyTable,
    SubjectNotFound { subject: String },
    NoLabData { subject: String },
    ColumnOutOfRange { column: usize, width: usize },
    InvalidRequest { reason: String },
}

impl Error for AttendanceError {}

impl Display for AttendanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceError::EmptyTable => {
                write!(f, "The table is empty after skipping the header rows.")
            }
            AttendanceError::SubjectNotFound { subject } => {
                write!(f, "Attendance data for subject {} not found.", subject)
            }
            AttendanceError::NoLabData { subject } => {
                write!(f, "The subject {} does not have Lab attendance data.", subject)
            }
            AttendanceError::ColumnOutOfRange { column, width } => write!(
                f,
                "Column {} is out of range (the table has {} columns).",
                column, width
            ),
            AttendanceError::InvalidRequest { reason } => write!(f, "Invalid request: {}", reason),
        }
    }
}

// ********* Configuration **********

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Settings {
    /// Rows dropped before the header row (metadata rows of the source documents).
    pub header_skip_count: usize,
    /// Percentages strictly below this value are highlighted.
    pub threshold: f64,
}

impl Settings {
    pub const DEFAULT_SETTINGS: Settings = Settings {
        header_skip_count: 5,
        threshold: 60.0,
    };
}

impl Default for Settings {
    fn default() -> Self {
        Settings::DEFAULT_SETTINGS
    }
}
