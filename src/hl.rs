use log::{debug, info, warn};

use attendance_core::events::LogSink;
use attendance_core::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::hl::config_reader::*;
use crate::hl::io_common::RequestDirs;

mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;
mod io_pdf;
mod server;
mod writer;

#[derive(Debug, Snafu)]
pub enum HlError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a number for {key}"))]
    ParsingJsonNumber { key: String },

    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of the CSV file"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error writing CSV file {path}"))]
    CsvWrite { source: csv::Error, path: String },

    #[snafu(display("Error opening spreadsheet {path}"))]
    OpeningExcel {
        source: calamine::Error,
        path: String,
    },
    #[snafu(display("The spreadsheet {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("The spreadsheet {path} has no worksheet named {name}"))]
    MissingWorksheet { path: String, name: String },

    #[snafu(display("Error extracting text from {path}"))]
    PdfExtract {
        source: pdf_extract::OutputError,
        path: String,
    },
    #[snafu(display("Text extraction crashed on {path}"))]
    PdfPanicked { path: String },
    #[snafu(display("Could not run {command}"))]
    OcrCommand {
        source: std::io::Error,
        command: String,
    },
    #[snafu(display("{command} failed: {status}"))]
    OcrFailed { command: String, status: String },

    #[snafu(display("No table found in {path}"))]
    EmptyDocument { path: String },
    #[snafu(display("Unsupported file format: {path}"))]
    UnsupportedFormat { path: String },

    #[snafu(display("Error writing spreadsheet {path}"))]
    WritingXlsx {
        source: rust_xlsxwriter::XlsxError,
        path: String,
    },
    #[snafu(display("I/O error on {path}"))]
    Io {
        source: std::io::Error,
        path: String,
    },

    #[snafu(display("{source}"))]
    Attendance { source: AttendanceError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

impl HlError {
    /// Errors caused by the uploaded data or by the request, as opposed to failures of
    /// the readers and writers.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            HlError::Attendance { .. }
                | HlError::UnsupportedFormat { .. }
                | HlError::EmptyDocument { .. }
        )
    }
}

type HlResult<T> = Result<T, HlError>;

/// The files produced for one request.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// The name of the per-upload folders, under the csv and excel directories.
    pub dir_name: String,
    pub csv_path: PathBuf,
    pub excel_path: PathBuf,
    pub output: HighlightedOutput,
}

/// Reads the rows of a document, choosing the reader from the file extension.
///
/// `work_dir` receives the intermediate files (page images of scanned documents).
pub fn read_document(
    path: &Path,
    config: &AppConfig,
    work_dir: &Path,
) -> HlResult<Vec<Vec<Cell>>> {
    let p = path.display().to_string();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    info!("Attempting to read document {:?}", p);
    let rows = match extension.as_deref() {
        Some("csv") => io_csv::read_csv_rows(path)?,
        Some("xlsx") | Some("xls") | Some("xlsb") | Some("ods") => {
            io_excel::read_excel_rows(path, config.excel_worksheet_name.as_deref())?
        }
        Some("pdf") => io_pdf::read_pdf_rows(path, config, work_dir)?,
        _ => return UnsupportedFormatSnafu { path: p }.fail(),
    };
    debug!("read_document: {} rows", rows.len());
    if rows.is_empty() {
        return EmptyDocumentSnafu { path: p }.fail();
    }
    Ok(rows)
}

/// Processes one document: extraction, highlighting and output files.
///
/// `out` overrides the location of the highlighted spreadsheet (a file, or a directory).
pub fn run_file(
    input: &Path,
    request: &AttendanceRequest,
    config: &AppConfig,
    out: Option<&Path>,
) -> HlResult<Outcome> {
    let p = input.display().to_string();
    let bytes = fs::read(input).context(IoSnafu { path: p })?;
    let file_name = io_common::simplify_file_name(input);
    let dirs = RequestDirs::create(config, &file_name, &bytes)?;

    let rows = read_document(input, config, &dirs.csv_dir)?;
    let csv_path = dirs.csv_dir.join(io_common::CSV_FILE_NAME);
    writer::write_csv(&rows, &csv_path)?;

    let output =
        process_observed(rows, request, &config.settings()?, &LogSink).context(AttendanceSnafu {})?;

    let output_name = io_common::output_file_name(request);
    let excel_path = match out {
        Some(o) if o.is_dir() => o.join(&output_name),
        Some(o) => o.to_path_buf(),
        None => dirs.excel_dir.join(&output_name),
    };
    writer::write_highlighted(&output, &excel_path)?;
    info!(
        "Wrote {} highlighted cells to {}",
        output.marks.len(),
        excel_path.display()
    );
    Ok(Outcome {
        dir_name: dirs.name,
        csv_path,
        excel_path,
        output,
    })
}

/// The list of highlighted cells, in JSON. Rows are numbered like in the output spreadsheet
/// (the header is row 1).
pub fn build_summary_js(request: &AttendanceRequest, output: &HighlightedOutput) -> JSValue {
    let highlighted: Vec<JSValue> = output
        .marks
        .iter()
        .map(|pos| {
            let value = output
                .table
                .cell(pos.row, pos.column)
                .and_then(|c| c.as_number());
            json!({ "row": pos.row + 2, "value": value })
        })
        .collect();
    json!({
        "subject": request.subject(),
        "attendanceType": request.attendance_type().map(|t| t.code()),
        "targetColumn": output.target_column,
        "targetLabel": output.table.header().label(output.target_column),
        "threshold": output.threshold,
        "highlighted": highlighted,
    })
}

fn read_summary(path: &str) -> HlResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

/// One line per subject of the header: column, label and the attendance types available.
fn subject_lines(input: &Path, config: &AppConfig) -> HlResult<Vec<String>> {
    let p = input.display().to_string();
    let bytes = fs::read(input).context(IoSnafu { path: p })?;
    let dirs = RequestDirs::create(config, &io_common::simplify_file_name(input), &bytes)?;
    let rows = read_document(input, config, &dirs.csv_dir)?;
    let table = ingest(rows, config.header_skip_count()?).context(AttendanceSnafu {})?;
    let lines = table
        .header()
        .subjects()
        .into_iter()
        .map(|(idx, label, layout)| {
            let kinds = match layout {
                ColumnLayout::TheoryOnly => "TH",
                ColumnLayout::TheoryAndLab => "TH, LAB",
            };
            format!("{:>4}  {}  ({})", idx, label, kinds)
        })
        .collect();
    Ok(lines)
}

fn build_config(args: &Args) -> HlResult<AppConfig> {
    let mut config = match &args.config {
        Some(p) => read_config(p)?,
        None => AppConfig::default(),
    };
    if let Some(b) = &args.bind {
        config.bind = Some(b.clone());
    }
    if let Some(n) = args.header_skip_count {
        config.header_skip_count = Some(json!(n));
    }
    if let Some(t) = args.threshold {
        config.threshold = Some(json!(t));
    }
    debug!("build_config: {:?}", config);
    Ok(config)
}

/// Entry point of the command line.
pub fn run(args: &Args) -> HlResult<()> {
    let config = build_config(args)?;

    if args.serve {
        return server::serve(&config);
    }

    let input = match &args.input {
        Some(i) => PathBuf::from(i),
        None => whatever!("An input file is required (--input), or --serve to start the server"),
    };

    if args.list_subjects {
        for line in subject_lines(&input, &config)? {
            println!("{}", line);
        }
        return Ok(());
    }

    let subject = match &args.subject {
        Some(s) => s.clone(),
        None => whatever!("A subject is required (--subject)"),
    };
    let request = AttendanceRequest::new(
        &subject,
        args.attendance_type.as_deref(),
        args.highlight_last_column,
    )
    .context(AttendanceSnafu {})?;

    let outcome = run_file(&input, &request, &config, args.out.as_deref().map(Path::new))?;

    let result_js = build_summary_js(&request, &outcome.output);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    println!("{}", pretty_js_stats);
    println!("output: {}", outcome.excel_path.display());

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }
    Ok(())
}
