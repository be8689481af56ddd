use clap::Parser;

/// Highlights the students whose attendance falls below the threshold in an attendance report.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file (folders, header rows to skip, threshold,
    /// OCR commands). See the manual for the list of keys.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The attendance report: a PDF (text or scanned), an Excel/ODS spreadsheet or a
    /// CSV file.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// The subject to check, as written in the header of the report (case does not matter).
    /// Use TOTAL to check the last column of the report.
    #[clap(short, long, value_parser)]
    pub subject: Option<String>,

    /// TH (theory) or LAB. Required unless the subject is TOTAL.
    #[clap(short = 't', long, value_parser)]
    pub attendance_type: Option<String>,

    /// If passed as an argument, the last column of the report is highlighted instead of the
    /// percentage column of the subject.
    #[clap(long, takes_value = false)]
    pub highlight_last_column: bool,

    /// (file path or directory, optional) Where to write the highlighted spreadsheet. By default
    /// it is written in the excel folder of the configuration.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, attnhl will check that the
    /// highlighted cells match the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// Prints the subjects found in the header of the report and exits.
    #[clap(long, takes_value = false)]
    pub list_subjects: bool,

    /// Runs the HTTP server instead of processing a single file.
    #[clap(long, takes_value = false)]
    pub serve: bool,

    /// (host:port) The address of the HTTP server. Overrides the configuration file.
    #[clap(long, value_parser)]
    pub bind: Option<String>,

    /// The number of metadata rows before the header. Overrides the configuration file.
    #[clap(long, value_parser)]
    pub header_skip_count: Option<usize>,

    /// Percentages strictly below this value are highlighted. Overrides the configuration file.
    #[clap(long, value_parser)]
    pub threshold: Option<f64>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
