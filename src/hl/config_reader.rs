use crate::hl::*;

use attendance_core::Settings;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use snafu::prelude::*;
use std::fs;
use std::path::PathBuf;

/// The configuration file. All the keys are optional.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(rename = "uploadDirectory")]
    pub upload_directory: Option<String>,
    #[serde(rename = "csvDirectory")]
    pub csv_directory: Option<String>,
    #[serde(rename = "excelDirectory")]
    pub excel_directory: Option<String>,
    #[serde(rename = "headerSkipCount")]
    pub header_skip_count: Option<JSValue>,
    #[serde(rename = "threshold")]
    pub threshold: Option<JSValue>,
    #[serde(rename = "bind")]
    pub bind: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "pdftoppmCommand")]
    pub pdftoppm_command: Option<String>,
    #[serde(rename = "tesseractCommand")]
    pub tesseract_command: Option<String>,
    #[serde(rename = "maxUploadBytes")]
    pub max_upload_bytes: Option<JSValue>,
}

/// Uploads larger than this are refused unless configured otherwise.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

impl AppConfig {
    pub fn upload_dir(&self) -> PathBuf {
        PathBuf::from(self.upload_directory.as_deref().unwrap_or("uploads"))
    }

    pub fn csv_dir(&self) -> PathBuf {
        PathBuf::from(self.csv_directory.as_deref().unwrap_or("csv"))
    }

    pub fn excel_dir(&self) -> PathBuf {
        PathBuf::from(self.excel_directory.as_deref().unwrap_or("excel"))
    }

    pub fn bind_address(&self) -> String {
        self.bind
            .clone()
            .unwrap_or_else(|| "127.0.0.1:5000".to_string())
    }

    pub fn pdftoppm(&self) -> &str {
        self.pdftoppm_command.as_deref().unwrap_or("pdftoppm")
    }

    pub fn tesseract(&self) -> &str {
        self.tesseract_command.as_deref().unwrap_or("tesseract")
    }

    pub fn header_skip_count(&self) -> HlResult<usize> {
        match &self.header_skip_count {
            None => Ok(Settings::DEFAULT_SETTINGS.header_skip_count),
            x => read_js_int(x, "headerSkipCount"),
        }
    }

    pub fn threshold(&self) -> HlResult<f64> {
        match &self.threshold {
            None => Ok(Settings::DEFAULT_SETTINGS.threshold),
            x => read_js_float(x, "threshold"),
        }
    }

    pub fn max_upload_bytes(&self) -> HlResult<usize> {
        match &self.max_upload_bytes {
            None => Ok(DEFAULT_MAX_UPLOAD_BYTES),
            x => read_js_int(x, "maxUploadBytes"),
        }
    }

    pub fn settings(&self) -> HlResult<Settings> {
        Ok(Settings {
            header_skip_count: self.header_skip_count()?,
            threshold: self.threshold()?,
        })
    }
}

pub fn read_config(path: &str) -> HlResult<AppConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_config: {:?}", contents);
    let config: AppConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    info!("config: {:?}", config);
    // Fail early on malformed numbers.
    config.settings()?;
    config.max_upload_bytes()?;
    Ok(config)
}

fn read_js_int(x: &Option<JSValue>, key: &str) -> HlResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu { key }),
        Some(JSValue::String(s)) => s
            .trim()
            .parse::<usize>()
            .ok()
            .context(ParsingJsonNumberSnafu { key }),
        _ => None.context(ParsingJsonNumberSnafu { key }),
    }
}

fn read_js_float(x: &Option<JSValue>, key: &str) -> HlResult<f64> {
    match x {
        Some(JSValue::Number(n)) => n.as_f64().context(ParsingJsonNumberSnafu { key }),
        Some(JSValue::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .context(ParsingJsonNumberSnafu { key }),
        _ => None.context(ParsingJsonNumberSnafu { key }),
    }
}
