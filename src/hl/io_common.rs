use std::fs;
use std::path::{Path, PathBuf};

use attendance_core::AttendanceRequest;
use log::debug;
use snafu::prelude::*;

use crate::hl::config_reader::AppConfig;
use crate::hl::*;

pub const CSV_FILE_NAME: &str = "data.csv";

pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Keeps the last path component and replaces the unusual characters.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// The name of the folders of one upload: the file stem and a digest of the content.
pub fn upload_dir_name(file_name: &str, content: &[u8]) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let digest = sha256::digest(content);
    format!("{}-{}", sanitize_file_name(&stem), &digest[..12])
}

/// The name of the highlighted spreadsheet for a request.
pub fn output_file_name(request: &AttendanceRequest) -> String {
    let subject = sanitize_file_name(request.subject());
    match request.attendance_type() {
        Some(t) if !request.is_total() => {
            format!("{}_{}_highlighted_attendance.xlsx", subject, t.code())
        }
        _ => format!("{}_highlighted_attendance.xlsx", subject),
    }
}

/// The output folders of one upload.
#[derive(Debug, Clone)]
pub struct RequestDirs {
    pub name: String,
    pub csv_dir: PathBuf,
    pub excel_dir: PathBuf,
}

impl RequestDirs {
    pub fn create(config: &AppConfig, file_name: &str, content: &[u8]) -> HlResult<RequestDirs> {
        let name = upload_dir_name(file_name, content);
        let csv_dir = config.csv_dir().join(&name);
        let excel_dir = config.excel_dir().join(&name);
        for d in [&csv_dir, &excel_dir] {
            fs::create_dir_all(d).context(IoSnafu {
                path: d.display().to_string(),
            })?;
        }
        debug!("RequestDirs: {:?} {:?}", csv_dir, excel_dir);
        Ok(RequestDirs {
            name,
            csv_dir,
            excel_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize() {
        assert_eq!(sanitize_file_name("report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\Sem 5 (A).xlsx"), "Sem_5__A_.xlsx");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[test]
    fn upload_dirs_depend_on_content() {
        let a = upload_dir_name("report.pdf", b"first");
        let b = upload_dir_name("report.pdf", b"second");
        assert!(a.starts_with("report-"));
        assert_eq!(a.len(), "report-".len() + 12);
        assert_ne!(a, b);
        assert_eq!(a, upload_dir_name("report.pdf", b"first"));
    }

    #[test]
    fn output_names() {
        let req = AttendanceRequest::new("dbms", Some("th"), false).unwrap();
        assert_eq!(output_file_name(&req), "DBMS_TH_highlighted_attendance.xlsx");
        let req = AttendanceRequest::new("Total", None, false).unwrap();
        assert_eq!(output_file_name(&req), "TOTAL_highlighted_attendance.xlsx");
    }

    #[test]
    fn creates_dirs() {
        let root = crate::hl::tests::test_dir("dirs");
        let config = crate::hl::tests::test_config(&root);
        let dirs = RequestDirs::create(&config, "report.csv", b"a,b").unwrap();
        assert!(dirs.csv_dir.is_dir());
        assert!(dirs.excel_dir.is_dir());
        assert!(dirs.excel_dir.ends_with(&dirs.name));
    }
}
