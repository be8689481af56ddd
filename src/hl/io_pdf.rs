// Reading tables out of PDF documents: the text layer first, OCR for scanned documents.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::Command;

use attendance_core::Cell;
use log::{debug, info, warn};
use snafu::prelude::*;

use crate::hl::config_reader::AppConfig;
use crate::hl::*;

pub fn read_pdf_rows(path: &Path, config: &AppConfig, work_dir: &Path) -> HlResult<Vec<Vec<Cell>>> {
    match read_pdf_text(path) {
        Ok(rows) if rows.iter().any(|r| r.len() > 1) => Ok(rows),
        Ok(_) => {
            warn!(
                "No table found in the text of {}, falling back to OCR",
                path.display()
            );
            read_pdf_ocr(path, config, work_dir)
        }
        Err(e) => {
            warn!(
                "Could not extract text from {} ({}), falling back to OCR",
                path.display(),
                e
            );
            read_pdf_ocr(path, config, work_dir)
        }
    }
}

fn read_pdf_text(path: &Path) -> HlResult<Vec<Vec<Cell>>> {
    let p = path.display().to_string();
    // pdf-extract panics on some malformed documents (undefined fonts, broken glyphs).
    let extracted = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text(path)));
    let text = match extracted {
        Ok(res) => res.context(PdfExtractSnafu { path: p })?,
        Err(_) => return PdfPanickedSnafu { path: p }.fail(),
    };
    Ok(split_text_rows(&text))
}

/// Splits the text layer into rows. Cells are separated by at least two spaces or a tab,
/// so that names with a single space stay in one cell.
pub fn split_text_rows(text: &str) -> Vec<Vec<Cell>> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            l.replace('\t', "  ")
                .split("  ")
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| Cell::Text(s.to_string()))
                .collect()
        })
        .collect()
}

/// Splits OCR output into rows, one cell per word.
pub fn split_ocr_rows(text: &str) -> Vec<Vec<Cell>> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            l.split_whitespace()
                .map(|s| Cell::Text(s.to_string()))
                .collect()
        })
        .collect()
}

fn run_command(command: &mut Command, name: &str) -> HlResult<Vec<u8>> {
    debug!("run_command: {:?}", command);
    let output = command.output().context(OcrCommandSnafu { command: name })?;
    if !output.status.success() {
        return OcrFailedSnafu {
            command: name,
            status: format!(
                "{} {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
        .fail();
    }
    Ok(output.stdout)
}

/// The page images written by pdftoppm, in page order.
fn page_images(work_dir: &Path, prefix: &str) -> HlResult<Vec<PathBuf>> {
    let page_prefix = format!("{}-", prefix);
    let entries = fs::read_dir(work_dir).context(IoSnafu {
        path: work_dir.display().to_string(),
    })?;
    let mut pages: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.context(IoSnafu {
            path: work_dir.display().to_string(),
        })?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(&page_prefix) && name.ends_with(".png") {
            pages.push(entry.path());
        }
    }
    // pdftoppm pads the page numbers, the names sort in page order.
    pages.sort();
    Ok(pages)
}

fn read_pdf_ocr(path: &Path, config: &AppConfig, work_dir: &Path) -> HlResult<Vec<Vec<Cell>>> {
    let prefix = "page";
    info!("Running OCR on {}", path.display());
    run_command(
        Command::new(config.pdftoppm())
            .arg("-png")
            .arg("-r")
            .arg("300")
            .arg(path)
            .arg(work_dir.join(prefix)),
        config.pdftoppm(),
    )?;

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for page in page_images(work_dir, prefix)? {
        let stdout = run_command(
            Command::new(config.tesseract()).arg(&page).arg("stdout"),
            config.tesseract(),
        )?;
        let text = String::from_utf8_lossy(&stdout);
        let mut page_rows = split_ocr_rows(&text);
        debug!("read_pdf_ocr: {:?}: {} rows", page, page_rows.len());
        rows.append(&mut page_rows);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hl::tests::pdf_with_content;

    fn texts(rows: &[Vec<Cell>]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn text_rows_split_on_wide_gaps() {
        let text = "Attendance Report\n\n1   E001   Anna Smith   30  28\t93.3\n";
        assert_eq!(
            texts(&split_text_rows(text)),
            vec![
                vec!["Attendance Report"],
                vec!["1", "E001", "Anna Smith", "30", "28", "93.3"],
            ]
        );
    }

    #[test]
    fn ocr_rows_split_on_words() {
        let text = "DBMS CN\n  \n1 E001 Anna 93.3\n";
        assert_eq!(
            texts(&split_ocr_rows(text)),
            vec![vec!["DBMS", "CN"], vec!["1", "E001", "Anna", "93.3"]]
        );
    }

    #[test]
    fn pages_in_order() {
        let root = crate::hl::tests::test_dir("pages");
        for name in [
            "page-10.png",
            "page-02.png",
            "page-01.png",
            "other.png",
            "page-03.txt",
            "pages.png",
            "page9.png",
        ] {
            fs::write(root.join(name), b"").unwrap();
        }
        let pages: Vec<String> = page_images(&root, "page")
            .unwrap()
            .iter()
            .map(|p| simplify(p))
            .collect();
        assert_eq!(pages, vec!["page-01.png", "page-02.png", "page-10.png"]);
    }

    fn simplify(p: &Path) -> String {
        crate::hl::io_common::simplify_file_name(p)
    }

    fn failing_ocr_config() -> AppConfig {
        AppConfig {
            pdftoppm_command: Some("false".to_string()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn malformed_fonts_do_not_unwind() {
        let root = crate::hl::tests::test_dir("pdf-bad-font");
        let undefined_font = root.join("undefined-font.pdf");
        fs::write(
            &undefined_font,
            pdf_with_content("BT /F9 12 Tf 72 712 Td (Anna) Tj ET"),
        )
        .unwrap();
        let no_font = root.join("no-font.pdf");
        fs::write(&no_font, pdf_with_content("BT 72 712 Td (Anna) Tj ET")).unwrap();

        for p in [&undefined_font, &no_font] {
            let res = panic::catch_unwind(|| read_pdf_text(p));
            assert!(res.is_ok(), "text extraction unwound for {:?}", p);
            // The scan fallback is reached and fails on the stub command.
            let err = read_pdf_rows(p, &failing_ocr_config(), &root).unwrap_err();
            assert!(matches!(err, HlError::OcrFailed { .. }), "{:?}", err);
        }
    }

    #[test]
    fn unreadable_pdf_falls_back_to_ocr() {
        let root = crate::hl::tests::test_dir("pdf-not-pdf");
        let p = root.join("scan.pdf");
        fs::write(&p, b"this is not a pdf").unwrap();
        assert!(read_pdf_text(&p).is_err());
        let err = read_pdf_rows(&p, &failing_ocr_config(), &root).unwrap_err();
        assert!(matches!(err, HlError::OcrFailed { .. }), "{:?}", err);
    }

    #[test]
    fn pdf_without_table_falls_back_to_ocr() {
        let root = crate::hl::tests::test_dir("pdf-no-table");
        let p = root.join("blank.pdf");
        fs::write(&p, pdf_with_content("")).unwrap();
        let err = read_pdf_rows(&p, &failing_ocr_config(), &root).unwrap_err();
        assert!(matches!(err, HlError::OcrFailed { .. }), "{:?}", err);
    }

    #[test]
    fn missing_ocr_command() {
        let root = crate::hl::tests::test_dir("ocr-missing");
        let config = AppConfig {
            pdftoppm_command: Some("attnhl-no-such-command".to_string()),
            ..AppConfig::default()
        };
        let err = read_pdf_ocr(&root.join("scan.pdf"), &config, &root).unwrap_err();
        assert!(matches!(err, HlError::OcrCommand { .. }));
        assert!(!err.is_user_error());
    }
}
