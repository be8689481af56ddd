use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};

use attendance_core::AttendanceRequest;
use log::{debug, info, warn};
use multipart::server::Multipart;
use percent_encoding::percent_decode_str;
use serde_json::json;
use snafu::prelude::*;
use tiny_http::{Header, Method, Request, Response, Server};
use url::form_urlencoded;

use crate::hl::config_reader::AppConfig;
use crate::hl::io_common::{sanitize_file_name, CSV_FILE_NAME};
use crate::hl::*;

const INDEX_HTML: &str = r#"<h1>Attendance highlighter</h1>
<p><code>POST /upload</code> as <code>multipart/form-data</code> with a <code>file</code> part and the
<code>subject</code>, <code>attendance_type</code> (TH or LAB) and <code>highlight_last_column</code> fields.
The file may also be sent as the raw body, with the fields in the query string:
<code>/upload?filename=report.pdf&amp;subject=DBMS&amp;attendance_type=TH</code>.
Use <code>subject=TOTAL</code> for the last column of the report.</p>
<p><code>GET /download/&lt;folder&gt;/&lt;file&gt;.xlsx</code> downloads a highlighted report.</p>
<p><code>GET /download/csv</code> downloads the last extracted table.</p>
"#;

/// A response before it is sent: status, content type and body.
#[derive(Debug)]
pub enum Reply {
    Json(u16, serde_json::Value),
    Html(String),
    File(PathBuf, &'static str),
}

fn error_reply(status: u16, message: &str) -> Reply {
    Reply::Json(status, json!({ "error": message }))
}

fn content_type(value: &str) -> Option<Header> {
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes()).ok()
}

fn respond(request: Request, reply: Reply) -> io::Result<()> {
    match reply {
        Reply::Json(status, js) => {
            let mut response = Response::from_string(js.to_string()).with_status_code(status);
            if let Some(h) = content_type("application/json") {
                response = response.with_header(h);
            }
            request.respond(response)
        }
        Reply::Html(body) => {
            let mut response = Response::from_string(body);
            if let Some(h) = content_type("text/html; charset=utf-8") {
                response = response.with_header(h);
            }
            request.respond(response)
        }
        Reply::File(path, mime) => match fs::File::open(&path) {
            Ok(f) => {
                let mut response = Response::from_file(f);
                if let Some(h) = content_type(mime) {
                    response = response.with_header(h);
                }
                request.respond(response)
            }
            Err(e) => {
                warn!("respond: could not open {:?}: {}", path, e);
                request.respond(
                    Response::from_string(json!({ "error": "File not found" }).to_string())
                        .with_status_code(404),
                )
            }
        },
    }
}

pub fn query_params(url: &str) -> HashMap<String, String> {
    let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// The file and the fields of an upload.
#[derive(Debug, Default, Clone)]
pub struct UploadForm {
    pub file_name: Option<String>,
    pub file: Option<Vec<u8>>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }
}

/// The boundary of a `multipart/form-data` content type.
pub fn multipart_boundary(content_type: &str) -> Option<String> {
    let (mime, params) = content_type.split_once(';')?;
    if !mime.trim().eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    params
        .split(';')
        .filter_map(|p| p.split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, v)| v.trim().trim_matches('"').to_string())
        .filter(|b| !b.is_empty())
}

/// Reads a multipart body. The document is the `file` part (`pdfFile` is accepted too).
pub fn parse_multipart(boundary: &str, body: &[u8]) -> io::Result<UploadForm> {
    let mut form = UploadForm::default();
    let mut multipart = Multipart::with_body(body, boundary);
    while let Some(mut field) = multipart.read_entry()? {
        let name = field.headers.name.to_string();
        let mut data: Vec<u8> = Vec::new();
        field.data.read_to_end(&mut data)?;
        debug!("parse_multipart: part {:?}: {} bytes", name, data.len());
        match name.as_str() {
            "file" | "pdfFile" => {
                form.file_name = field.headers.filename.clone();
                form.file = Some(data);
            }
            _ => {
                form.fields
                    .insert(name, String::from_utf8_lossy(&data).to_string());
            }
        }
    }
    Ok(form)
}

/// Collects the upload from a multipart body, or from a raw body with the fields in the
/// query string. Form fields take precedence over the query string.
pub fn upload_form(url: &str, content_type: Option<&str>, body: &[u8]) -> Result<UploadForm, Reply> {
    let mut form = match content_type.and_then(multipart_boundary) {
        Some(boundary) => match parse_multipart(&boundary, body) {
            Ok(f) => f,
            Err(e) => {
                warn!("upload_form: malformed multipart body: {}", e);
                return Err(error_reply(400, "Malformed multipart body"));
            }
        },
        None => UploadForm {
            file_name: None,
            file: Some(body.to_vec()).filter(|b| !b.is_empty()),
            fields: HashMap::new(),
        },
    };
    for (k, v) in query_params(url) {
        form.fields.entry(k).or_insert(v);
    }
    if form.file_name.is_none() {
        form.file_name = form.fields.get("filename").cloned();
    }
    Ok(form)
}

/// Handles an upload and runs the request on the uploaded document.
pub fn handle_upload(
    config: &AppConfig,
    url: &str,
    content_type: Option<&str>,
    body: &[u8],
) -> Reply {
    let form = match upload_form(url, content_type, body) {
        Ok(f) => f,
        Err(reply) => return reply,
    };
    let file = match &form.file {
        Some(f) => f,
        None => return error_reply(400, "No file part"),
    };
    let file_name = match form.file_name.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) => sanitize_file_name(f),
        None => return error_reply(400, "No selected file"),
    };
    let highlight_last_column = form.field("highlight_last_column") == Some("true");
    let request = match AttendanceRequest::new(
        form.field("subject").unwrap_or(""),
        form.field("attendance_type"),
        highlight_last_column,
    ) {
        Ok(r) => r,
        Err(e) => return error_reply(400, &e.to_string()),
    };
    info!("Upload {} for {:?}", file_name, request);

    match save_and_run(config, &file_name, file, &request) {
        Ok(outcome) => {
            let excel_name = io_common::simplify_file_name(&outcome.excel_path);
            Reply::Json(
                200,
                json!({
                    "csv_file": CSV_FILE_NAME,
                    "highlighted_excel": outcome.excel_path.display().to_string(),
                    "download": format!("/download/{}/{}", outcome.dir_name, excel_name),
                    "highlighted": outcome.output.marks.len(),
                }),
            )
        }
        Err(e) if e.is_user_error() => {
            warn!("Upload {} rejected: {}", file_name, e);
            error_reply(400, &e.to_string())
        }
        Err(e) => {
            warn!("Upload {} failed: {:?}", file_name, e);
            error_reply(500, &e.to_string())
        }
    }
}

fn save_and_run(
    config: &AppConfig,
    file_name: &str,
    file: &[u8],
    request: &AttendanceRequest,
) -> HlResult<Outcome> {
    let upload_dir = config.upload_dir();
    fs::create_dir_all(&upload_dir).context(IoSnafu {
        path: upload_dir.display().to_string(),
    })?;
    let upload_path = upload_dir.join(file_name);
    fs::write(&upload_path, file).context(IoSnafu {
        path: upload_path.display().to_string(),
    })?;
    run_file(&upload_path, request, config, None)
}

/// Only plain relative paths ending in `.xlsx` can be downloaded.
fn download_path(root: &Path, rest: &str) -> Option<PathBuf> {
    let rel = Path::new(rest);
    let plain = rel.components().all(|c| matches!(c, Component::Normal(_)));
    if !plain || !rest.ends_with(".xlsx") {
        return None;
    }
    Some(root.join(rel))
}

// Encoded separators are decoded before the path is checked.
fn decode_path(encoded: &str) -> String {
    percent_decode_str(encoded).decode_utf8_lossy().to_string()
}

/// The most recent extracted table.
fn latest_csv(config: &AppConfig) -> Option<PathBuf> {
    let entries = fs::read_dir(config.csv_dir()).ok()?;
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path().join(CSV_FILE_NAME))
        .filter_map(|p| {
            let modified = fs::metadata(&p).and_then(|m| m.modified()).ok()?;
            Some((modified, p))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, p)| p)
}

/// Routes one request.
pub fn handle(
    config: &AppConfig,
    method: &Method,
    url: &str,
    content_type: Option<&str>,
    body: &[u8],
) -> Reply {
    let path = url.split_once('?').map(|(p, _)| p).unwrap_or(url);
    debug!("handle: {} {}", method, path);
    match (method, path) {
        (Method::Get, "/") => Reply::Html(INDEX_HTML.to_string()),
        (Method::Post, "/upload") => handle_upload(config, url, content_type, body),
        (Method::Get, "/download/csv") => match latest_csv(config) {
            Some(p) => Reply::File(p, "text/csv"),
            None => error_reply(404, "No CSV generated yet. Please upload a file first."),
        },
        (Method::Get, p) if p.starts_with("/download/") => {
            let rest = decode_path(&p["/download/".len()..]);
            match download_path(&config.excel_dir(), &rest) {
                Some(f) if f.is_file() => Reply::File(
                    f,
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                ),
                _ => error_reply(404, "File not found"),
            }
        }
        _ => error_reply(404, "Not found"),
    }
}

/// Reads at most `limit` bytes. None if the body is longer.
fn read_body(reader: &mut dyn Read, limit: usize) -> io::Result<Option<Vec<u8>>> {
    let mut body: Vec<u8> = Vec::new();
    reader.take(limit as u64 + 1).read_to_end(&mut body)?;
    if body.len() > limit {
        return Ok(None);
    }
    Ok(Some(body))
}

/// Serves the HTTP interface. Requests are handled one at a time.
pub fn serve(config: &AppConfig) -> HlResult<()> {
    let addr = config.bind_address();
    let limit = config.max_upload_bytes()?;
    let server = match Server::http(&addr) {
        Ok(s) => s,
        Err(e) => whatever!("Could not listen on {}: {}", addr, e),
    };
    info!("Listening on http://{}", addr);

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();
        let content_type = request
            .headers()
            .iter()
            .find(|h| h.field.equiv("Content-Type"))
            .map(|h| h.value.as_str().to_string());
        let mut body: Vec<u8> = Vec::new();
        if method == Method::Post {
            match read_body(request.as_reader(), limit) {
                Ok(Some(b)) => body = b,
                Ok(None) => {
                    warn!("Body of {} is larger than {} bytes", url, limit);
                    let _ = respond(request, error_reply(413, "The file is too large"));
                    continue;
                }
                Err(e) => {
                    warn!("Could not read the body of {}: {}", url, e);
                    let _ = respond(request, error_reply(400, "Could not read the request body"));
                    continue;
                }
            }
        }
        let handled = panic::catch_unwind(AssertUnwindSafe(|| {
            handle(config, &method, &url, content_type.as_deref(), &body)
        }));
        let reply = match handled {
            Ok(r) => r,
            Err(_) => {
                warn!("Handling {} {} panicked", method, url);
                error_reply(500, "Internal error")
            }
        };
        if let Err(e) = respond(request, reply) {
            warn!("Could not send the response to {}: {}", url, e);
        }
    }
    Ok(())
}
