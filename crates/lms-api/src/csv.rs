//! # CSV Rendering
//!
//! RFC 4180 output for the export endpoints: CRLF line endings, fields
//! quoted only when they contain a comma, a double quote, CR or LF, with
//! embedded quotes doubled.

use axum::http::header;
use axum::response::{IntoResponse, Response};

/// An in-memory CSV document with a fixed header row.
#[derive(Debug, Clone)]
pub struct CsvDocument {
    columns: usize,
    buf: String,
}

impl CsvDocument {
    pub fn new(header: &[&str]) -> Self {
        let mut doc = Self {
            columns: header.len(),
            buf: String::new(),
        };
        doc.push_line(header.iter().copied());
        doc
    }

    /// Append a record. Missing trailing fields are left empty, extra ones dropped.
    pub fn push_row<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut owned: Vec<String> = fields
            .into_iter()
            .take(self.columns)
            .map(|f| f.as_ref().to_string())
            .collect();
        owned.resize(self.columns, String::new());
        self.push_line(owned.iter().map(String::as_str));
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Wrap as an attachment download named `filename`.
    pub fn into_download(self, filename: &str) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", sanitize_filename(filename)),
                ),
            ],
            self.buf,
        )
            .into_response()
    }

    fn push_line<'a>(&mut self, fields: impl Iterator<Item = &'a str>) {
        for (i, field) in fields.enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            self.buf.push_str(&escape(field));
        }
        self.buf.push_str("\r\n");
    }
}

/// Header-safe filename: ASCII letters, digits, `-`, `_` and `.`; anything
/// else becomes `_`.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Quote a single field if it needs it.
pub fn escape(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        std::borrow::Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        std::borrow::Cow::Borrowed(field)
    }
}
