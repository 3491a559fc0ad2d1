use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const PDF_MIME_TYPE: &str = "application/pdf";

pub const DEFAULT_QUERY_ENDPOINT: &str = "http://localhost:8000/query";

pub const DEFAULT_SESSION_FILE: &str = ".docqa-session.json";

/// An uploaded file plus its extracted per-page text.
///
/// `contents.len()` normally equals `pages`, but a document whose PDF could not
/// be parsed carries one placeholder page with `pages == 0`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub file_size: u64,
    pub pages: u32,
    pub contents: Vec<String>,
}

impl Document {
    pub fn is_consistent(&self) -> bool {
        self.contents.len() == self.pages as usize
    }

    /// Relative age for listings, e.g. "3 minutes ago".
    pub fn summary_age(&self, now: DateTime<Utc>) -> String {
        let elapsed = now.signed_duration_since(self.created_at);
        if elapsed.num_seconds() < 0 {
            return "just now".to_string();
        }

        let (amount, unit) = if elapsed.num_days() >= 365 {
            (elapsed.num_days() / 365, "year")
        } else if elapsed.num_days() >= 30 {
            (elapsed.num_days() / 30, "month")
        } else if elapsed.num_days() >= 1 {
            (elapsed.num_days(), "day")
        } else if elapsed.num_hours() >= 1 {
            (elapsed.num_hours(), "hour")
        } else if elapsed.num_minutes() >= 1 {
            (elapsed.num_minutes(), "minute")
        } else {
            return "less than a minute ago".to_string();
        };

        if amount == 1 {
            format!("1 {unit} ago")
        } else {
            format!("{amount} {unit}s ago")
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub text: String,
    pub page: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub document: &'a Document,
    pub query: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatEntry {
    pub query: String,
    pub answer: String,
    pub sources: Vec<Source>,
    pub timestamp: DateTime<Utc>,
}

impl ChatEntry {
    pub fn from_answer(query: impl Into<String>, answer: QueryAnswer) -> Self {
        Self {
            query: query.into(),
            answer: answer.answer,
            sources: answer.sources,
            timestamp: Utc::now(),
        }
    }
}

/// A file the user handed over for upload, already read into memory.
#[derive(Debug, Clone)]
pub struct FileHandle {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME_TYPE
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("pdf") => PDF_MIME_TYPE,
        Some("txt") | Some("text") | Some("log") => "text/plain",
        Some("md") | Some("markdown") => "text/markdown",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPolicy {
    /// Only `application/pdf` handles are accepted.
    PdfOnly,
    /// PDFs are parsed, everything else is read as plain text.
    #[default]
    AnyType,
}

impl UploadPolicy {
    pub fn accepts(self, mime_type: &str) -> bool {
        match self {
            UploadPolicy::PdfOnly => mime_type == PDF_MIME_TYPE,
            UploadPolicy::AnyType => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub session_file: String,
    pub timeout: Option<Duration>,
    pub upload_policy: UploadPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_QUERY_ENDPOINT.to_string(),
            session_file: DEFAULT_SESSION_FILE.to_string(),
            timeout: None,
            upload_policy: UploadPolicy::default(),
        }
    }
}
