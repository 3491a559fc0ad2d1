use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("pdf parse error: {0}")]
    PdfParse(String),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid file type: {0}")]
    InvalidFileType(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored documents are unreadable: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("session storage lock poisoned: {0}")]
    Poisoned(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no document selected")]
    NoDocumentSelected,

    #[error("query is empty")]
    EmptyQuery,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("answering service returned {status}")]
    Status { status: u16 },

    #[error("malformed response from answering service: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
