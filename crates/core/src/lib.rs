pub mod error;
pub mod extractor;
pub mod history;
pub mod models;
pub mod query;
pub mod repository;
pub mod search;
pub mod session;
pub mod store;
pub mod uploader;

pub use error::{ExtractError, QueryError, SessionError, StoreError, UploadError};
pub use extractor::{
    extract, extract_or_placeholder, Extraction, LopdfExtractor, TextExtractor,
    EXTRACTION_FAILED_PLACEHOLDER,
};
pub use history::ChatHistory;
pub use models::{
    mime_type_for, ChatEntry, ClientConfig, Document, FileHandle, QueryAnswer, QueryRequest,
    Source, UploadPolicy, DEFAULT_QUERY_ENDPOINT, DEFAULT_SESSION_FILE, PDF_MIME_TYPE,
};
pub use query::{decode_answer, HttpQueryClient, QueryService};
pub use repository::{DocumentRepository, JsonFileRepository, MemoryRepository};
pub use search::filter_documents;
pub use session::{PendingQuery, QueryOutcome, Session};
pub use store::DocumentStore;
pub use uploader::{discover_files, open_file, Uploader};
