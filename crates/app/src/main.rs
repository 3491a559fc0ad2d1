mod shell;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use docqa_core::{
    discover_files, open_file, ClientConfig, DocumentStore, FileHandle, HttpQueryClient,
    JsonFileRepository, QueryOutcome, Session, UploadPolicy, Uploader, DEFAULT_QUERY_ENDPOINT,
    DEFAULT_SESSION_FILE,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub(crate) type AppSession = Session<JsonFileRepository, HttpQueryClient>;

#[derive(Parser)]
#[command(name = "docqa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Answering service endpoint
    #[arg(long, env = "DOCQA_ENDPOINT", default_value = DEFAULT_QUERY_ENDPOINT)]
    endpoint: String,

    /// File that holds the session's document library
    #[arg(long, env = "DOCQA_SESSION_FILE", default_value = DEFAULT_SESSION_FILE)]
    session_file: String,

    /// Query request timeout in seconds. Unset means wait indefinitely.
    #[arg(long, env = "DOCQA_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Reject anything that is not a PDF instead of reading it as text.
    #[arg(long, default_value_t = false)]
    pdf_only: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Extract files and add them to the library.
    Upload {
        /// Files to upload, in order.
        paths: Vec<PathBuf>,
        /// Also upload every accepted file under this folder.
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// List documents, newest first.
    List {
        /// Case-insensitive filter on title and description.
        #[arg(long)]
        search: Option<String>,
    },
    /// Print a document's extracted text.
    Show {
        id: String,
        /// Maximum number of pages to print.
        #[arg(long, default_value = "2")]
        max_pages: usize,
    },
    /// Remove a document from the library.
    Delete { id: String },
    /// Ask one question about a document.
    Ask {
        #[arg(long)]
        document: String,
        #[arg(long)]
        query: String,
    },
    /// Interactive session with per-document chat history.
    Shell,
}

impl Cli {
    fn config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.endpoint.clone(),
            session_file: self.session_file.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
            upload_policy: if self.pdf_only {
                UploadPolicy::PdfOnly
            } else {
                UploadPolicy::AnyType
            },
        }
    }
}

pub(crate) fn build_session(config: &ClientConfig) -> anyhow::Result<AppSession> {
    let store = DocumentStore::open(JsonFileRepository::new(&config.session_file))
        .with_context(|| format!("unable to open session file {}", config.session_file))?;
    let client = HttpQueryClient::new(&config.endpoint, config.timeout)?;

    Ok(Session::new(store, Uploader::new(config.upload_policy), client))
}

pub(crate) async fn open_files(paths: &[PathBuf]) -> anyhow::Result<Vec<FileHandle>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = open_file(path)
            .await
            .with_context(|| format!("unable to read {}", path.display()))?;
        files.push(file);
    }
    Ok(files)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    let mut session = build_session(&config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        endpoint = %config.endpoint,
        session_file = %config.session_file,
        "docqa boot"
    );

    match cli.command {
        Command::Upload { mut paths, folder } => {
            if let Some(folder) = folder {
                let found = discover_files(&folder, config.upload_policy);
                if found.is_empty() {
                    warn!(folder = %folder.display(), "no accepted files found in folder");
                }
                paths.extend(found);
            }

            let files = open_files(&paths).await?;
            let documents = session.upload(files)?;
            println!("{} file(s) uploaded successfully", documents.len());
            for document in &documents {
                shell::print_document(document, Utc::now());
            }
        }
        Command::List { search } => {
            let term = search.unwrap_or_default();
            let found = session.search(&term);
            if session.documents().is_empty() {
                println!("No documents uploaded yet");
            } else if found.is_empty() {
                println!("No documents match \"{term}\"");
            }
            let now = Utc::now();
            for document in found {
                shell::print_document(document, now);
            }
        }
        Command::Show { id, max_pages } => {
            let document = session
                .store()
                .get(&id)
                .with_context(|| format!("no document with id {id}"))?;
            shell::print_pages(document, max_pages);
        }
        Command::Delete { id } => {
            if session.delete(&id)? {
                println!("The document has been removed successfully");
            } else {
                println!("No document with id {id}");
            }
        }
        Command::Ask { document, query } => {
            if !session.store().contains(&document) {
                anyhow::bail!("no document with id {document}");
            }
            session.select(&document);
            match session.ask(&query).await? {
                QueryOutcome::Recorded { entry, .. } => shell::print_entry(&entry),
                QueryOutcome::Discarded { document_id } => {
                    println!("Document {document_id} was removed before the answer arrived")
                }
            }
        }
        Command::Shell => shell::run(&mut session, config.upload_policy).await?,
    }

    Ok(())
}
