use crate::error::UploadError;
use crate::extractor::{extract_or_placeholder, LopdfExtractor, TextExtractor};
use crate::models::{mime_type_for, Document, FileHandle, UploadPolicy};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, info};
use walkdir::WalkDir;

pub struct Uploader<E = LopdfExtractor> {
    extractor: E,
    policy: UploadPolicy,
    last_millis: AtomicI64,
}

impl Uploader<LopdfExtractor> {
    pub fn new(policy: UploadPolicy) -> Self {
        Self::with_extractor(LopdfExtractor, policy)
    }
}

impl<E: TextExtractor> Uploader<E> {
    pub fn with_extractor(extractor: E, policy: UploadPolicy) -> Self {
        Self {
            extractor,
            policy,
            last_millis: AtomicI64::new(0),
        }
    }

    pub fn policy(&self) -> UploadPolicy {
        self.policy
    }

    /// Drops handles the policy does not accept. Fails when nothing is left.
    pub fn accept_files(&self, files: Vec<FileHandle>) -> Result<Vec<FileHandle>, UploadError> {
        let submitted = files.len();
        let accepted = files
            .into_iter()
            .filter(|file| self.policy.accepts(&file.mime_type))
            .collect::<Vec<_>>();

        if accepted.is_empty() {
            let reason = match self.policy {
                UploadPolicy::PdfOnly => "please upload PDF files only",
                UploadPolicy::AnyType => "no files were provided",
            };
            return Err(UploadError::InvalidFileType(reason.to_string()));
        }

        if accepted.len() < submitted {
            debug!(
                submitted,
                accepted = accepted.len(),
                "dropped files rejected by upload policy"
            );
        }

        Ok(accepted)
    }

    /// Millisecond stamp for a new batch, strictly after every stamp this
    /// uploader has issued before.
    fn next_batch_millis(&self, now: i64) -> i64 {
        let mut issued = now;
        let _ = self
            .last_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                issued = now.max(last.saturating_add(1));
                Some(issued)
            });
        issued
    }

    /// Extracts every accepted file in submission order and returns the new
    /// documents as one batch. Ids never repeat across batches of the same
    /// uploader.
    pub fn upload(&self, files: Vec<FileHandle>) -> Result<Vec<Document>, UploadError> {
        let accepted = self.accept_files(files)?;
        let stamp = Utc::now();
        let millis = self.next_batch_millis(stamp.timestamp_millis());

        let documents = accepted
            .into_iter()
            .enumerate()
            .map(|(index, file)| {
                let extraction = extract_or_placeholder(&self.extractor, &file);
                debug!(file = %file.name, pages = extraction.pages, "extracted file");
                Document {
                    id: format!("doc-{millis}-{index}"),
                    title: file.name.clone(),
                    description: None,
                    created_at: stamp,
                    file_size: file.size(),
                    pages: extraction.pages,
                    contents: extraction.contents,
                }
            })
            .collect::<Vec<_>>();

        info!(count = documents.len(), "upload batch extracted");
        Ok(documents)
    }
}

/// Reads `path` into a handle whose declared type follows the extension.
pub async fn open_file(path: &Path) -> Result<FileHandle, UploadError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| UploadError::MissingFileName(path.display().to_string()))?;
    let bytes = tokio::fs::read(path).await?;

    Ok(FileHandle::new(name, mime_type_for(path), bytes))
}

pub fn discover_files(folder: &Path, policy: UploadPolicy) -> Vec<PathBuf> {
    let mut files = WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| policy.accepts(mime_type_for(entry.path())))
        .map(|entry| entry.path().to_path_buf())
        .collect::<Vec<_>>();

    files.sort_unstable();
    files
}
