use crate::error::StoreError;
use crate::models::Document;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Persistence backend for the document collection. The whole collection is
/// read and written as one snapshot.
pub trait DocumentRepository {
    fn load(&self) -> Result<Vec<Document>, StoreError>;
    fn save(&self, documents: &[Document]) -> Result<(), StoreError>;
}

fn decode(raw: &str) -> Result<Vec<Document>, StoreError> {
    serde_json::from_str(raw).map_err(StoreError::Corrupt)
}

/// Session-scoped JSON file holding the array of every document.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentRepository for JsonFileRepository {
    fn load(&self) -> Result<Vec<Document>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&self.path)?;
        decode(&raw)
    }

    fn save(&self, documents: &[Document]) -> Result<(), StoreError> {
        let payload = serde_json::to_vec(documents)?;
        let staging = self.path.with_extension("json.tmp");

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&staging, &payload)?;
        fs::rename(&staging, &self.path)?;

        debug!(path = %self.path.display(), count = documents.len(), "session saved");
        Ok(())
    }
}

/// In-memory analogue of browser session storage: keeps the serialized
/// snapshot, not the live values.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    slot: Mutex<Option<String>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Result<Option<String>, StoreError> {
        let slot = self.lock()?;
        Ok((*slot).clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<String>>, StoreError> {
        self.slot
            .lock()
            .map_err(|error| StoreError::Poisoned(error.to_string()))
    }
}

impl DocumentRepository for MemoryRepository {
    fn load(&self) -> Result<Vec<Document>, StoreError> {
        match self.raw()? {
            Some(raw) => decode(&raw),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, documents: &[Document]) -> Result<(), StoreError> {
        let payload = serde_json::to_string(documents)?;
        *self.lock()? = Some(payload);
        Ok(())
    }
}

impl<R: DocumentRepository + ?Sized> DocumentRepository for &R {
    fn load(&self) -> Result<Vec<Document>, StoreError> {
        (**self).load()
    }

    fn save(&self, documents: &[Document]) -> Result<(), StoreError> {
        (**self).save(documents)
    }
}
