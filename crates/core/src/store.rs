use crate::error::StoreError;
use crate::models::Document;
use crate::repository::DocumentRepository;
use tracing::info;

/// Newest-first document collection, written through to its repository after
/// every mutation.
pub struct DocumentStore<R: DocumentRepository> {
    repository: R,
    documents: Vec<Document>,
    selected: Option<String>,
}

impl<R: DocumentRepository> DocumentStore<R> {
    pub fn open(repository: R) -> Result<Self, StoreError> {
        let documents = repository.load()?;
        info!(count = documents.len(), "document store loaded");

        Ok(Self {
            repository,
            documents,
            selected: None,
        })
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn list(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Prepends `documents`, keeping their relative order.
    pub fn add(&mut self, documents: Vec<Document>) -> Result<(), StoreError> {
        if documents.is_empty() {
            return Ok(());
        }

        let mut next = documents;
        next.extend(self.documents.iter().cloned());
        self.replace(next)
    }

    /// Returns whether a document was removed. Removing the selected document
    /// clears the selection.
    pub fn remove(&mut self, id: &str) -> Result<bool, StoreError> {
        if !self.contains(id) {
            return Ok(false);
        }

        let next = self
            .documents
            .iter()
            .filter(|doc| doc.id != id)
            .cloned()
            .collect();
        self.replace(next)?;

        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Ok(true)
    }

    /// Leaves the selection unchanged when `id` is unknown.
    pub fn select(&mut self, id: &str) -> Option<&Document> {
        if self.contains(id) {
            self.selected = Some(id.to_string());
        }
        self.selected()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Document> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    fn replace(&mut self, documents: Vec<Document>) -> Result<(), StoreError> {
        self.repository.save(&documents)?;
        self.documents = documents;
        Ok(())
    }
}
