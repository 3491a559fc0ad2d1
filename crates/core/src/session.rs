use crate::error::{QueryError, Result};
use crate::extractor::{LopdfExtractor, TextExtractor};
use crate::history::ChatHistory;
use crate::models::{ChatEntry, Document, FileHandle, QueryAnswer, QueryRequest};
use crate::query::QueryService;
use crate::repository::DocumentRepository;
use crate::search::filter_documents;
use crate::store::DocumentStore;
use crate::uploader::Uploader;
use tracing::{info, warn};

/// A query captured at send time. The answer is recorded against
/// `document.id` regardless of what is selected when it arrives.
#[derive(Debug, Clone)]
pub struct PendingQuery {
    pub document: Document,
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Recorded { document_id: String, entry: ChatEntry },
    /// The target document was deleted while the query was in flight.
    Discarded { document_id: String },
}

pub struct Session<R, Q, E = LopdfExtractor>
where
    R: DocumentRepository,
    Q: QueryService,
    E: TextExtractor,
{
    store: DocumentStore<R>,
    history: ChatHistory,
    uploader: Uploader<E>,
    service: Q,
}

impl<R, Q, E> Session<R, Q, E>
where
    R: DocumentRepository,
    Q: QueryService + Send + Sync,
    E: TextExtractor,
{
    pub fn new(store: DocumentStore<R>, uploader: Uploader<E>, service: Q) -> Self {
        Self {
            store,
            history: ChatHistory::new(),
            uploader,
            service,
        }
    }

    pub fn store(&self) -> &DocumentStore<R> {
        &self.store
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn documents(&self) -> &[Document] {
        self.store.list()
    }

    pub fn search(&self, term: &str) -> Vec<&Document> {
        filter_documents(self.store.list(), term)
    }

    /// Extracts the batch and prepends it to the store in one write.
    pub fn upload(&mut self, files: Vec<FileHandle>) -> Result<Vec<Document>> {
        let documents = self.uploader.upload(files)?;
        self.store.add(documents.clone())?;
        info!(count = documents.len(), "documents uploaded");
        Ok(documents)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let removed = self.store.remove(id)?;
        if removed {
            info!(document_id = id, "document deleted");
        }
        Ok(removed)
    }

    pub fn select(&mut self, id: &str) -> Option<&Document> {
        self.store.select(id)
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
    }

    pub fn selected(&self) -> Option<&Document> {
        self.store.selected()
    }

    pub fn clear_history(&mut self, document_id: &str) {
        self.history.clear(document_id);
    }

    /// Validates the question against the current selection without touching
    /// the network.
    pub fn begin_query(&self, question: &str) -> Result<PendingQuery, QueryError> {
        let document = self.store.selected().ok_or(QueryError::NoDocumentSelected)?;
        if question.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        Ok(PendingQuery {
            document: document.clone(),
            question: question.to_string(),
        })
    }

    pub async fn send(&self, pending: &PendingQuery) -> Result<QueryAnswer, QueryError> {
        let request = QueryRequest {
            document: &pending.document,
            query: &pending.question,
        };
        self.service.ask(&request).await
    }

    /// Failures never reach the history. A successful answer for a document
    /// that no longer exists is dropped.
    pub fn complete_query(
        &mut self,
        pending: PendingQuery,
        result: Result<QueryAnswer, QueryError>,
    ) -> Result<QueryOutcome, QueryError> {
        let answer = result.map_err(|error| {
            warn!(document_id = %pending.document.id, %error, "query failed");
            error
        })?;

        let document_id = pending.document.id;
        if !self.store.contains(&document_id) {
            warn!(%document_id, "discarding answer for deleted document");
            return Ok(QueryOutcome::Discarded { document_id });
        }

        let entry = ChatEntry::from_answer(pending.question, answer);
        self.history.append(&document_id, entry.clone());
        Ok(QueryOutcome::Recorded { document_id, entry })
    }

    pub async fn ask(&mut self, question: &str) -> Result<QueryOutcome, QueryError> {
        let pending = self.begin_query(question)?;
        let result = self.send(&pending).await;
        self.complete_query(pending, result)
    }
}
