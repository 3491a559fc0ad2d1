use crate::models::ChatEntry;
use std::collections::HashMap;

/// Per-document question log. Lives for the session only.
#[derive(Debug, Default, Clone)]
pub struct ChatHistory {
    entries: HashMap<String, Vec<ChatEntry>>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, document_id: &str, entry: ChatEntry) {
        self.entries
            .entry(document_id.to_string())
            .or_default()
            .push(entry);
    }

    pub fn clear(&mut self, document_id: &str) {
        if let Some(log) = self.entries.get_mut(document_id) {
            log.clear();
        }
    }

    /// Entries in the order they were recorded.
    pub fn get(&self, document_id: &str) -> &[ChatEntry] {
        self.entries
            .get(document_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn newest_first(&self, document_id: &str) -> impl Iterator<Item = &ChatEntry> {
        self.get(document_id).iter().rev()
    }

    pub fn len(&self, document_id: &str) -> usize {
        self.get(document_id).len()
    }
}
