use crate::models::Document;

/// Case-insensitive substring match on title or description, preserving the
/// input order. A blank term matches everything.
pub fn filter_documents<'a>(documents: &'a [Document], term: &str) -> Vec<&'a Document> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return documents.iter().collect();
    }

    documents
        .iter()
        .filter(|doc| matches_term(doc, &needle))
        .collect()
}

fn matches_term(document: &Document, needle: &str) -> bool {
    document.title.to_lowercase().contains(needle)
        || document
            .description
            .as_deref()
            .is_some_and(|description| description.to_lowercase().contains(needle))
}
