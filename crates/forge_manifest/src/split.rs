//! Multi-document splitting.

/// Line that separates documents in a multi-document blob.
pub const DOCUMENT_SEPARATOR: &str = "---";

/// Split a blob on separator lines, trimming each document and dropping empty ones.
pub fn split_documents(blob: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current = String::new();

    for line in blob.lines() {
        if line.trim_end() == DOCUMENT_SEPARATOR {
            push_document(&mut documents, &current);
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_document(&mut documents, &current);

    documents
}

fn push_document(documents: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        documents.push(trimmed.to_string());
    }
}

/// Join documents with separator lines. Inverse of [`split_documents`] for
/// trimmed, non-empty documents.
pub fn join_documents<S: AsRef<str>>(documents: &[S]) -> String {
    if documents.is_empty() {
        return String::new();
    }
    let separator = format!("\n{}\n", DOCUMENT_SEPARATOR);
    let joined = documents
        .iter()
        .map(|d| d.as_ref())
        .collect::<Vec<_>>()
        .join(separator.as_str());
    format!("{}\n", joined)
}
