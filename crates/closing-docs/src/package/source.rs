use crate::rules::DocumentId;

/// Resolves a document id to stored template bytes.
pub trait TemplateSource: Send + Sync {
    fn fetch(&self, id: &DocumentId) -> Result<Option<Vec<u8>>, SourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("template store unavailable: {0}")]
    Unavailable(String),
}
