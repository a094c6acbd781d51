use crate::template::TemplateDocument;

/// Converts between stored template bytes and the block/leaf tree.
pub trait DocumentAdapter: Send + Sync {
    fn read(&self, bytes: &[u8]) -> Result<TemplateDocument, AdapterError>;
    fn write(&self, document: &TemplateDocument) -> Result<Vec<u8>, AdapterError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("document has no containers")]
    Empty,
}

/// Templates stored as the serialized block/leaf tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocumentAdapter;

impl DocumentAdapter for JsonDocumentAdapter {
    fn read(&self, bytes: &[u8]) -> Result<TemplateDocument, AdapterError> {
        let document: TemplateDocument = serde_json::from_slice(bytes)?;
        if document.containers.is_empty() {
            return Err(AdapterError::Empty);
        }
        Ok(document)
    }

    fn write(&self, document: &TemplateDocument) -> Result<Vec<u8>, AdapterError> {
        Ok(serde_json::to_vec(document)?)
    }
}
