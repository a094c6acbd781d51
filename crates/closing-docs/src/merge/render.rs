use crate::template::TemplateDocument;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Converts a merged document to output bytes.
pub trait OutputRenderer: Send + Sync {
    fn render(&self, document: &TemplateDocument) -> Result<Vec<u8>, RenderError>;

    fn content_type(&self) -> &'static str;
}

/// The merged block/leaf tree as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl OutputRenderer for JsonRenderer {
    fn render(&self, document: &TemplateDocument) -> Result<Vec<u8>, RenderError> {
        Ok(serde_json::to_vec_pretty(document)?)
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

/// One line per block, containers separated by a blank line. Formatting is
/// dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl PlainTextRenderer {
    pub fn to_text(document: &TemplateDocument) -> String {
        document
            .containers
            .iter()
            .filter(|container| !container.blocks.is_empty())
            .map(|container| container.plain_lines().join("\n"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl OutputRenderer for PlainTextRenderer {
    fn render(&self, document: &TemplateDocument) -> Result<Vec<u8>, RenderError> {
        Ok(Self::to_text(document).into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }
}
