use serde::{Deserialize, Serialize};

/// Opaque formatting carried by the source document (run/paragraph
/// properties). Never inspected, only moved along with its text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Formatting(pub serde_json::Value);

impl Formatting {
    pub fn is_empty(&self) -> bool {
        self.0.is_null()
    }
}

/// A run of text sharing one formatting.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Leaf {
    pub text: String,
    #[serde(default, skip_serializing_if = "Formatting::is_empty")]
    pub format: Formatting,
}

impl Leaf {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: Formatting::default(),
        }
    }

    pub fn formatted(text: impl Into<String>, format: serde_json::Value) -> Self {
        Self {
            text: text.into(),
            format: Formatting(format),
        }
    }
}

/// A paragraph: an ordered run of leaves.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    pub leaves: Vec<Leaf>,
    #[serde(default, skip_serializing_if = "Formatting::is_empty")]
    pub format: Formatting,
}

impl Block {
    pub fn new(leaves: Vec<Leaf>) -> Self {
        Self {
            leaves,
            format: Formatting::default(),
        }
    }

    /// Single-leaf block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![Leaf::new(text)])
    }

    /// Concatenated leaf text.
    pub fn plain_text(&self) -> String {
        self.leaves.iter().map(|leaf| leaf.text.as_str()).collect()
    }

    /// Concatenated text with whitespace runs collapsed and ends trimmed.
    pub fn normalized_text(&self) -> String {
        self.plain_text()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Independently processed part of a document: body, header, footer, text box.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Container {
    pub fn new(name: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            name: name.into(),
            blocks,
        }
    }

    pub fn plain_lines(&self) -> Vec<String> {
        self.blocks.iter().map(Block::plain_text).collect()
    }
}

/// A template or merged document: every container that needs scanning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateDocument {
    #[serde(default)]
    pub name: String,
    pub containers: Vec<Container>,
}

impl TemplateDocument {
    pub fn new(name: impl Into<String>, containers: Vec<Container>) -> Self {
        Self {
            name: name.into(),
            containers,
        }
    }

    pub fn container(&self, name: &str) -> Option<&Container> {
        self.containers
            .iter()
            .find(|container| container.name == name)
    }
}
