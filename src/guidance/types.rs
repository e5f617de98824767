use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Button,
    Field,
    Link,
    Unknown,
}

/// A UI element currently visible on the user's page. Supplied per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageElement {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ElementKind>,
}

impl PageElement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: None,
        }
    }

    /// Case-insensitive label equality, ignoring surrounding whitespace.
    pub fn has_label(&self, label: &str) -> bool {
        self.text.trim().to_lowercase() == label.trim().to_lowercase()
    }
}
