use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuideError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("Advisory error: {0}")]
    Advisory(String),

    #[error("Advisory call timed out after {0} ms")]
    Timeout(u64),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Catalogue error: {0}")]
    Catalogue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

impl GuideError {
    /// Coarse category reported at the request boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            GuideError::Validation(_) => "validation",
            GuideError::SessionNotFound(_) => "not_found",
            _ => "internal",
        }
    }
}

impl serde::Serialize for GuideError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type GuideResult<T> = Result<T, GuideError>;
