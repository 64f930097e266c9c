use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{dependency} is not available. {remedy}")]
    DependencyMissing { dependency: String, remedy: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("{provider} does not implement {capability}")]
    Unimplemented { provider: String, capability: &'static str },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Wrap any displayable provider failure as [`Error::Embedding`].
    pub fn embedding<E: std::fmt::Display>(err: E) -> Self {
        Self::Embedding(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
