// src/error.rs
// Errors that cross the pipeline boundary. Cache and template failures are
// absorbed inside the pipeline and never surface here.

/// Formatting pipeline error types
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl FormatError {
    /// Wrap a backend failure, flattening the error chain into one message.
    pub fn generation(err: anyhow::Error) -> Self {
        FormatError::Generation(format!("{:#}", err))
    }
}
