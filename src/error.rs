//! Error types for interpretation data handling.

/// Errors raised while turning backend results into highlighted tokens.
#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    /// Sequences that must be index-aligned have different lengths.
    #[error("malformed input: {what} has {left} entries but {right} were expected")]
    MalformedInput {
        what: &'static str,
        left: usize,
        right: usize,
    },

    /// Colormap name not in the built-in table.
    #[error("unknown colormap: {0}")]
    UnknownColormap(String),

    /// Backend request failed or answered with an error.
    #[error("backend error: {0}")]
    Backend(String),

    /// Response or session JSON could not be decoded.
    #[error(transparent)]
    Parse(#[from] serde_json::Error),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl InterpretError {
    /// Shorthand for a length mismatch.
    pub fn mismatch(what: &'static str, left: usize, right: usize) -> Self {
        Self::MalformedInput { what, left, right }
    }
}

/// Result type alias for interpretation operations.
pub type Result<T> = std::result::Result<T, InterpretError>;
