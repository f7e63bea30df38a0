use thiserror::Error;

/// Errors that can occur during Aspectra core operations.
///
/// Per-token problems (unknown tags, dangling continuations) are never
/// errors: they are recovered locally and counted in a
/// [`ReconstructionReport`](crate::extract::ReconstructionReport).
#[derive(Debug, Error)]
pub enum AspectraError {
    /// A label references a category that the tag scheme does not declare.
    #[error("label {label:?} references a category absent from the tag scheme")]
    SchemeMismatch {
        /// The offending label.
        label: String,
    },

    /// The extractor configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A document violates the token/offset invariants.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A dataset record could not be read.
    #[error("dataset error at line {line}: {message}")]
    Dataset {
        /// 1-based line number in the source file.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regex pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    RegexError(#[from] regex::Error),

    /// The model weights, config or tokenizer could not be loaded.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The model inference failed.
    #[error("inference error: {0}")]
    Inference(String),

    /// Candle ML framework error.
    #[error("ML inference error: {0}")]
    CandleError(String),
}

/// Result type alias for Aspectra operations.
pub type Result<T> = std::result::Result<T, AspectraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = AspectraError::SchemeMismatch {
            label: "B-RESULT".into(),
        };
        assert!(err.to_string().contains("B-RESULT"));

        let err = AspectraError::Dataset {
            line: 7,
            message: "3 tokens but 2 tags".into(),
        };
        assert_eq!(
            err.to_string(),
            "dataset error at line 7: 3 tokens but 2 tags"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AspectraError>();
    }
}
