use thiserror::Error;

/// Result type for chunk assembly operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while assembling chunks
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// Configuration rejected before any work started
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The syntax-tree provider failed
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// The declaration extractor failed
    #[error("Extraction error: {message}")]
    Extract {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// No grammar is available for the requested language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// An internal invariant was violated; indicates a bug
    #[error("Internal invariant violated: {0}")]
    Internal(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ChunkerError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a parse error without an underlying cause
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a parse error wrapping the collaborator's own error
    pub fn parse_with(
        msg: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Parse {
            message: msg.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Create an extraction error
    pub fn extract(msg: impl Into<String>) -> Self {
        Self::Extract {
            message: msg.into(),
            source: None,
        }
    }

    /// Create an unsupported language error
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    /// Create an internal invariant error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error came from an upstream collaborator
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::Extract { .. } | Self::UnsupportedLanguage(_)
        )
    }
}
