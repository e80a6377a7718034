#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid sankey input: {message}")]
    InvalidInput { message: String },
    #[error("invalid option `{name}`: {message}")]
    InvalidOption { name: String, message: String },
    #[error("sankey JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_option(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
