use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForwarderError {
    #[error("malformed event: {message}")]
    MalformedEvent { message: String },

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("webhook credentials unavailable: {message}")]
    Credentials { message: String },

    #[error("tag lookup failed: {message}")]
    TagLookup { message: String },

    #[error("metric history unavailable: {message}")]
    MetricHistory { message: String },

    #[error("webhook returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("webhook transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("signing error: {message}")]
    Signing { message: String },
}

pub type Result<T> = std::result::Result<T, ForwarderError>;

impl ForwarderError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedEvent {
            message: message.into(),
        }
    }

    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }

    pub fn tag_lookup(message: impl Into<String>) -> Self {
        Self::TagLookup {
            message: message.into(),
        }
    }

    pub fn metric_history(message: impl Into<String>) -> Self {
        Self::MetricHistory {
            message: message.into(),
        }
    }

    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }
}
