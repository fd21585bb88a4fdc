use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

/// Errors raised while talking to the JMA endpoints.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (connect failure, timeout, ...).
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The body was not JSON of the expected shape.
    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    /// A forecast nesting level was absent or empty.
    #[error("forecast has no `{0}` entry")]
    MissingField(&'static str),

    #[error("invalid region code {0:?}")]
    InvalidRegionCode(String),

    #[error("region {0} is not in the area catalog")]
    UnknownRegion(String),
}

/// Coarse classification used by the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Parse,
    Region,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Network(_) | FetchError::Status { .. } => ErrorKind::Network,
            FetchError::Parse(_) | FetchError::MissingField(_) => ErrorKind::Parse,
            FetchError::InvalidRegionCode(_) | FetchError::UnknownRegion(_) => ErrorKind::Region,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Network(e) if e.is_timeout())
    }
}

/// Malformed configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("forecast URL template {0:?} has no {{region_code}} placeholder")]
    MissingPlaceholder(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(FetchError::MissingField("areas").kind(), ErrorKind::Parse);
        assert_eq!(
            FetchError::UnknownRegion("999999".into()).kind(),
            ErrorKind::Region
        );
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(FetchError::from(parse).kind(), ErrorKind::Parse);
    }

    #[test]
    fn status_message_names_url() {
        let err = FetchError::Status {
            url: "http://localhost/area.json".into(),
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.to_string().contains("http://localhost/area.json"));
        assert!(err.to_string().contains("500"));
    }
}
