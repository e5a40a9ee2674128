use thiserror::Error;

/// Longest body excerpt carried by an error
const EXCERPT_LEN: usize = 200;

/// Telestaff client error types
#[derive(Error, Debug)]
pub enum TelestaffError {
    #[error("Could not reach portal: {message}")]
    Connectivity {
        status: Option<u16>,
        message: String,
    },

    #[error("Authentication failed: {message}")]
    Authentication {
        status: Option<u16>,
        message: String,
    },

    #[error("Malformed JSON response: {message}")]
    MalformedResponse { message: String, excerpt: String },

    #[error("Unexpected page layout: {message}")]
    UnexpectedLayout { message: String, excerpt: String },

    #[error("Session is no longer valid (redirected to {url})")]
    SessionExpired { url: String },

    #[error("Portal error: {status} - {excerpt}")]
    Api { status: u16, excerpt: String },

    #[error("Unknown report kind: {0}")]
    UnknownKind(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("URL parsing failed: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type for Telestaff operations
pub type TelestaffResult<T> = Result<T, TelestaffError>;

impl From<reqwest::Error> for TelestaffError {
    fn from(err: reqwest::Error) -> Self {
        Self::Connectivity {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TelestaffError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse {
            message: err.to_string(),
            excerpt: String::new(),
        }
    }
}

impl TelestaffError {
    /// Create an authentication error
    pub fn auth_error(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Authentication {
            status,
            message: message.into(),
        }
    }

    /// Create a malformed response error with an excerpt of the offending body
    pub fn malformed(message: impl Into<String>, body: &str) -> Self {
        Self::MalformedResponse {
            message: message.into(),
            excerpt: excerpt(body),
        }
    }

    /// Create a layout error with an excerpt of the offending body
    pub fn layout(message: impl Into<String>, body: &str) -> Self {
        Self::UnexpectedLayout {
            message: message.into(),
            excerpt: excerpt(body),
        }
    }

    /// Create a portal error from a status code and response body
    pub fn api_error(status: u16, body: &str) -> Self {
        Self::Api {
            status,
            excerpt: excerpt(body),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    /// HTTP status attached to the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Connectivity { status, .. } | Self::Authentication { status, .. } => *status,
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// First few characters of a body, cut on a char boundary
pub(crate) fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_truncates_long_bodies() {
        let body = "x".repeat(500);
        let cut = excerpt(&body);
        assert_eq!(cut.len(), EXCERPT_LEN + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn excerpt_keeps_short_bodies() {
        assert_eq!(excerpt("  <html></html>\n"), "<html></html>");
    }

    #[test]
    fn status_is_exposed_for_http_errors() {
        assert_eq!(TelestaffError::api_error(500, "boom").status(), Some(500));
        assert_eq!(TelestaffError::auth_error(Some(401), "nope").status(), Some(401));
        assert_eq!(TelestaffError::UnknownKind("x".into()).status(), None);
    }
}
