use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    /// Non-2xx response that is not an authorization failure.
    Api { status: u16, body: String },
    /// Refresh token expired or revoked; the device needs re-authentication.
    SessionExpired,
    Json(serde_json::Error),
    /// Bad user-supplied input (date format, unknown mode, out-of-range value).
    Validation(String),
    /// Action not available on the home's API generation.
    Unsupported(String),
    /// The home's generation tag has not been resolved yet.
    GenerationUnresolved,
    MissingToken,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Api { status, body } => write!(f, "API error {status}: {body}"),
            Error::SessionExpired => write!(f, "session expired, re-authentication required"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::Validation(msg) => write!(f, "validation error: {msg}"),
            Error::Unsupported(msg) => write!(f, "unsupported action: {msg}"),
            Error::GenerationUnresolved => write!(f, "home generation not resolved"),
            Error::MissingToken => write!(f, "no access token available"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl Error {
    /// True for errors the host should answer with a re-authentication flow.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::SessionExpired)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
