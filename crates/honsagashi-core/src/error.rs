use thiserror::Error;

#[derive(Debug, Error)]
pub enum NdlError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no export token on search page for NDLBibID {0}")]
    TokenNotFound(String),

    #[error("invalid ISBN: {0}")]
    InvalidIsbn(String),

    #[error("invalid URL {0}")]
    InvalidUrl(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl NdlError {
    /// True for the 404 answer the thumbnail endpoint gives for unknown ISBNs.
    pub fn is_not_found(&self) -> bool {
        match self {
            NdlError::NotFound(_) => true,
            NdlError::Http(e) => e.status().is_some_and(|s| s.as_u16() == 404),
            _ => false,
        }
    }
}

/// Why a single source record was rejected. Peers in the same response are unaffected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is missing required field `{0}`")]
    MissingField(&'static str),
}

pub type Result<T> = std::result::Result<T, NdlError>;
