//! Error taxonomy for the probing engine.
//!
//! Transport failures surface here; protocol failures (a response that is
//! merely wrong) are classification outcomes and never become errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{0}")]
    Transport(String),
    #[error("invalid method token: {0:?}")]
    InvalidMethod(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        ProbeError::Transport(err.to_string())
    }
}

impl ProbeError {
    /// Text placed in a result's `actual` column when a probe got no response.
    pub fn as_actual(&self) -> String {
        format!("Unexpected error: {}", self)
    }
}
