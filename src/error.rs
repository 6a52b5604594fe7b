use thiserror::Error;

use crate::registry::RegistryError;

#[derive(Error, Debug)]
pub enum RefBuildError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("GitLab API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("GitLab API error (status {status}) persisted after {retries} retries")]
    ApiErrorAfterRetries { status: u16, retries: u32 },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RefBuildError>;
