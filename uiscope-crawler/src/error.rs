use thiserror::Error;

use crate::cdp::CdpError;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Navigation failed for {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Metrics probe failed for {url}: {reason}")]
    Evaluation { url: String, reason: String },

    #[error("Project session could not be established: {0}")]
    ProjectInit(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Browser protocol error: {0}")]
    Cdp(#[from] CdpError),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
