use thiserror::Error;

/// Errors surfaced by the remote operations the core consumes.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },
}
