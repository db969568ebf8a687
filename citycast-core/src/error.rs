use thiserror::Error;

/// Failure of a single request to the weather service.
///
/// The screen never surfaces these as fatal; they only turn into a notice.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {endpoint} could not be sent: {message}")]
    Transport { endpoint: &'static str, message: String },

    #[error("{endpoint} request failed with status {status}: {body}")]
    Status { endpoint: &'static str, status: u16, body: String },

    #[error("failed to decode {endpoint} response: {message}")]
    Decode { endpoint: &'static str, message: String },
}

impl FetchError {
    pub fn endpoint(&self) -> &'static str {
        match self {
            FetchError::Transport { endpoint, .. }
            | FetchError::Status { endpoint, .. }
            | FetchError::Decode { endpoint, .. } => endpoint,
        }
    }
}
