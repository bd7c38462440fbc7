//! Error types for the reservation layer.

use maitre_core::error::MaitreError;

/// Failures talking to the external reservation API.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The API answered with a non-success status.
    #[error("reservation API returned {status}: {body}")]
    Status { status: u16, body: String },
    /// The request never produced a response.
    #[error("reservation API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response body was not the expected JSON.
    #[error("reservation API response could not be decoded: {0}")]
    Decode(String),
}

impl GatewayError {
    /// HTTP status code, when the failure carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            GatewayError::Transport(e) => e.status().map(|s| s.as_u16()),
            GatewayError::Decode(_) => None,
        }
    }
}

/// Errors raised while preparing a booking operation from chat entities.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid party size: '{0}'")]
    InvalidPartySize(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("no booking reference provided")]
    MissingReference,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<GatewayError> for MaitreError {
    fn from(err: GatewayError) -> Self {
        MaitreError::Booking(err.to_string())
    }
}

impl From<BookingError> for MaitreError {
    fn from(err: BookingError) -> Self {
        MaitreError::Booking(err.to_string())
    }
}
