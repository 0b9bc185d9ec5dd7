//! Error types for gateway client operations

use thiserror::Error;

use crate::tradfri::{codec::LightingUpdateBuilderError, response::ControllerResponse};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// Endpoint or secret missing when opening a session
    #[error("Invalid hub configuration: {0}")]
    Config(String),

    /// An operation was attempted without an open session
    #[error("Not connected to the hub")]
    NotConnected,

    /// The transport failed hard, the session has to be reopened
    #[error("Transport failure: {0:#}")]
    Transport(eyre::Report),

    /// The hub answered a read with something other than content
    #[error("Request to {path} failed: {}", .response.code_string)]
    Request {
        path: String,
        response: ControllerResponse,
    },

    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_path_to_error::Error<serde_json::Error>),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid lighting update: {0}")]
    Update(#[from] LightingUpdateBuilderError),

    #[error("Color temperature {0}K is outside the supported 2200K-4000K range")]
    TemperatureOutOfRange(u16),

    #[error("Invalid RGB hex value {0:?}")]
    InvalidRgb(String),
}

impl Error {
    /// Whether the error means the session can no longer be used.
    pub fn is_session_failure(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::NotConnected)
    }
}
