//! Error types.

use thiserror::Error;

/// Errors surfaced by a drawing session.
///
/// None of these are fatal: they degrade to a status message or a return to
/// the entry screen.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Connection failed: {0}")]
    Connection(#[from] ChannelError),
    #[error("Room rejected: {0}")]
    RoomRejected(String),
    #[error("Malformed event: {0}")]
    MalformedEvent(String),
    #[error("Invalid Room ID (must be 12 characters): {0}")]
    InvalidRoomId(String),
    #[error("Please enter a {0}")]
    MissingField(&'static str),
    #[error("Preferences error: {0}")]
    Preferences(#[from] PreferencesError),
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::MalformedEvent(e.to_string())
    }
}

/// Sync channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Send failed: {0}")]
    Send(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Preference storage errors.
#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
