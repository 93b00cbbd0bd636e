//! Render errors.

use sketchroom_core::error::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid surface size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Encode(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid stroke log: {0}")]
    History(#[from] SessionError),
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
