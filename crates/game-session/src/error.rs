//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Session closed")]
    Closed,

    #[error(transparent)]
    Core(#[from] chess_core::CoreError),
}
