//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid square: {0}")]
    InvalidSquare(String),

    #[error("Invalid piece: {0}")]
    InvalidPiece(String),

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
