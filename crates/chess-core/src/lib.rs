//! Board-game data model shared by the session layer.
//!
//! Snapshot types (`GameStatus`, `BoardGrid`), coordinates and piece identity,
//! and the `RulesEngine` seam with its shakmaty implementation.

pub mod board;
pub mod error;
pub mod game_status;
pub mod rules;
pub mod types;

pub use board::BoardGrid;
pub use error::CoreError;
pub use game_status::{GameStatus, LastMove, MovePair};
pub use rules::{RulesEngine, RulesError, ShakmatyRules};
pub use types::{BoardPiece, PieceKind, Side, Square};
