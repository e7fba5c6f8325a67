use serde::{Deserialize, Serialize};

use crate::board::BoardGrid;
use crate::error::CoreError;
use crate::rules::RulesEngine;
use crate::types::{BoardPiece, Side, Square};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMove {
    pub from: Square,
    pub to: Square,
}

/// Immutable snapshot of the game as seen by every consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    pub fen: String,
    pub turn: Side,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_draw: bool,
    pub last_move: Option<LastMove>,
    pub history: Vec<String>, // SAN notation
    pub board: BoardGrid,
}

/// One numbered row of the move list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePair {
    pub number: u32,
    pub white: String,
    pub black: String,
}

impl GameStatus {
    pub fn capture<R: RulesEngine + ?Sized>(rules: &R, last_move: Option<LastMove>) -> GameStatus {
        GameStatus {
            fen: rules.position(),
            turn: rules.side_to_move(),
            is_check: rules.is_check(),
            is_checkmate: rules.is_checkmate(),
            is_draw: rules.is_draw(),
            last_move,
            history: rules.history(),
            board: rules.board(),
        }
    }

    /// Checkmate or draw.
    pub fn is_terminal(&self) -> bool {
        self.is_checkmate || self.is_draw
    }

    pub fn piece_at(&self, square: Square) -> Option<BoardPiece> {
        self.board.piece_at(square)
    }

    /// Square of the king that is currently in check, if any.
    pub fn checked_king(&self) -> Option<Square> {
        if !self.is_check {
            return None;
        }
        self.board.king_square(self.turn)
    }

    pub fn move_pairs(&self) -> Vec<MovePair> {
        self.history
            .chunks(2)
            .enumerate()
            .map(|(i, plies)| MovePair {
                number: i as u32 + 1,
                white: plies[0].clone(),
                black: plies.get(1).cloned().unwrap_or_default(),
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ShakmatyRules;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_move_pairs_with_dangling_ply() {
        let mut rules = ShakmatyRules::new();
        for (from, to) in [("e2", "e4"), ("e7", "e5"), ("g1", "f3")] {
            rules.execute_move(sq(from), sq(to), None).unwrap();
        }
        let status = GameStatus::capture(&rules, None);

        let pairs = status.move_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], MovePair { number: 1, white: "e4".into(), black: "e5".into() });
        assert_eq!(pairs[1], MovePair { number: 2, white: "Nf3".into(), black: String::new() });
    }

    #[test]
    fn test_checked_king_square() {
        let mut rules = ShakmatyRules::new();
        for (from, to) in [("e2", "e4"), ("f7", "f6"), ("d2", "d4"), ("g7", "g5"), ("d1", "h5")] {
            rules.execute_move(sq(from), sq(to), None).unwrap();
        }
        let status = GameStatus::capture(&rules, Some(LastMove { from: sq("d1"), to: sq("h5") }));

        assert!(status.is_checkmate);
        assert!(status.is_terminal());
        assert_eq!(status.turn, Side::Black);
        assert_eq!(status.checked_king(), Some(sq("e8")));
        assert_eq!(status.history.last().map(String::as_str), Some("Qh5#"));
    }

    #[test]
    fn test_json_shape() {
        let rules = ShakmatyRules::new();
        let status = GameStatus::capture(&rules, None);
        let value: serde_json::Value = serde_json::from_str(&status.to_json().unwrap()).unwrap();

        assert_eq!(value["turn"], "w");
        assert_eq!(value["isCheck"], false);
        assert_eq!(value["isCheckmate"], false);
        assert_eq!(value["isDraw"], false);
        assert!(value["lastMove"].is_null());
        assert_eq!(value["history"].as_array().map(Vec::len), Some(0));
        assert!(value["fen"].as_str().unwrap().starts_with("rnbqkbnr/pppppppp"));
    }
}
