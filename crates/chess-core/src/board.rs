//! 8×8 row-major piece grid.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{BoardPiece, PieceKind, Side, Square};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardGrid {
    rows: [[Option<BoardPiece>; 8]; 8],
}

impl BoardGrid {
    /// Expand the placement field of a FEN string (row 0 = rank 8).
    pub fn from_fen(fen: &str) -> Result<BoardGrid, CoreError> {
        let placement = fen
            .split_whitespace()
            .next()
            .ok_or_else(|| CoreError::InvalidFen(fen.to_string()))?;

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(CoreError::InvalidFen(fen.to_string()));
        }

        let mut grid = BoardGrid::default();
        for (row, rank) in ranks.iter().enumerate() {
            let mut col = 0usize;
            for c in rank.chars() {
                if let Some(empty) = c.to_digit(10) {
                    col += empty as usize;
                } else {
                    let piece = BoardPiece::from_fen_char(c)
                        .ok_or_else(|| CoreError::InvalidFen(fen.to_string()))?;
                    if col >= 8 {
                        return Err(CoreError::InvalidFen(fen.to_string()));
                    }
                    grid.rows[row][col] = Some(piece);
                    col += 1;
                }
            }
            if col != 8 {
                return Err(CoreError::InvalidFen(fen.to_string()));
            }
        }

        Ok(grid)
    }

    pub fn piece_at(&self, square: Square) -> Option<BoardPiece> {
        self.rows[square.row() as usize][square.col() as usize]
    }

    pub fn set(&mut self, square: Square, piece: Option<BoardPiece>) {
        self.rows[square.row() as usize][square.col() as usize] = piece;
    }

    pub fn rows(&self) -> &[[Option<BoardPiece>; 8]; 8] {
        &self.rows
    }

    pub fn king_square(&self, side: Side) -> Option<Square> {
        Square::all().find(|sq| self.piece_at(*sq) == Some(BoardPiece::new(PieceKind::King, side)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_start_position_grid() {
        let grid = BoardGrid::from_fen(START_FEN).unwrap();
        assert_eq!(
            grid.piece_at(sq("e1")),
            Some(BoardPiece::new(PieceKind::King, Side::White))
        );
        assert_eq!(
            grid.piece_at(sq("d8")),
            Some(BoardPiece::new(PieceKind::Queen, Side::Black))
        );
        assert_eq!(grid.piece_at(sq("e4")), None);
        assert_eq!(grid.rows()[1].iter().flatten().count(), 8);
        assert_eq!(grid.king_square(Side::Black), Some(sq("e8")));
    }

    #[test]
    fn test_rejects_malformed_placement() {
        assert!(BoardGrid::from_fen("").is_err());
        assert!(BoardGrid::from_fen("8/8/8/8/8/8/8 w - - 0 1").is_err());
        assert!(BoardGrid::from_fen("9/8/8/8/8/8/8/8 w - - 0 1").is_err());
        assert!(BoardGrid::from_fen("rnbqkbnrr/8/8/8/8/8/8/8 w - - 0 1").is_err());
        assert!(BoardGrid::from_fen("xnbqkbnr/8/8/8/8/8/8/8 w - - 0 1").is_err());
    }
}
