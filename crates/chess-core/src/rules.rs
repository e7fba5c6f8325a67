//! Rules engine seam and its shakmaty-backed implementation.

use std::collections::HashMap;

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, File, Move, Position, Rank, Role};
use thiserror::Error;
use tracing::debug;

use crate::board::BoardGrid;
use crate::error::CoreError;
use crate::types::{BoardPiece, PieceKind, Side, Square};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    #[error("Illegal move: {from}{to}")]
    IllegalMove { from: Square, to: Square },

    #[error("Cannot promote to {0:?}")]
    InvalidPromotion(PieceKind),
}

/// Everything the session needs from a chess rules implementation.
pub trait RulesEngine {
    /// Execute a move. A pawn reaching its last rank without a promotion
    /// choice promotes to a queen; a choice on any other move is ignored.
    fn execute_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Result<(), RulesError>;

    /// Destinations reachable from `origin` by a legal move, sorted.
    fn legal_destinations(&self, origin: Square) -> Vec<Square>;

    /// FEN of the current position.
    fn position(&self) -> String;

    fn side_to_move(&self) -> Side;

    fn is_check(&self) -> bool;

    fn is_checkmate(&self) -> bool;

    fn is_draw(&self) -> bool;

    /// Executed moves in SAN, oldest first.
    fn history(&self) -> Vec<String>;

    fn board(&self) -> BoardGrid;

    /// Back to the standard starting position with an empty history.
    fn reset(&mut self);
}

/// Standard chess on top of shakmaty.
#[derive(Debug, Clone)]
pub struct ShakmatyRules {
    pos: Chess,
    history: Vec<String>,
    repetitions: HashMap<String, u32>,
}

impl Default for ShakmatyRules {
    fn default() -> Self {
        Self::new()
    }
}

impl ShakmatyRules {
    pub fn new() -> Self {
        Self::from_position(Chess::default())
    }

    /// Start from an arbitrary position (history starts empty).
    pub fn from_fen(fen: &str) -> Result<Self, CoreError> {
        let parsed: Fen = fen
            .parse()
            .map_err(|e| CoreError::InvalidFen(format!("{fen}: {e}")))?;
        let pos: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| CoreError::InvalidFen(format!("{fen}: {e}")))?;
        Ok(Self::from_position(pos))
    }

    fn from_position(pos: Chess) -> Self {
        let mut rules = Self {
            pos,
            history: Vec::new(),
            repetitions: HashMap::new(),
        };
        rules.record_repetition();
        rules
    }

    fn record_repetition(&mut self) {
        *self.repetitions.entry(repetition_key(&self.pos)).or_insert(0) += 1;
    }

    fn is_threefold_repetition(&self) -> bool {
        self.repetitions
            .get(&repetition_key(&self.pos))
            .is_some_and(|count| *count >= 3)
    }

    fn piece_at(&self, square: Square) -> Option<BoardPiece> {
        self.pos
            .board()
            .piece_at(to_shakmaty(square))
            .map(|p| BoardPiece::new(piece_kind(p.role), side_of(p.color)))
    }
}

impl RulesEngine for ShakmatyRules {
    fn execute_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Result<(), RulesError> {
        let promotes = self.piece_at(from).is_some_and(|p| p.promotes_on(to));
        let promotion = if promotes {
            let choice = promotion.unwrap_or(PieceKind::Queen);
            if !choice.is_promotion_choice() {
                return Err(RulesError::InvalidPromotion(choice));
            }
            Some(role_of(choice))
        } else {
            None
        };

        let uci = UciMove::Normal {
            from: to_shakmaty(from),
            to: to_shakmaty(to),
            promotion,
        };
        let mv = uci
            .to_move(&self.pos)
            .map_err(|_| RulesError::IllegalMove { from, to })?;

        let san = SanPlus::from_move_and_play_unchecked(&mut self.pos, mv);
        debug!(san = %san, "Move executed");
        self.history.push(san.to_string());
        self.record_repetition();
        Ok(())
    }

    fn legal_destinations(&self, origin: Square) -> Vec<Square> {
        let origin = to_shakmaty(origin);
        let mut destinations: Vec<Square> = self
            .pos
            .legal_moves()
            .iter()
            .filter(|m| m.from() == Some(origin))
            .map(|m| from_shakmaty(destination(m)))
            .collect();
        // Promotions list one move per piece choice
        destinations.sort();
        destinations.dedup();
        destinations
    }

    fn position(&self) -> String {
        Fen::from_position(&self.pos, EnPassantMode::Legal).to_string()
    }

    fn side_to_move(&self) -> Side {
        side_of(self.pos.turn())
    }

    fn is_check(&self) -> bool {
        self.pos.is_check()
    }

    fn is_checkmate(&self) -> bool {
        self.pos.is_checkmate()
    }

    fn is_draw(&self) -> bool {
        self.pos.is_stalemate()
            || self.pos.is_insufficient_material()
            || self.pos.halfmoves() >= 100
            || self.is_threefold_repetition()
    }

    fn history(&self) -> Vec<String> {
        self.history.clone()
    }

    fn board(&self) -> BoardGrid {
        let mut grid = BoardGrid::default();
        for square in Square::all() {
            grid.set(square, self.piece_at(square));
        }
        grid
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Position + side + castling + ep, no move counters.
fn repetition_key(pos: &Chess) -> String {
    let fen = Fen::from_position(pos, EnPassantMode::Legal).to_string();
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// Where the moving piece lands; castling is reported as the king's target.
fn destination(m: &Move) -> shakmaty::Square {
    match m {
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() {
                File::G
            } else {
                File::C
            };
            shakmaty::Square::from_coords(file, king.rank())
        }
        other => other.to(),
    }
}

fn to_shakmaty(square: Square) -> shakmaty::Square {
    shakmaty::Square::from_coords(
        File::new(u32::from(square.col())),
        Rank::new(u32::from(7 - square.row())),
    )
}

fn from_shakmaty(square: shakmaty::Square) -> Square {
    Square::from_board_index(7 - square.rank() as u8, square.file() as u8)
}

fn side_of(color: Color) -> Side {
    match color {
        Color::White => Side::White,
        Color::Black => Side::Black,
    }
}

fn piece_kind(role: Role) -> PieceKind {
    match role {
        Role::Pawn => PieceKind::Pawn,
        Role::Knight => PieceKind::Knight,
        Role::Bishop => PieceKind::Bishop,
        Role::Rook => PieceKind::Rook,
        Role::Queen => PieceKind::Queen,
        Role::King => PieceKind::King,
    }
}

fn role_of(kind: PieceKind) -> Role {
    match kind {
        PieceKind::Pawn => Role::Pawn,
        PieceKind::Knight => Role::Knight,
        PieceKind::Bishop => Role::Bishop,
        PieceKind::Rook => Role::Rook,
        PieceKind::Queen => Role::Queen,
        PieceKind::King => Role::King,
    }
}
