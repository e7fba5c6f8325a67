//! Pointer/drag input to validated move requests.
//!
//! States: `Idle`, `Selected` (origin plus its legal destinations) and
//! `AwaitingPromotionChoice`. Any event arriving while the current snapshot is
//! terminal is ignored.

use chess_core::{PieceKind, RulesEngine, Side, Square};
use serde::Serialize;
use tracing::debug;

use crate::broadcaster::StatusBroadcaster;

/// A pawn move onto its last rank waiting for the piece choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingPromotion {
    pub from: Square,
    pub to: Square,
    /// Destination row/column, for placing the piece picker.
    pub row: u8,
    pub col: u8,
    pub side: Side,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IntakeState {
    #[default]
    Idle,
    Selected {
        origin: Square,
        destinations: Vec<Square>,
    },
    AwaitingPromotionChoice(PendingPromotion),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntakeOutcome {
    Ignored,
    Selected {
        origin: Square,
        destinations: Vec<Square>,
    },
    Deselected,
    PromotionPending(PendingPromotion),
    Submitted {
        accepted: bool,
    },
    PromotionCancelled,
}

#[derive(Debug, Default)]
pub struct MoveIntake {
    state: IntakeState,
}

impl MoveIntake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &IntakeState {
        &self.state
    }

    pub fn selection(&self) -> Option<(Square, &[Square])> {
        match &self.state {
            IntakeState::Selected {
                origin,
                destinations,
            } => Some((*origin, destinations.as_slice())),
            _ => None,
        }
    }

    pub fn pending_promotion(&self) -> Option<&PendingPromotion> {
        match &self.state {
            IntakeState::AwaitingPromotionChoice(pending) => Some(pending),
            _ => None,
        }
    }

    /// Click/tap on a square.
    pub fn activate<R: RulesEngine>(
        &mut self,
        square: Square,
        board: &mut StatusBroadcaster<R>,
    ) -> IntakeOutcome {
        let Some(status) = board.current_status() else {
            return IntakeOutcome::Ignored;
        };
        if status.is_terminal() {
            return IntakeOutcome::Ignored;
        }

        match std::mem::take(&mut self.state) {
            IntakeState::Idle => self.select(square, status.turn, board),
            IntakeState::AwaitingPromotionChoice(pending) => {
                // Only confirm/cancel resolve a pending promotion
                self.state = IntakeState::AwaitingPromotionChoice(pending);
                IntakeOutcome::Ignored
            }
            IntakeState::Selected {
                origin,
                destinations,
            } => {
                if square == origin {
                    return IntakeOutcome::Deselected;
                }
                if destinations.contains(&square) {
                    return self.complete(origin, square, board);
                }
                let own_piece = status
                    .piece_at(square)
                    .is_some_and(|p| p.side == status.turn);
                if own_piece {
                    return match self.select(square, status.turn, board) {
                        IntakeOutcome::Ignored => IntakeOutcome::Deselected,
                        outcome => outcome,
                    };
                }
                IntakeOutcome::Deselected
            }
        }
    }

    /// Drag released over `to`. Clears any click selection or pending
    /// promotion first.
    pub fn drop_piece<R: RulesEngine>(
        &mut self,
        from: Square,
        to: Square,
        board: &mut StatusBroadcaster<R>,
    ) -> IntakeOutcome {
        let Some(status) = board.current_status() else {
            return IntakeOutcome::Ignored;
        };
        if status.is_terminal() {
            return IntakeOutcome::Ignored;
        }
        self.clear();

        if status.piece_at(from).is_none() {
            return IntakeOutcome::Ignored;
        }
        self.complete(from, to, board)
    }

    pub fn confirm_promotion<R: RulesEngine>(
        &mut self,
        piece: PieceKind,
        board: &mut StatusBroadcaster<R>,
    ) -> IntakeOutcome {
        let IntakeState::AwaitingPromotionChoice(pending) = self.state else {
            return IntakeOutcome::Ignored;
        };
        self.state = IntakeState::Idle;
        let accepted = board.submit_move(pending.from, pending.to, Some(piece));
        IntakeOutcome::Submitted { accepted }
    }

    /// Drops the pending promotion; the pawn stays where it was.
    pub fn cancel_promotion(&mut self) -> IntakeOutcome {
        match self.state {
            IntakeState::AwaitingPromotionChoice(_) => {
                self.state = IntakeState::Idle;
                IntakeOutcome::PromotionCancelled
            }
            _ => IntakeOutcome::Ignored,
        }
    }

    pub fn clear(&mut self) {
        self.state = IntakeState::Idle;
    }

    fn select<R: RulesEngine>(
        &mut self,
        square: Square,
        turn: Side,
        board: &StatusBroadcaster<R>,
    ) -> IntakeOutcome {
        let Some(status) = board.current_status() else {
            return IntakeOutcome::Ignored;
        };
        if !status.piece_at(square).is_some_and(|p| p.side == turn) {
            return IntakeOutcome::Ignored;
        }
        let destinations = board.legal_destinations(square);
        if destinations.is_empty() {
            debug!(%square, "Piece has no legal moves");
            return IntakeOutcome::Ignored;
        }
        self.state = IntakeState::Selected {
            origin: square,
            destinations: destinations.clone(),
        };
        IntakeOutcome::Selected {
            origin: square,
            destinations,
        }
    }

    /// Submit `from`→`to`, or park it as a pending promotion.
    fn complete<R: RulesEngine>(
        &mut self,
        from: Square,
        to: Square,
        board: &mut StatusBroadcaster<R>,
    ) -> IntakeOutcome {
        let piece = board.current_status().and_then(|s| s.piece_at(from));
        if let Some(piece) = piece.filter(|p| p.promotes_on(to)) {
            if board.legal_destinations(from).contains(&to) {
                let pending = PendingPromotion {
                    from,
                    to,
                    row: to.row(),
                    col: to.col(),
                    side: piece.side,
                };
                self.state = IntakeState::AwaitingPromotionChoice(pending);
                return IntakeOutcome::PromotionPending(pending);
            }
        }

        self.state = IntakeState::Idle;
        let accepted = board.submit_move(from, to, None);
        IntakeOutcome::Submitted { accepted }
    }
}
