//! One game session: the status broadcaster, both clocks, move intake and the
//! evaluation classifier, wired together.
//!
//! Every method runs to completion on the caller's task, so the components
//! never observe each other mid-update. [`crate::host::SessionHost`] drives a
//! `Session` from its event loop.

use std::sync::Arc;

use chess_core::{GameStatus, PieceKind, RulesEngine, ShakmatyRules, Side, Square};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::broadcaster::StatusBroadcaster;
use crate::clock::{ClockController, ClockPhase, ClockState, TickOutcome};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::evaluation::{Evaluation, EvaluationClassifier};
use crate::feed::{Feed, Subscription};
use crate::intake::{IntakeOutcome, IntakeState, MoveIntake};

/// Notifications outside the status and clock streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Timeout { winner: Side },
    Reset,
}

/// Position to hand to the evaluation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub fen: String,
    pub depth: u32,
}

pub struct Session<R> {
    config: SessionConfig,
    board: StatusBroadcaster<R>,
    clock: ClockController,
    intake: MoveIntake,
    classifier: EvaluationClassifier,
    events: Feed<SessionEvent>,
    analyzed: Option<Arc<GameStatus>>,
}

impl<R: RulesEngine> Session<R> {
    pub fn new(rules: R, config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let clock = ClockController::new(config.clock_start_secs, config.tick_period);
        Ok(Self {
            board: StatusBroadcaster::new(rules),
            clock,
            intake: MoveIntake::new(),
            classifier: EvaluationClassifier::new(),
            events: Feed::new(),
            analyzed: None,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn status(&self) -> Option<Arc<GameStatus>> {
        self.board.current_status()
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn clock_phase(&self) -> ClockPhase {
        self.clock.phase()
    }

    pub fn intake_state(&self) -> &IntakeState {
        self.intake.state()
    }

    pub fn latest_evaluation(&self) -> Option<Evaluation> {
        self.classifier.latest().copied()
    }

    /// Checkmate, draw or a flag fall.
    pub fn is_terminal(&self) -> bool {
        self.clock.is_timed_out() || self.status().is_some_and(|s| s.is_terminal())
    }

    pub fn submit_move(&mut self, from: Square, to: Square, promotion: Option<PieceKind>) -> bool {
        if self.clock.is_timed_out() {
            debug!(%from, %to, "Move after timeout ignored");
            return false;
        }
        self.intake.clear();
        let accepted = self.board.submit_move(from, to, promotion);
        if accepted {
            self.on_move_accepted();
        }
        accepted
    }

    pub fn legal_destinations(&self, origin: Square) -> Vec<Square> {
        self.board.legal_destinations(origin)
    }

    pub fn activate_square(&mut self, square: Square) -> IntakeOutcome {
        if self.clock.is_timed_out() {
            return IntakeOutcome::Ignored;
        }
        let outcome = self.intake.activate(square, &mut self.board);
        self.after_intake(&outcome);
        outcome
    }

    /// Row/column form of [`Session::activate_square`]; out-of-range
    /// coordinates are ignored.
    pub fn activate_at(&mut self, row: u8, col: u8) -> IntakeOutcome {
        match Square::from_row_col(row, col) {
            Some(square) => self.activate_square(square),
            None => {
                debug!(row, col, "Activation outside the board ignored");
                IntakeOutcome::Ignored
            }
        }
    }

    pub fn drop_piece(&mut self, from: Square, to: Square) -> IntakeOutcome {
        if self.clock.is_timed_out() {
            return IntakeOutcome::Ignored;
        }
        let outcome = self.intake.drop_piece(from, to, &mut self.board);
        self.after_intake(&outcome);
        outcome
    }

    pub fn confirm_promotion(&mut self, piece: PieceKind) -> IntakeOutcome {
        if self.clock.is_timed_out() {
            self.intake.clear();
            return IntakeOutcome::Ignored;
        }
        let outcome = self.intake.confirm_promotion(piece, &mut self.board);
        self.after_intake(&outcome);
        outcome
    }

    pub fn cancel_promotion(&mut self) -> IntakeOutcome {
        self.intake.cancel_promotion()
    }

    /// Apply one clock tick against the current snapshot.
    pub fn tick(&mut self) -> TickOutcome {
        let status = self.board.current_status();
        let outcome = self.clock.tick(status.as_deref());
        if let TickOutcome::Timeout { winner, .. } = outcome {
            self.intake.clear();
            self.events.publish(SessionEvent::Timeout { winner });
        }
        outcome
    }

    /// Resolves when the clock is due to tick; pends while it is not running.
    pub async fn next_tick(&mut self) {
        self.clock.next_tick().await
    }

    pub fn on_engine_line(&mut self, line: &str) -> Option<Evaluation> {
        self.classifier.on_engine_line(line)
    }

    /// The current position if it has not been handed out for analysis yet
    /// and the game is still live.
    pub fn take_analysis_request(&mut self) -> Option<AnalysisRequest> {
        let status = self.board.current_status()?;
        if self
            .analyzed
            .as_ref()
            .is_some_and(|seen| Arc::ptr_eq(seen, &status))
        {
            return None;
        }
        self.analyzed = Some(status.clone());
        if self.is_terminal() {
            return None;
        }
        Some(AnalysisRequest {
            fen: status.fen.clone(),
            depth: self.config.search_depth,
        })
    }

    /// New game. The clock schedule is cancelled before anything else
    /// changes.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.intake.clear();
        self.board.reset();
        self.classifier.reset();
        self.events.publish(SessionEvent::Reset);
        info!("Session reset");
    }

    pub fn subscribe_status(&mut self) -> Subscription<Arc<GameStatus>> {
        self.board.subscribe()
    }

    pub fn subscribe_clock(&mut self, side: Side) -> Subscription<u32> {
        self.clock.subscribe(side)
    }

    pub fn subscribe_events(&mut self) -> Subscription<SessionEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_evaluations(&mut self) -> Subscription<Evaluation> {
        self.classifier.subscribe()
    }

    /// Stop the clock and disconnect every subscriber.
    pub fn close(&mut self) {
        self.clock.close();
        self.board.close();
        self.classifier.close();
        self.events.close();
    }

    fn on_move_accepted(&mut self) {
        self.clock.on_move_accepted();
        if self.status().is_some_and(|s| s.is_terminal()) {
            self.intake.clear();
            info!("Game over on the board");
        }
    }

    fn after_intake(&mut self, outcome: &IntakeOutcome) {
        if let IntakeOutcome::Submitted { accepted: true } = outcome {
            self.on_move_accepted();
        }
    }
}

impl Session<ShakmatyRules> {
    /// Standard starting position.
    pub fn standard(config: SessionConfig) -> Result<Self, SessionError> {
        Self::new(ShakmatyRules::new(), config)
    }

    /// Start from an arbitrary position; `reset` still returns to the
    /// standard start.
    pub fn from_fen(fen: &str, config: SessionConfig) -> Result<Self, SessionError> {
        Self::new(ShakmatyRules::from_fen(fen)?, config)
    }
}
