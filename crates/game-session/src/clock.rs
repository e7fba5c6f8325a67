//! Two countdown clocks driven by a periodic tick.
//!
//! The schedule starts one full period after the first accepted move, and
//! only the clock of the side to move is decremented on each tick. A tick
//! that finds the side to move already at zero ends the game on time.

use std::time::Duration;

use chess_core::{GameStatus, Side};
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant, Interval};
use tracing::{debug, info};

use crate::feed::{Feed, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClockPhase {
    Stopped,
    Running,
    Timeout { winner: Side },
}

/// Remaining whole seconds per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockState {
    pub white: u32,
    pub black: u32,
}

impl ClockState {
    pub fn new(seconds: u32) -> Self {
        Self {
            white: seconds,
            black: seconds,
        }
    }

    pub fn remaining(&self, side: Side) -> u32 {
        match side {
            Side::White => self.white,
            Side::Black => self.black,
        }
    }

    fn remaining_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Clock not running.
    Idle,
    /// Game is over by checkmate or draw; nothing decremented.
    Frozen,
    Decremented { side: Side, remaining: u32 },
    Timeout { loser: Side, winner: Side },
}

pub struct ClockController {
    start_secs: u32,
    period: Duration,
    phase: ClockPhase,
    state: ClockState,
    started_at: Option<Instant>,
    schedule: Option<Interval>,
    white: Feed<u32>,
    black: Feed<u32>,
}

impl ClockController {
    pub fn new(start_secs: u32, period: Duration) -> Self {
        Self {
            start_secs,
            period,
            phase: ClockPhase::Stopped,
            state: ClockState::new(start_secs),
            started_at: None,
            schedule: None,
            white: Feed::with_value(start_secs),
            black: Feed::with_value(start_secs),
        }
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self.phase, ClockPhase::Timeout { .. })
    }

    /// First accepted move starts the clock; later calls are no-ops.
    pub fn on_move_accepted(&mut self) {
        if self.phase == ClockPhase::Stopped {
            self.phase = ClockPhase::Running;
            self.started_at = Some(Instant::now());
            info!(start_secs = self.start_secs, "Clock started");
        }
    }

    pub fn tick(&mut self, status: Option<&GameStatus>) -> TickOutcome {
        if self.phase != ClockPhase::Running {
            return TickOutcome::Idle;
        }
        let Some(status) = status else {
            return TickOutcome::Frozen;
        };
        if status.is_terminal() {
            return TickOutcome::Frozen;
        }

        let side = status.turn;
        let remaining = self.state.remaining_mut(side);
        if *remaining > 0 {
            *remaining -= 1;
            let value = *remaining;
            self.feed_mut(side).publish(value);
            debug!(%side, remaining = value, "Clock tick");
            return TickOutcome::Decremented {
                side,
                remaining: value,
            };
        }

        let winner = side.opponent();
        self.phase = ClockPhase::Timeout { winner };
        self.cancel_schedule();
        info!(%winner, loser = %side, "Game over on time");
        TickOutcome::Timeout { loser: side, winner }
    }

    /// Resolves on the next scheduled tick; pends forever while not running.
    pub async fn next_tick(&mut self) {
        if self.schedule.is_none() {
            match (self.phase, self.started_at) {
                (ClockPhase::Running, Some(started_at)) => {
                    self.schedule = Some(time::interval_at(started_at + self.period, self.period));
                }
                _ => {
                    std::future::pending::<()>().await;
                    return;
                }
            }
        }
        if let Some(schedule) = self.schedule.as_mut() {
            schedule.tick().await;
        }
    }

    /// Cancels the schedule before restoring both clocks. Idempotent.
    pub fn reset(&mut self) {
        self.cancel_schedule();
        self.phase = ClockPhase::Stopped;
        self.state = ClockState::new(self.start_secs);
        self.white.publish(self.start_secs);
        self.black.publish(self.start_secs);
    }

    pub fn subscribe(&mut self, side: Side) -> Subscription<u32> {
        self.feed_mut(side).subscribe()
    }

    pub fn close(&mut self) {
        self.cancel_schedule();
        self.white.close();
        self.black.close();
    }

    fn cancel_schedule(&mut self) {
        self.schedule = None;
        self.started_at = None;
    }

    fn feed_mut(&mut self, side: Side) -> &mut Feed<u32> {
        match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        }
    }
}
