//! Sole writer of `GameStatus`: executes moves through the rules engine and
//! publishes a fresh snapshot after every accepted move or reset.

use std::sync::Arc;

use chess_core::{GameStatus, LastMove, PieceKind, RulesEngine, Square};
use tracing::debug;

use crate::feed::{Feed, Subscription};

pub struct StatusBroadcaster<R> {
    rules: R,
    last_move: Option<LastMove>,
    feed: Feed<Arc<GameStatus>>,
}

impl<R: RulesEngine> StatusBroadcaster<R> {
    /// Wraps `rules` and publishes its current position as the first snapshot.
    pub fn new(rules: R) -> Self {
        let mut broadcaster = Self {
            rules,
            last_move: None,
            feed: Feed::new(),
        };
        broadcaster.publish();
        broadcaster
    }

    /// Returns whether the move was accepted. Rejections change nothing and
    /// publish nothing.
    pub fn submit_move(&mut self, from: Square, to: Square, promotion: Option<PieceKind>) -> bool {
        match self.rules.execute_move(from, to, promotion) {
            Ok(()) => {
                self.last_move = Some(LastMove { from, to });
                self.publish();
                true
            }
            Err(e) => {
                debug!(%from, %to, error = %e, "Move rejected");
                false
            }
        }
    }

    pub fn current_status(&self) -> Option<Arc<GameStatus>> {
        self.feed.latest().cloned()
    }

    pub fn legal_destinations(&self, origin: Square) -> Vec<Square> {
        self.rules.legal_destinations(origin)
    }

    pub fn reset(&mut self) {
        self.rules.reset();
        self.last_move = None;
        self.publish();
    }

    pub fn subscribe(&mut self) -> Subscription<Arc<GameStatus>> {
        self.feed.subscribe()
    }

    pub fn close(&mut self) {
        self.feed.close();
    }

    fn publish(&mut self) {
        let status = GameStatus::capture(&self.rules, self.last_move);
        debug!(fen = %status.fen, plies = status.history.len(), "Status published");
        self.feed.publish(Arc::new(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::{ShakmatyRules, Side};

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_initial_snapshot_available() {
        let broadcaster = StatusBroadcaster::new(ShakmatyRules::new());
        let status = broadcaster.current_status().unwrap();
        assert_eq!(status.turn, Side::White);
        assert!(status.history.is_empty());
        assert!(status.last_move.is_none());
    }

    #[test]
    fn test_accepted_move_publishes_snapshot() {
        let mut broadcaster = StatusBroadcaster::new(ShakmatyRules::new());
        let mut rx = broadcaster.subscribe();
        let initial = rx.try_recv().unwrap();

        assert!(broadcaster.submit_move(sq("e2"), sq("e4"), None));
        let next = rx.try_recv().unwrap();

        assert!(initial.history.is_empty());
        assert_eq!(next.history, vec!["e4".to_string()]);
        assert_eq!(next.turn, Side::Black);
        assert_eq!(next.last_move, Some(LastMove { from: sq("e2"), to: sq("e4") }));
        assert!(Arc::ptr_eq(&next, &broadcaster.current_status().unwrap()));
    }

    #[test]
    fn test_rejected_move_publishes_nothing() {
        let mut broadcaster = StatusBroadcaster::new(ShakmatyRules::new());
        let before = broadcaster.current_status().unwrap();
        let mut rx = broadcaster.subscribe();
        let _ = rx.try_recv();

        assert!(!broadcaster.submit_move(sq("e2"), sq("e6"), None));
        assert!(!broadcaster.submit_move(sq("e7"), sq("e5"), None));

        assert!(rx.try_recv().is_err());
        assert!(Arc::ptr_eq(&before, &broadcaster.current_status().unwrap()));
    }

    #[test]
    fn test_reset_clears_last_move_and_history() {
        let mut broadcaster = StatusBroadcaster::new(ShakmatyRules::new());
        broadcaster.submit_move(sq("e2"), sq("e4"), None);
        broadcaster.submit_move(sq("c7"), sq("c5"), None);

        broadcaster.reset();
        let status = broadcaster.current_status().unwrap();
        assert!(status.history.is_empty());
        assert!(status.last_move.is_none());
        assert_eq!(status.turn, Side::White);
    }
}
