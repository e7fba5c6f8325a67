//! Engine score lines to move-quality labels.
//!
//! Each centipawn score is compared with the previous one (0 before the
//! first) and the absolute change picks the label. Thresholds are applied to
//! whole centipawns; pawn values are only for display.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::feed::{Feed, Subscription};

/// Label thresholds (centipawn change, exclusive lower bound)
const THRESHOLD_BLUNDER: u64 = 300;
const THRESHOLD_MISTAKE: u64 = 100;
const THRESHOLD_INACCURACY: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveQualityLabel {
    /// Reserved; no threshold currently produces it.
    Great,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl MoveQualityLabel {
    pub fn from_cp_loss(cp_loss: u64) -> Self {
        if cp_loss > THRESHOLD_BLUNDER {
            MoveQualityLabel::Blunder
        } else if cp_loss > THRESHOLD_MISTAKE {
            MoveQualityLabel::Mistake
        } else if cp_loss > THRESHOLD_INACCURACY {
            MoveQualityLabel::Inaccuracy
        } else {
            MoveQualityLabel::Good
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MoveQualityLabel::Great => "great",
            MoveQualityLabel::Good => "good",
            MoveQualityLabel::Inaccuracy => "inaccuracy",
            MoveQualityLabel::Mistake => "mistake",
            MoveQualityLabel::Blunder => "blunder",
        }
    }
}

impl std::fmt::Display for MoveQualityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Engine score in pawns
    pub score: f64,
    pub label: MoveQualityLabel,
    /// Absolute change from the previous score
    pub drop: f64,
}

/// One line of engine output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLine {
    Centipawns { depth: Option<u32>, cp: i32 },
    Mate { depth: Option<u32>, moves: i32 },
    BestMove(String),
    Other,
}

impl EngineLine {
    pub fn parse(line: &str) -> EngineLine {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.first() {
            Some(&"bestmove") => {
                return match parts.get(1) {
                    Some(mv) => EngineLine::BestMove(mv.to_string()),
                    None => EngineLine::Other,
                };
            }
            Some(&"info") => {}
            _ => return EngineLine::Other,
        }

        let depth = token_after(&parts, "depth");
        if let Some(cp) = token_after(&parts, "cp") {
            return EngineLine::Centipawns { depth, cp };
        }
        if let Some(moves) = token_after(&parts, "mate") {
            return EngineLine::Mate { depth, moves };
        }
        EngineLine::Other
    }
}

/// Parse the token following `key`, if any
fn token_after<T: std::str::FromStr>(parts: &[&str], key: &str) -> Option<T> {
    let i = parts.iter().position(|p| *p == key)?;
    parts.get(i + 1)?.parse().ok()
}

#[derive(Debug, Default)]
pub struct EvaluationClassifier {
    previous_cp: i32,
    feed: Feed<Evaluation>,
}

impl EvaluationClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last classified score in centipawns.
    pub fn previous_cp(&self) -> i32 {
        self.previous_cp
    }

    pub fn latest(&self) -> Option<&Evaluation> {
        self.feed.latest()
    }

    /// Classify a raw engine line; lines without a centipawn score are ignored.
    pub fn on_engine_line(&mut self, line: &str) -> Option<Evaluation> {
        match EngineLine::parse(line) {
            EngineLine::Centipawns { cp, .. } => Some(self.classify(cp)),
            EngineLine::Mate { moves, .. } => {
                debug!(moves, "Mate score ignored");
                None
            }
            EngineLine::BestMove(mv) => {
                debug!(best_move = %mv, "Search finished");
                None
            }
            EngineLine::Other => None,
        }
    }

    pub fn classify(&mut self, cp: i32) -> Evaluation {
        let cp_loss = (i64::from(self.previous_cp) - i64::from(cp)).unsigned_abs();
        let label = MoveQualityLabel::from_cp_loss(cp_loss);
        self.previous_cp = cp;

        let score = f64::from(cp) / 100.0;
        let drop = cp_loss as f64 / 100.0;

        info!(score, drop, %label, "Move classified");
        let evaluation = Evaluation { score, label, drop };
        self.feed.publish(evaluation);
        evaluation
    }

    /// Back to the 0.0 baseline.
    pub fn reset(&mut self) {
        self.previous_cp = 0;
    }

    pub fn subscribe(&mut self) -> Subscription<Evaluation> {
        self.feed.subscribe()
    }

    pub fn close(&mut self) {
        self.feed.close();
    }
}
