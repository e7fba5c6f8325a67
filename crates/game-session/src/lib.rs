//! Interactive chess session orchestration.
//!
//! A [`Session`] ties together the status broadcaster, the two clocks, the
//! click/drag move intake and the evaluation classifier. [`SessionHost`]
//! runs a session on a single event loop alongside an optional UCI engine.

pub mod broadcaster;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod feed;
pub mod host;
pub mod intake;
pub mod session;

pub use broadcaster::StatusBroadcaster;
pub use clock::{ClockController, ClockPhase, ClockState, TickOutcome};
pub use config::SessionConfig;
pub use engine::{EngineEndpoint, EngineLink, EngineOptions, EngineRequest, UciEngine};
pub use error::SessionError;
pub use evaluation::{EngineLine, Evaluation, EvaluationClassifier, MoveQualityLabel};
pub use feed::{Feed, Subscription};
pub use host::{SessionCommand, SessionHandle, SessionHost};
pub use intake::{IntakeOutcome, IntakeState, MoveIntake, PendingPromotion};
pub use session::{AnalysisRequest, Session, SessionEvent};
