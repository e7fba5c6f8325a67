use std::sync::Once;
use std::time::Duration;

use chess_core::{ShakmatyRules, Square};
use game_session::{EngineLink, Session, SessionConfig, SessionHandle, SessionHost};
use tokio::task::JoinHandle;

static TRACING: Once = Once::new();

/// Route `tracing` output to the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Parse an algebraic square like "e4".
pub fn sq(s: &str) -> Square {
    s.parse().unwrap()
}

pub fn config(clock_start_secs: u32) -> SessionConfig {
    SessionConfig {
        clock_start_secs,
        tick_period: Duration::from_secs(1),
        ..SessionConfig::default()
    }
}

/// Spawn a host for a standard game and return its handle and task.
pub fn spawn_host(
    config: SessionConfig,
    engine: Option<EngineLink>,
) -> (SessionHandle, JoinHandle<()>) {
    init_tracing();
    let session = Session::new(ShakmatyRules::new(), config).unwrap();
    let (host, handle) = SessionHost::new(session, engine);
    (handle, tokio::spawn(host.run()))
}

/// Play a list of (from, to) moves, asserting each is accepted.
pub async fn play(handle: &SessionHandle, moves: &[(&str, &str)]) {
    for (from, to) in moves {
        assert!(
            handle.submit_move(sq(from), sq(to), None).await.unwrap(),
            "{from}{to} rejected"
        );
    }
}

/// Everything queued on a subscription right now.
#[allow(dead_code)]
pub fn drain<T>(rx: &mut tokio::sync::mpsc::UnboundedReceiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(v) = rx.try_recv() {
        out.push(v);
    }
    out
}

pub const FOOLS_MATE: [(&str, &str); 4] = [("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")];
