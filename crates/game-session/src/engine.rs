//! UCI evaluation engine bridge (async I/O)
//!
//! The host talks to the engine only through an [`EngineLink`]: analysis
//! requests go out on one channel, raw stdout lines come back on another,
//! one line per message. [`UciEngine::spawn`] backs a link with a real
//! engine process; tests drive the [`EngineEndpoint`] directly.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub threads: u32,
    pub hash_mb: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            hash_mb: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineRequest {
    Analyze { fen: String, depth: u32 },
    Quit,
}

/// Host side of the engine channel pair.
#[derive(Debug)]
pub struct EngineLink {
    requests: mpsc::UnboundedSender<EngineRequest>,
    lines: mpsc::UnboundedReceiver<String>,
    task: Option<JoinHandle<()>>,
}

/// Engine side of the channel pair.
#[derive(Debug)]
pub struct EngineEndpoint {
    pub requests: mpsc::UnboundedReceiver<EngineRequest>,
    pub lines: mpsc::UnboundedSender<String>,
}

impl EngineLink {
    pub fn channel() -> (EngineLink, EngineEndpoint) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        (
            EngineLink {
                requests: request_tx,
                lines: line_rx,
                task: None,
            },
            EngineEndpoint {
                requests: request_rx,
                lines: line_tx,
            },
        )
    }

    /// Returns false when the engine side has gone away.
    pub fn request_analysis(&self, fen: &str, depth: u32) -> bool {
        self.requests
            .send(EngineRequest::Analyze {
                fen: fen.to_string(),
                depth,
            })
            .is_ok()
    }

    /// Next raw engine line; `None` once the engine side is closed.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Ask the engine to quit and wait for its task, if any, to finish.
    pub async fn shutdown(mut self) {
        let _ = self.requests.send(EngineRequest::Quit);
        self.lines.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Engine task ended abnormally");
            }
        }
    }
}

/// Engine process speaking UCI over stdio
pub struct UciEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    searching: bool,
}

impl UciEngine {
    /// Spawn the engine and complete the UCI handshake
    pub async fn start(path: &str, options: EngineOptions) -> Result<Self, SessionError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SessionError::Engine(format!("Failed to spawn engine {path}: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| SessionError::Engine("Engine stdin not captured".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| SessionError::Engine("Engine stdout not captured".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            searching: false,
        };

        engine.send("uci").await?;
        engine.wait_for("uciok").await?;

        engine
            .send(&format!("setoption name Threads value {}", options.threads))
            .await?;
        engine
            .send(&format!("setoption name Hash value {}", options.hash_mb))
            .await?;
        engine.send("setoption name UCI_AnalyseMode value true").await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        info!(path, threads = options.threads, hash_mb = options.hash_mb, "Engine ready");
        Ok(engine)
    }

    /// Start the engine and hand it to a background task behind a link.
    pub async fn spawn(path: &str, options: EngineOptions) -> Result<EngineLink, SessionError> {
        Ok(Self::start(path, options).await?.into_link())
    }

    pub fn into_link(self) -> EngineLink {
        let (mut link, endpoint) = EngineLink::channel();
        link.task = Some(tokio::spawn(self.run(endpoint)));
        link
    }

    async fn send(&mut self, cmd: &str) -> Result<(), SessionError> {
        debug!(cmd, "engine <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| SessionError::Engine(format!("Failed to write to engine: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| SessionError::Engine(format!("Failed to flush engine stdin: {e}")))?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<String>, SessionError> {
        self.stdout
            .next_line()
            .await
            .map_err(|e| SessionError::Engine(format!("Failed to read from engine: {e}")))
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), SessionError> {
        while let Some(line) = self.read_line().await? {
            let trimmed = line.trim();
            debug!(line = trimmed, "engine >");
            if trimmed == expected {
                return Ok(());
            }
        }
        Err(SessionError::Engine(format!("Engine exited before {expected}")))
    }

    /// Search `fen` to a fixed depth, stopping any search still running.
    pub async fn analyze(&mut self, fen: &str, depth: u32) -> Result<(), SessionError> {
        if self.searching {
            self.stop_search().await?;
        }
        self.send(&position_command(fen)).await?;
        self.send(&go_command(depth)).await?;
        self.searching = true;
        Ok(())
    }

    /// Stop the running search and discard its output up to and including
    /// its `bestmove`, so no stale line reaches the next request.
    async fn stop_search(&mut self) -> Result<(), SessionError> {
        self.send("stop").await?;
        while let Some(line) = self.read_line().await? {
            let trimmed = line.trim();
            debug!(line = trimmed, "engine > (stopped search)");
            if trimmed.starts_with("bestmove") {
                self.searching = false;
                return Ok(());
            }
        }
        Err(SessionError::Engine("Engine exited before bestmove".into()))
    }

    /// Send quit command and wait for process to exit
    pub async fn quit(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }

    async fn run(mut self, mut endpoint: EngineEndpoint) {
        loop {
            tokio::select! {
                request = endpoint.requests.recv() => match request {
                    Some(EngineRequest::Analyze { fen, depth }) => {
                        if let Err(e) = self.analyze(&fen, depth).await {
                            warn!(error = %e, "Analysis request failed");
                            break;
                        }
                    }
                    Some(EngineRequest::Quit) | None => break,
                },
                line = self.stdout.next_line() => match line {
                    Ok(Some(line)) => {
                        // Stale searches are drained in `stop_search`, so
                        // this bestmove ends the current one
                        if line.starts_with("bestmove") {
                            self.searching = false;
                        }
                        if endpoint.lines.send(line).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        warn!("Engine closed its output");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read from engine");
                        break;
                    }
                },
            }
        }
        self.quit().await;
        debug!("Engine task finished");
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

pub fn position_command(fen: &str) -> String {
    format!("position fen {fen}")
}

pub fn go_command(depth: u32) -> String {
    format!("go depth {depth}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_commands() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        assert_eq!(
            position_command(fen),
            "position fen rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
        assert_eq!(go_command(15), "go depth 15");
    }

    #[tokio::test]
    async fn test_link_carries_requests_and_lines_in_order() {
        let (mut link, mut endpoint) = EngineLink::channel();

        assert!(link.request_analysis("8/8/8/8/8/8/8/K6k w - - 0 1", 12));
        assert_eq!(
            endpoint.requests.recv().await,
            Some(EngineRequest::Analyze {
                fen: "8/8/8/8/8/8/8/K6k w - - 0 1".into(),
                depth: 12,
            })
        );

        for line in ["info depth 1 score cp 10", "info depth 2 score cp 12", "bestmove a1a2"] {
            endpoint.lines.send(line.to_string()).unwrap();
        }
        assert_eq!(link.next_line().await.as_deref(), Some("info depth 1 score cp 10"));
        assert_eq!(link.next_line().await.as_deref(), Some("info depth 2 score cp 12"));
        assert_eq!(link.next_line().await.as_deref(), Some("bestmove a1a2"));
    }

    #[tokio::test]
    async fn test_shutdown_sends_quit() {
        let (link, mut endpoint) = EngineLink::channel();
        link.shutdown().await;
        assert_eq!(endpoint.requests.recv().await, Some(EngineRequest::Quit));
        assert_eq!(endpoint.requests.recv().await, None);
    }

    #[tokio::test]
    async fn test_request_fails_after_engine_side_dropped() {
        let (link, endpoint) = EngineLink::channel();
        drop(endpoint);
        assert!(!link.request_analysis("8/8/8/8/8/8/8/K6k w - - 0 1", 15));
    }

    /// Writes an executable UCI stand-in that logs every command it gets.
    /// `go` prints one score line; `stop` prints a stale score and `bestmove`.
    #[cfg(unix)]
    fn scripted_engine(name: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("uci-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let log = dir.join("commands.log");
        let script = dir.join("engine.sh");
        let _ = std::fs::remove_file(&log);
        std::fs::write(
            &script,
            format!(
                r#"#!/bin/sh
while IFS= read -r cmd; do
  echo "$cmd" >> "{log}"
  case "$cmd" in
    uci) echo "id name scripted"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "info depth 1 score cp 10 pv e2e4" ;;
    stop) echo "info depth 2 score cp 99 pv d2d4"; echo "bestmove d2d4" ;;
    quit) exit 0 ;;
  esac
done
"#,
                log = log.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        (script, log)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_each_overlapping_request_stops_the_previous_search() {
        let (script, log) = scripted_engine("overlap");
        let engine = UciEngine::start(script.to_str().unwrap(), EngineOptions::default())
            .await
            .unwrap();
        let mut link = engine.into_link();

        for fen in ["FEN_A", "FEN_B", "FEN_C"] {
            assert!(link.request_analysis(fen, 15));
        }

        let mut forwarded = Vec::new();
        while let Ok(Some(line)) =
            tokio::time::timeout(std::time::Duration::from_millis(300), link.next_line()).await
        {
            forwarded.push(line);
        }
        link.shutdown().await;

        // Only current-search output gets through; the stale score and
        // bestmove printed on `stop` are swallowed
        assert!(!forwarded.is_empty());
        assert!(forwarded.iter().all(|l| l == "info depth 1 score cp 10 pv e2e4"));

        let commands: Vec<String> = std::fs::read_to_string(&log)
            .unwrap()
            .lines()
            .filter(|l| ["position", "go", "stop", "quit"].iter().any(|p| l.starts_with(p)))
            .map(str::to_string)
            .collect();
        assert_eq!(
            commands,
            vec![
                "position fen FEN_A",
                "go depth 15",
                "stop",
                "position fen FEN_B",
                "go depth 15",
                "stop",
                "position fen FEN_C",
                "go depth 15",
                "quit",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_engine_binary() {
        let result = UciEngine::start("/nonexistent/uci-engine", EngineOptions::default()).await;
        assert!(matches!(result, Err(SessionError::Engine(_))));
    }
}
