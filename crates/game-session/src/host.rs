//! Event loop that owns a [`Session`].
//!
//! UI commands, clock ticks and engine lines are served one at a time from a
//! single `select!`, so session state is never touched concurrently.
//! Callers talk to the loop through a cloneable [`SessionHandle`].

use std::sync::Arc;

use chess_core::{GameStatus, PieceKind, RulesEngine, Side, Square};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::engine::EngineLink;
use crate::error::SessionError;
use crate::evaluation::Evaluation;
use crate::feed::Subscription;
use crate::intake::IntakeOutcome;
use crate::session::{Session, SessionEvent};

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug)]
pub enum SessionCommand {
    SubmitMove {
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
        reply: Reply<bool>,
    },
    LegalDestinations {
        origin: Square,
        reply: Reply<Vec<Square>>,
    },
    Activate {
        square: Square,
        reply: Reply<IntakeOutcome>,
    },
    Drop {
        from: Square,
        to: Square,
        reply: Reply<IntakeOutcome>,
    },
    ConfirmPromotion {
        piece: PieceKind,
        reply: Reply<IntakeOutcome>,
    },
    CancelPromotion {
        reply: Reply<IntakeOutcome>,
    },
    Reset {
        reply: Reply<()>,
    },
    Status {
        reply: Reply<Option<Arc<GameStatus>>>,
    },
    SubscribeStatus {
        reply: Reply<Subscription<Arc<GameStatus>>>,
    },
    SubscribeClock {
        side: Side,
        reply: Reply<Subscription<u32>>,
    },
    SubscribeEvents {
        reply: Reply<Subscription<SessionEvent>>,
    },
    SubscribeEvaluations {
        reply: Reply<Subscription<Evaluation>>,
    },
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)
    }

    pub async fn submit_move(
        &self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::SubmitMove {
            from,
            to,
            promotion,
            reply,
        })
        .await
    }

    pub async fn legal_destinations(&self, origin: Square) -> Result<Vec<Square>, SessionError> {
        self.request(|reply| SessionCommand::LegalDestinations { origin, reply })
            .await
    }

    pub async fn activate_square(&self, square: Square) -> Result<IntakeOutcome, SessionError> {
        self.request(|reply| SessionCommand::Activate { square, reply })
            .await
    }

    pub async fn drop_piece(&self, from: Square, to: Square) -> Result<IntakeOutcome, SessionError> {
        self.request(|reply| SessionCommand::Drop { from, to, reply })
            .await
    }

    pub async fn confirm_promotion(&self, piece: PieceKind) -> Result<IntakeOutcome, SessionError> {
        self.request(|reply| SessionCommand::ConfirmPromotion { piece, reply })
            .await
    }

    pub async fn cancel_promotion(&self) -> Result<IntakeOutcome, SessionError> {
        self.request(|reply| SessionCommand::CancelPromotion { reply })
            .await
    }

    pub async fn reset(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Reset { reply }).await
    }

    pub async fn status(&self) -> Result<Option<Arc<GameStatus>>, SessionError> {
        self.request(|reply| SessionCommand::Status { reply }).await
    }

    pub async fn subscribe_status(&self) -> Result<Subscription<Arc<GameStatus>>, SessionError> {
        self.request(|reply| SessionCommand::SubscribeStatus { reply })
            .await
    }

    pub async fn subscribe_clock(&self, side: Side) -> Result<Subscription<u32>, SessionError> {
        self.request(|reply| SessionCommand::SubscribeClock { side, reply })
            .await
    }

    pub async fn subscribe_events(&self) -> Result<Subscription<SessionEvent>, SessionError> {
        self.request(|reply| SessionCommand::SubscribeEvents { reply })
            .await
    }

    pub async fn subscribe_evaluations(&self) -> Result<Subscription<Evaluation>, SessionError> {
        self.request(|reply| SessionCommand::SubscribeEvaluations { reply })
            .await
    }

    /// Ask the loop to stop. Returns immediately; await the host task to
    /// wait for teardown.
    pub fn shutdown(&self) {
        let _ = self.commands.send(SessionCommand::Shutdown);
    }
}

pub struct SessionHost<R> {
    session: Session<R>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    engine: Option<EngineLink>,
}

impl<R: RulesEngine> SessionHost<R> {
    pub fn new(session: Session<R>, engine: Option<EngineLink>) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let host = Self {
            session,
            commands: rx,
            engine,
        };
        (host, SessionHandle { commands: tx })
    }

    /// Serve events until shutdown or until every handle is dropped, then
    /// release the clock, the engine and all subscribers.
    pub async fn run(mut self) {
        info!(engine = self.engine.is_some(), "Session host started");
        self.request_analysis();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                _ = self.session.next_tick() => {
                    self.session.tick();
                }
                line = next_engine_line(&mut self.engine) => match line {
                    Some(line) => {
                        self.session.on_engine_line(&line);
                    }
                    None => {
                        warn!("Engine channel closed; analysis disabled");
                        if let Some(link) = self.engine.take() {
                            link.shutdown().await;
                        }
                    }
                },
            }
            self.request_analysis();
        }

        self.teardown().await;
    }

    fn handle(&mut self, command: SessionCommand) {
        let session = &mut self.session;
        // A dropped reply receiver just means the caller stopped waiting
        match command {
            SessionCommand::SubmitMove {
                from,
                to,
                promotion,
                reply,
            } => {
                let _ = reply.send(session.submit_move(from, to, promotion));
            }
            SessionCommand::LegalDestinations { origin, reply } => {
                let _ = reply.send(session.legal_destinations(origin));
            }
            SessionCommand::Activate { square, reply } => {
                let _ = reply.send(session.activate_square(square));
            }
            SessionCommand::Drop { from, to, reply } => {
                let _ = reply.send(session.drop_piece(from, to));
            }
            SessionCommand::ConfirmPromotion { piece, reply } => {
                let _ = reply.send(session.confirm_promotion(piece));
            }
            SessionCommand::CancelPromotion { reply } => {
                let _ = reply.send(session.cancel_promotion());
            }
            SessionCommand::Reset { reply } => {
                session.reset();
                let _ = reply.send(());
            }
            SessionCommand::Status { reply } => {
                let _ = reply.send(session.status());
            }
            SessionCommand::SubscribeStatus { reply } => {
                let _ = reply.send(session.subscribe_status());
            }
            SessionCommand::SubscribeClock { side, reply } => {
                let _ = reply.send(session.subscribe_clock(side));
            }
            SessionCommand::SubscribeEvents { reply } => {
                let _ = reply.send(session.subscribe_events());
            }
            SessionCommand::SubscribeEvaluations { reply } => {
                let _ = reply.send(session.subscribe_evaluations());
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn request_analysis(&mut self) {
        let Some(link) = &self.engine else {
            return;
        };
        if let Some(request) = self.session.take_analysis_request() {
            debug!(fen = %request.fen, depth = request.depth, "Requesting analysis");
            if !link.request_analysis(&request.fen, request.depth) {
                warn!("Engine stopped accepting requests");
            }
        }
    }

    async fn teardown(mut self) {
        self.session.close();
        if let Some(link) = self.engine.take() {
            link.shutdown().await;
        }
        info!("Session host stopped");
    }
}

async fn next_engine_line(engine: &mut Option<EngineLink>) -> Option<String> {
    match engine {
        Some(link) => link.next_line().await,
        None => std::future::pending().await,
    }
}
