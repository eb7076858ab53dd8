use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::domain::{FlowRejection, SessionId, VerificationEvent, VerificationOutcome};
use super::gateway::OtpGateway;
use super::session::{
    GatewayCommand, GatewayReply, ReplyDisposition, SessionSnapshot, Transition,
    VerificationSession,
};

pub const DEFAULT_EVENT_BUFFER: usize = 32;

/// State reported back to the sender of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlowStatus {
    Active { snapshot: SessionSnapshot },
    Finished { outcome: VerificationOutcome },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Rejected(#[from] FlowRejection),
    #[error("verification session has ended")]
    Closed,
}

struct FlowCommand {
    event: VerificationEvent,
    reply: oneshot::Sender<Result<FlowStatus, FlowRejection>>,
}

/// Presentation-side handle to a running verification flow.
///
/// Dropping every clone abandons the session: the driver stops, and any gateway call
/// still in flight is cancelled and its reply ignored.
#[derive(Debug, Clone)]
pub struct FlowHandle {
    session_id: SessionId,
    commands: mpsc::Sender<FlowCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl FlowHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Queue an event and wait for the session to process it.
    pub async fn send(&self, event: VerificationEvent) -> Result<FlowStatus, FlowError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(FlowCommand { event, reply })
            .await
            .map_err(|_| FlowError::Closed)?;

        let status = response.await.map_err(|_| FlowError::Closed)??;
        Ok(status)
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait until no gateway call is outstanding.
    pub async fn settled(&self) -> Result<SessionSnapshot, FlowError> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|snapshot| !snapshot.is_verifying)
            .await
            .map_err(|_| FlowError::Closed)?;
        Ok(snapshot.clone())
    }
}

/// Start the driver task that owns `session` and serializes all of its events.
pub fn spawn_flow<G>(session: VerificationSession, gateway: Arc<G>, buffer: usize) -> FlowHandle
where
    G: OtpGateway + 'static,
{
    let session_id = session.id().clone();
    let (commands, command_rx) = mpsc::channel(buffer.max(1));
    let (snapshot_tx, snapshots) = watch::channel(session.snapshot());
    let (replies, reply_rx) = mpsc::unbounded_channel();

    let driver = FlowDriver {
        session,
        gateway,
        replies,
        snapshots: snapshot_tx,
        in_flight: None,
    };
    tokio::spawn(driver.run(command_rx, reply_rx));

    FlowHandle {
        session_id,
        commands,
        snapshots,
    }
}

struct FlowDriver<G> {
    session: VerificationSession,
    gateway: Arc<G>,
    replies: mpsc::UnboundedSender<GatewayReply>,
    snapshots: watch::Sender<SessionSnapshot>,
    in_flight: Option<JoinHandle<()>>,
}

impl<G> FlowDriver<G>
where
    G: OtpGateway + 'static,
{
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<FlowCommand>,
        mut replies: mpsc::UnboundedReceiver<GatewayReply>,
    ) -> Option<VerificationOutcome> {
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(FlowCommand { event, reply }) = command else {
                        debug!(session_id = %self.session.id(), "verification session abandoned");
                        self.cancel_in_flight();
                        return None;
                    };

                    let result = self.handle_event(event);
                    let finished = match &result {
                        Ok(FlowStatus::Finished { outcome }) => Some(*outcome),
                        _ => None,
                    };
                    let _ = reply.send(result);

                    if let Some(outcome) = finished {
                        info!(
                            session_id = %self.session.id(),
                            verified = outcome.verified,
                            "verification session finished"
                        );
                        self.cancel_in_flight();
                        return Some(outcome);
                    }
                }
                Some(reply) = replies.recv() => self.handle_reply(reply),
            }
        }
    }

    fn handle_event(&mut self, event: VerificationEvent) -> Result<FlowStatus, FlowRejection> {
        let event_name = event.name();
        let transition = match self.session.apply(event) {
            Ok(transition) => transition,
            Err(rejection) => {
                debug!(
                    session_id = %self.session.id(),
                    event = event_name,
                    %rejection,
                    "verification event rejected"
                );
                return Err(rejection);
            }
        };

        debug!(
            session_id = %self.session.id(),
            event = event_name,
            step = ?self.session.step(),
            "verification event applied"
        );

        match transition {
            Transition::Finished(outcome) => return Ok(FlowStatus::Finished { outcome }),
            Transition::Dispatch(command) => self.dispatch(command),
            Transition::Updated => {
                if !self.session.is_verifying() {
                    self.cancel_in_flight();
                }
            }
        }

        let snapshot = self.publish();
        Ok(FlowStatus::Active { snapshot })
    }

    fn handle_reply(&mut self, reply: GatewayReply) {
        let ticket = reply.ticket();
        match self.session.resolve(reply) {
            ReplyDisposition::Applied => {
                self.in_flight = None;
                if let Some(notice) = self.session.notice() {
                    warn!(
                        session_id = %self.session.id(),
                        ticket = ticket.value(),
                        ?notice,
                        "verification gateway call did not succeed"
                    );
                }
                self.publish();
            }
            ReplyDisposition::Stale => {
                debug!(
                    session_id = %self.session.id(),
                    ticket = ticket.value(),
                    "discarding stale gateway reply"
                );
            }
        }
    }

    fn dispatch(&mut self, command: GatewayCommand) {
        self.cancel_in_flight();

        let call = match &command {
            GatewayCommand::SendOtp { .. } => "send_otp",
            GatewayCommand::VerifyOtp { .. } => "verify_otp",
        };
        info!(
            session_id = %self.session.id(),
            ticket = command.ticket().value(),
            call,
            "dispatching otp gateway call"
        );

        let gateway = Arc::clone(&self.gateway);
        let replies = self.replies.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let reply = match command {
                GatewayCommand::SendOtp {
                    ticket,
                    id_type,
                    id_number,
                } => GatewayReply::Sent {
                    ticket,
                    result: gateway.send_otp(id_type, &id_number).await,
                },
                GatewayCommand::VerifyOtp {
                    ticket,
                    request_id,
                    code,
                } => GatewayReply::Checked {
                    ticket,
                    result: gateway.verify_otp(&request_id, &code).await,
                },
            };
            // The driver may already be gone; the reply is then irrelevant.
            let _ = replies.send(reply);
        }));
    }

    fn cancel_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    fn publish(&self) -> SessionSnapshot {
        let snapshot = self.session.snapshot();
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }
}
