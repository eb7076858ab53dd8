use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::info;

use super::domain::{SessionId, VerificationEvent};
use super::flow::{spawn_flow, FlowError, FlowHandle, FlowStatus, DEFAULT_EVENT_BUFFER};
use super::gateway::OtpGateway;
use super::registry::{IdTypeRegistry, IdTypeView};
use super::session::{SessionSnapshot, VerificationSession};

/// Sessions untouched for this long are dropped when the next one starts.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Service owning the live verification sessions of this process.
pub struct VerificationService<G> {
    registry: Arc<IdTypeRegistry>,
    gateway: Arc<G>,
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
    event_buffer: usize,
    idle_timeout: Duration,
}

struct SessionEntry {
    handle: FlowHandle,
    last_seen: Instant,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("vs-{id:06}"))
}

impl<G> VerificationService<G>
where
    G: OtpGateway + 'static,
{
    pub fn new(registry: IdTypeRegistry, gateway: Arc<G>) -> Self {
        Self::with_event_buffer(registry, gateway, DEFAULT_EVENT_BUFFER)
    }

    pub fn with_event_buffer(registry: IdTypeRegistry, gateway: Arc<G>, event_buffer: usize) -> Self {
        Self {
            registry: Arc::new(registry),
            gateway,
            sessions: Mutex::new(HashMap::new()),
            event_buffer,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Open a fresh session on the ID selection step.
    pub fn start(&self) -> SessionSnapshot {
        let session = VerificationSession::new(next_session_id(), Arc::clone(&self.registry));
        let handle = spawn_flow(session, Arc::clone(&self.gateway), self.event_buffer);
        let snapshot = handle.snapshot();

        self.expire_idle();
        info!(session_id = %handle.session_id(), "verification session started");
        self.sessions().insert(
            handle.session_id().clone(),
            SessionEntry {
                handle,
                last_seen: Instant::now(),
            },
        );
        snapshot
    }

    /// Forward a user event; terminal outcomes discard the session.
    pub async fn dispatch(
        &self,
        session_id: &SessionId,
        event: VerificationEvent,
    ) -> Result<FlowStatus, VerificationServiceError> {
        let handle = self.handle(session_id)?;

        match handle.send(event).await {
            Ok(FlowStatus::Finished { outcome }) => {
                self.sessions().remove(session_id);
                Ok(FlowStatus::Finished { outcome })
            }
            Ok(status) => Ok(status),
            Err(FlowError::Closed) => {
                self.sessions().remove(session_id);
                Err(VerificationServiceError::NotFound(session_id.clone()))
            }
            Err(error) => Err(error.into()),
        }
    }

    pub fn snapshot(&self, session_id: &SessionId) -> Result<SessionSnapshot, VerificationServiceError> {
        Ok(self.handle(session_id)?.snapshot())
    }

    /// Wait for any outstanding gateway call of the session to resolve.
    pub async fn settled(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionSnapshot, VerificationServiceError> {
        let handle = self.handle(session_id)?;
        Ok(handle.settled().await?)
    }

    /// Navigate away: drop the session and ignore any reply still on its way.
    pub fn abandon(&self, session_id: &SessionId) -> Result<(), VerificationServiceError> {
        self.sessions()
            .remove(session_id)
            .map(|_| info!(%session_id, "verification session abandoned"))
            .ok_or_else(|| VerificationServiceError::NotFound(session_id.clone()))
    }

    pub fn id_types(&self) -> Vec<IdTypeView> {
        self.registry.views()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions().len()
    }

    /// Drop sessions nobody has touched within the idle timeout; their drivers stop and
    /// any gateway call still running is cancelled. Returns how many were dropped.
    pub fn expire_idle(&self) -> usize {
        let idle_timeout = self.idle_timeout;
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen.elapsed() < idle_timeout);
        let expired = before - sessions.len();

        if expired > 0 {
            info!(expired, "idle verification sessions dropped");
        }
        expired
    }

    fn handle(&self, session_id: &SessionId) -> Result<FlowHandle, VerificationServiceError> {
        let mut sessions = self.sessions();
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| VerificationServiceError::NotFound(session_id.clone()))?;
        entry.last_seen = Instant::now();
        Ok(entry.handle.clone())
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Error raised by the verification service.
#[derive(Debug, thiserror::Error)]
pub enum VerificationServiceError {
    #[error("verification session {0} not found")]
    NotFound(SessionId),
    #[error(transparent)]
    Flow(#[from] FlowError),
}
