//! Verification session poller
//!
//! Generates a session id, registers it with the remote registry and polls
//! the proof endpoint until verified or timed out. The interval, the attempt
//! budget and the redundant wall-clock timeout all live in one task, so they
//! are cancelled together on every exit path and exactly one terminal event
//! is ever emitted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::verification::registry::ProofRegistry;
use crate::verification::{VerificationState, VerifiedIdentity};

/// Progress events emitted during one verification session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationEvent {
    Pending { attempts_remaining: u32 },
    Verified { identity: VerifiedIdentity },
    Failed { reason: String },
}

impl VerificationEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, VerificationEvent::Pending { .. })
    }
}

/// Poller timing configuration
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    /// Redundant wall-clock safety net alongside the attempt budget
    pub timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            max_attempts: 90,
            timeout: Duration::from_millis(90_000),
        }
    }
}

/// Handle to a running verification session.
///
/// Dropping the handle cancels the session; the polling task and its timers
/// are torn down together.
pub struct VerificationHandle {
    pub session_id: Uuid,
    pub events: ReceiverStream<VerificationEvent>,
    task: JoinHandle<()>,
}

impl VerificationHandle {
    /// Cancel the session before it reaches a terminal outcome
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for VerificationHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Runs one identity-verification session against the remote registry
pub struct VerificationSessionPoller {
    registry: Arc<dyn ProofRegistry>,
    state: Arc<VerificationState>,
    config: PollerConfig,
}

impl VerificationSessionPoller {
    /// Create a poller with the default polling budget
    pub fn new(registry: Arc<dyn ProofRegistry>, state: Arc<VerificationState>) -> Self {
        Self::with_config(registry, state, PollerConfig::default())
    }

    pub fn with_config(
        registry: Arc<dyn ProofRegistry>,
        state: Arc<VerificationState>,
        config: PollerConfig,
    ) -> Self {
        Self {
            registry,
            state,
            config,
        }
    }

    /// Start a fresh verification session.
    ///
    /// A universally-unique session id is generated and registered, then the
    /// proof endpoint is polled on a fixed interval. `Pending` events report
    /// the remaining attempt budget; exactly one `Verified` or `Failed`
    /// event follows. On success the shared [`VerificationState`] is updated
    /// before the event is emitted.
    pub fn start(&self) -> VerificationHandle {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(16);

        let registry = self.registry.clone();
        let state = self.state.clone();
        let config = self.config.clone();
        let task = tokio::spawn(async move {
            run_session(session_id, registry, state, config, tx).await;
        });

        VerificationHandle {
            session_id,
            events: ReceiverStream::new(rx),
            task,
        }
    }
}

async fn run_session(
    session_id: Uuid,
    registry: Arc<dyn ProofRegistry>,
    state: Arc<VerificationState>,
    config: PollerConfig,
    tx: mpsc::Sender<VerificationEvent>,
) {
    info!(%session_id, "registering verification session");
    if let Err(err) = registry.register(session_id).await {
        error!(%session_id, %err, "verification session registration failed");
        let _ = tx
            .send(VerificationEvent::Failed {
                reason: err.to_string(),
            })
            .await;
        return;
    }

    let mut ticks = interval(config.poll_interval);
    // discard the immediate tick; the first proof check happens after one
    // full interval
    ticks.tick().await;

    let deadline = sleep(config.timeout);
    tokio::pin!(deadline);

    let mut attempts = 0u32;
    loop {
        tokio::select! {
            _ = &mut deadline => {
                warn!(%session_id, "verification wall-clock timeout");
                let _ = tx.send(VerificationEvent::Failed {
                    reason: Error::VerificationTimeout.to_string(),
                }).await;
                return;
            }
            _ = ticks.tick() => {
                attempts += 1;
                match registry.fetch_proof(session_id).await {
                    Ok(Some(identity)) => {
                        info!(%session_id, nationality = %identity.nationality, "verification succeeded");
                        state.set_verified(Some(identity.clone())).await;
                        let _ = tx.send(VerificationEvent::Verified { identity }).await;
                        return;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        // transient transport/parse failures are retried on
                        // the next tick
                        debug!(%session_id, %err, "proof fetch failed, retrying");
                    }
                }

                if attempts >= config.max_attempts {
                    warn!(%session_id, attempts, "verification attempt budget exhausted");
                    let _ = tx.send(VerificationEvent::Failed {
                        reason: Error::VerificationTimeout.to_string(),
                    }).await;
                    return;
                }

                match tx.try_send(VerificationEvent::Pending {
                    attempts_remaining: config.max_attempts - attempts,
                }) {
                    // the session owner went away; stop polling
                    Err(mpsc::error::TrySendError::Closed(_)) => return,
                    // a slow consumer drops progress events, never outcomes
                    Err(mpsc::error::TrySendError::Full(_)) => {}
                    Ok(()) => {}
                }
            }
        }
    }
}
