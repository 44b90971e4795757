//! Identity verification state and polling protocol

pub mod poller;
pub mod registry;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

/// The verification result held for a verified wallet owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub nationality: String,
    #[serde(rename = "passport_number")]
    pub document_number: String,
}

/// Process-wide record of whether the wallet owner is identity-verified.
///
/// Pure state holder; set exactly once per successful verification and
/// cleared explicitly ("forget passport"). Read by the settlement engine's
/// gating check and by list views marking gated sources as disabled.
#[derive(Debug, Default)]
pub struct VerificationState {
    identity: RwLock<Option<VerifiedIdentity>>,
}

impl VerificationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_verified(&self) -> bool {
        self.identity.read().await.is_some()
    }

    /// Snapshot of the verified identity, if any
    pub async fn identity(&self) -> Option<VerifiedIdentity> {
        self.identity.read().await.clone()
    }

    /// Record a verification result; `None` clears it
    pub async fn set_verified(&self, identity: Option<VerifiedIdentity>) {
        if let Some(identity) = &identity {
            info!(nationality = %identity.nationality, "wallet owner verified");
        }
        *self.identity.write().await = identity;
    }

    /// Forget the verified identity, re-gating restricted funding sources
    pub async fn forget(&self) {
        info!("verified identity forgotten");
        *self.identity.write().await = None;
    }
}
