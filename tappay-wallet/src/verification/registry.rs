//! Verification registry client
//!
//! The remote registry holds verification sessions and issues
//! proof-of-verification payloads once the owner completes the external
//! verification flow.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Duration;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::verification::VerifiedIdentity;

/// Remote registry holding verification sessions and proofs
#[async_trait]
pub trait ProofRegistry: Send + Sync {
    /// Register a fresh verification session. Failure is terminal for the
    /// session.
    async fn register(&self, session_id: Uuid) -> Result<()>;

    /// Fetch proof-of-verification for the session.
    ///
    /// `Ok(None)` means "not verified yet". Transport errors surface as
    /// `Err` but callers treat them as non-terminal.
    async fn fetch_proof(&self, session_id: Uuid) -> Result<Option<VerifiedIdentity>>;
}

/// Proof payload shape returned by the registry
#[derive(Debug, Deserialize)]
struct ProofResponse {
    status: String,
    nationality: Option<String>,
    passport_number: Option<String>,
}

/// Registry client configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("TAPPAY_REGISTRY_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP implementation of the proof registry
pub struct HttpRegistry {
    client: reqwest::Client,
    config: RegistryConfig,
}

impl HttpRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| Error::Network(error.to_string()))?;
        Ok(Self { client, config })
    }

    fn user_url(&self, session_id: Uuid) -> String {
        format!(
            "{}/user/{}",
            self.config.base_url.trim_end_matches('/'),
            session_id
        )
    }
}

#[async_trait]
impl ProofRegistry for HttpRegistry {
    async fn register(&self, session_id: Uuid) -> Result<()> {
        let response = self
            .client
            .post(self.user_url(session_id))
            .send()
            .await
            .map_err(|error| Error::RegistrationFailed(error.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::RegistrationFailed(format!(
                "registry returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn fetch_proof(&self, session_id: Uuid) -> Result<Option<VerifiedIdentity>> {
        let url = format!("{}/proof", self.user_url(session_id));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|error| Error::Network(error.to_string()))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        // malformed bodies count as "not verified yet"
        let payload: ProofResponse = match response.json().await {
            Ok(payload) => payload,
            Err(_) => return Ok(None),
        };

        if payload.status != "success" {
            return Ok(None);
        }
        match (payload.nationality, payload.passport_number) {
            (Some(nationality), Some(document_number)) => Ok(Some(VerifiedIdentity {
                nationality,
                document_number,
            })),
            _ => Ok(None),
        }
    }
}
