//! Remote transport contract and HTTP implementation.

use crate::config::TransportConfig;
use crate::error::VaultError;
use crate::store::RecordMeta;
use crate::types::RecordID;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Encrypted record envelope as delivered by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEnvelope {
    pub id: RecordID,
    /// Base64 of the sealed header
    pub encrypted_header: String,
    pub header_version: u64,
    pub body_version: u64,
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RemoteEnvelope {
    pub fn meta(&self) -> RecordMeta {
        RecordMeta {
            header_version: self.header_version,
            body_version: self.body_version,
            seq: self.seq,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Encrypted body payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBody {
    /// Base64 of the sealed body
    pub encrypted_body: String,
}

/// Remote service the vault fetches envelopes from.
///
/// Implementations map their own failures to `VaultError::TransportFailure`.
#[async_trait]
pub trait RecordTransport: Send + Sync {
    /// Fetch all record envelopes for a scope (e.g. a session)
    async fn fetch_records(&self, scope_id: &str) -> Result<Vec<RemoteEnvelope>, VaultError>;

    /// Fetch the encrypted body for one record
    async fn fetch_body(&self, id: &str) -> Result<RemoteBody, VaultError>;
}

/// JSON-over-HTTP transport
pub struct HttpRecordTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRecordTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, VaultError> {
        let base = config.base_url.as_deref().ok_or_else(|| {
            VaultError::ConfigError("transport.base_url is not configured".to_string())
        })?;
        let base_url = Url::parse(base)
            .map_err(|e| VaultError::ConfigError(format!("Invalid base_url {}: {}", base, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(VaultError::ConfigError(format!(
                "base_url cannot be used as a base: {}",
                base
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, VaultError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| VaultError::ConfigError("base_url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, VaultError> {
        debug!(url = %url, "Requesting remote artifacts");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RecordTransport for HttpRecordTransport {
    async fn fetch_records(&self, scope_id: &str) -> Result<Vec<RemoteEnvelope>, VaultError> {
        let url = self.endpoint(&["scopes", scope_id, "artifacts"])?;
        self.get_json(url).await
    }

    async fn fetch_body(&self, id: &str) -> Result<RemoteBody, VaultError> {
        let url = self.endpoint(&["artifacts", id, "body"])?;
        self.get_json(url).await
    }
}

/// Stand-in used when no remote service is configured; every call fails
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedTransport;

#[async_trait]
impl RecordTransport for DisconnectedTransport {
    async fn fetch_records(&self, _scope_id: &str) -> Result<Vec<RemoteEnvelope>, VaultError> {
        Err(VaultError::TransportFailure(
            "no remote configured (set transport.base_url)".to_string(),
        ))
    }

    async fn fetch_body(&self, _id: &str) -> Result<RemoteBody, VaultError> {
        Err(VaultError::TransportFailure(
            "no remote configured (set transport.base_url)".to_string(),
        ))
    }
}
