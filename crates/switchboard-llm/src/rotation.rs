//! Upstream credential selection
//!
//! Spreads requests over a model's enabled keys using a cursor held in the
//! shared counter store, and counts failures per key so operators can be
//! alerted. Store failures only affect fairness and alerting; they never
//! fail the request that triggered them.

use std::{fmt::Write as _, sync::Arc, time::Duration};

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::{Digest, Sha256};
use switchboard_data::ApiKeyConfig;
use switchboard_store::{CounterStore, StoreError};
use switchboard_telemetry::{Counter, KeyValue, metrics};

use crate::LlmError;

const CURSOR_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const FAILURE_TTL: Duration = Duration::from_secs(60 * 60);

/// Whether a model has a persisted cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStatus {
    Active,
    NotInitialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RotationStats {
    pub current_index: i64,
    pub status: RotationStatus,
}

/// Chooses credentials and tracks their failures
#[derive(Clone)]
pub struct KeyRotationService {
    store: Arc<dyn CounterStore>,
    alert_threshold: i64,
    alerts: Counter<u64>,
}

impl KeyRotationService {
    pub fn new(store: Arc<dyn CounterStore>, alert_threshold: i64) -> Self {
        let alerts = metrics::meter()
            .u64_counter(metrics::KEY_FAILURE_ALERTS)
            .with_description("Keys that reached the failure alert threshold")
            .build();

        Self {
            store,
            alert_threshold,
            alerts,
        }
    }

    /// Pick the key to use for the next request to `model_id`
    ///
    /// A single enabled key is returned without any store traffic.
    /// Otherwise the stored cursor selects the key and is advanced. Two
    /// concurrent callers may read the same cursor and pick the same key.
    pub async fn get_next_api_key(&self, model_id: &str, keys: &[ApiKeyConfig]) -> Result<SecretString, LlmError> {
        let enabled: Vec<&SecretString> = keys
            .iter()
            .filter(|k| k.status == switchboard_data::Status::Enabled)
            .map(|k| &k.key)
            .collect();

        match enabled.as_slice() {
            [] => Err(LlmError::NoEnabledKeys {
                model_id: model_id.to_owned(),
            }),
            [only] => Ok((*only).clone()),
            candidates => {
                let len = i64::try_from(candidates.len()).unwrap_or(i64::MAX);
                let cursor_key = cursor_key(model_id);

                let cursor = match self.store.get(&cursor_key).await {
                    Ok(value) => value.unwrap_or(0),
                    Err(e) => {
                        tracing::warn!(model_id, error = %e, "failed to read rotation cursor, starting at 0");
                        0
                    }
                };

                let index = cursor.rem_euclid(len);
                let next = (index + 1) % len;

                if let Err(e) = self.store.set_with_expiry(&cursor_key, next, CURSOR_TTL).await {
                    tracing::warn!(model_id, error = %e, "failed to advance rotation cursor");
                }

                tracing::debug!(model_id, index, candidates = len, "selected rotating key");

                // index is in 0..len, which came from a usize
                let selected = usize::try_from(index).unwrap_or_default();
                Ok(candidates[selected].clone())
            }
        }
    }

    /// Count one failure against a key and return the new count
    ///
    /// Reaching the alert threshold is logged and counted. The key is
    /// never disabled here; that is an administrative decision.
    pub async fn mark_key_as_failed(&self, model_id: &str, key: &SecretString) -> Result<i64, StoreError> {
        let fingerprint = fingerprint(key);
        let count = self
            .store
            .increment(&failure_key(model_id, &fingerprint), FAILURE_TTL)
            .await?;

        if count >= self.alert_threshold {
            tracing::error!(
                model_id,
                key = %fingerprint,
                failures = count,
                "API key failed too many times, check its configuration"
            );
            self.alerts.add(
                1,
                &[KeyValue::new("model_id", model_id.to_owned())],
            );
        }

        Ok(count)
    }

    /// Forget the cursor, used after a model's key list changes
    pub async fn reset_rotation(&self, model_id: &str) -> Result<(), StoreError> {
        self.store.delete(&cursor_key(model_id)).await
    }

    pub async fn get_rotation_stats(&self, model_id: &str) -> Result<RotationStats, StoreError> {
        let stats = match self.store.get(&cursor_key(model_id)).await? {
            Some(current_index) => RotationStats {
                current_index,
                status: RotationStatus::Active,
            },
            None => RotationStats {
                current_index: 0,
                status: RotationStatus::NotInitialized,
            },
        };

        Ok(stats)
    }

    /// Failures recorded for a key within the last hour
    pub async fn get_key_failure_count(&self, model_id: &str, key: &SecretString) -> Result<i64, StoreError> {
        let count = self.store.get(&failure_key(model_id, &fingerprint(key))).await?;
        Ok(count.unwrap_or(0))
    }
}

impl std::fmt::Debug for KeyRotationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRotationService")
            .field("alert_threshold", &self.alert_threshold)
            .finish_non_exhaustive()
    }
}

fn cursor_key(model_id: &str) -> String {
    format!("llm:key_rotation:{model_id}")
}

fn failure_key(model_id: &str, fingerprint: &str) -> String {
    format!("llm:key_failed:{model_id}:{fingerprint}")
}

/// First 16 hex characters of the key's SHA-256 digest
fn fingerprint(key: &SecretString) -> String {
    let digest = Sha256::digest(key.expose_secret().as_bytes());
    let mut hex = String::with_capacity(16);
    for byte in &digest[..8] {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
