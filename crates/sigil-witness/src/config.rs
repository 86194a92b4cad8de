//! Runtime configuration for the witness.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sigil_anchor::FeeStrategy;
use sigil_core::NetworkId;
use sigil_crypto::{EnvKeyProvider, KeyProvider, LocalKeyProvider};
use sigil_redact::RedactionConfig;

use crate::callbacks::Callbacks;
use crate::error::WitnessError;

/// How anchoring relates to the intercepted call.
///
/// Closed set; there is no user-pluggable strategy seam. Every mode
/// shares the same capture/redact/sign/store pipeline and differs only
/// in when the anchor happens and how failures surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyMode {
    /// Block the call until the anchor confirms; a non-confirmed
    /// outcome is an error on the call itself. The default.
    #[default]
    Sync,
    /// Return immediately; anchor in the background. Failures surface
    /// only through the `on_anchor_failed` callback.
    Async,
    /// Buffer records and anchor them in batches, flushed manually, by
    /// batch size, or on an interval.
    Cache,
    /// Submit in the background and expose progress through status
    /// queries and callbacks.
    TwoPhase,
}

/// Where the witness's signing key comes from.
#[derive(Clone)]
pub enum Credential {
    /// Hex-encoded 32-byte Ed25519 seed supplied directly.
    SeedHex(String),
    /// Seed read from an environment variable at wrap time.
    Env(String),
    /// Fresh random key; records from this witness cannot be attributed
    /// across restarts. Development only.
    Ephemeral,
    /// A pre-built provider, e.g. one gated behind interactive approval.
    Provider(Arc<dyn KeyProvider>),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Never print seed material.
            Self::SeedHex(_) => write!(f, "Credential::SeedHex(..)"),
            Self::Env(var) => write!(f, "Credential::Env({var})"),
            Self::Ephemeral => write!(f, "Credential::Ephemeral"),
            Self::Provider(p) => write!(f, "Credential::Provider({})", p.provider_name()),
        }
    }
}

impl Credential {
    /// Build the key provider this credential describes.
    pub fn build_provider(&self) -> Result<Arc<dyn KeyProvider>, WitnessError> {
        match self {
            Self::SeedHex(seed) => Ok(Arc::new(LocalKeyProvider::from_seed_hex(seed)?)),
            Self::Env(var) => Ok(Arc::new(EnvKeyProvider::from_env(var)?)),
            Self::Ephemeral => Ok(Arc::new(LocalKeyProvider::generate())),
            Self::Provider(provider) => Ok(Arc::clone(provider)),
        }
    }
}

/// Top-level witness configuration.
///
/// Validated once at wrap time; invalid configuration means no witness
/// is constructed at all.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub consistency_mode: ConsistencyMode,
    /// Network the anchors land on; must exist in the registry.
    pub network: NetworkId,
    pub credential: Credential,
    pub fee_strategy: FeeStrategy,
    pub redaction: RedactionConfig,
    pub callbacks: Callbacks,
    /// Submission attempts per anchor or explicit retry.
    pub max_retries: u32,
    /// First backoff delay, doubling per failure.
    pub base_delay: Duration,
    /// Cache mode: flush automatically at this interval.
    pub cache_flush_interval: Option<Duration>,
    /// Cache mode: flush when this many records are buffered.
    pub cache_batch_size: usize,
    /// Soft limit on locally cached records.
    pub local_cache_limit: usize,
    /// Fraction of the limit at which the capacity warning fires.
    pub capacity_warning_threshold: f64,
}

impl RuntimeConfig {
    /// Configuration with defaults for the given network and credential.
    pub fn new(network: NetworkId, credential: Credential) -> Self {
        Self {
            consistency_mode: ConsistencyMode::default(),
            network,
            credential,
            fee_strategy: FeeStrategy::default(),
            redaction: RedactionConfig::default(),
            callbacks: Callbacks::default(),
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            cache_flush_interval: None,
            cache_batch_size: 10,
            local_cache_limit: sigil_chain::store::DEFAULT_CACHE_LIMIT,
            capacity_warning_threshold: sigil_chain::store::DEFAULT_WARNING_THRESHOLD,
        }
    }

    /// Validate invariants that would otherwise fail deep inside the
    /// pipeline.
    pub fn validate(&self) -> Result<(), WitnessError> {
        if self.max_retries == 0 {
            return Err(WitnessError::Config(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.cache_batch_size == 0 {
            return Err(WitnessError::Config(
                "cache_batch_size must be at least 1".to_string(),
            ));
        }
        if self.local_cache_limit == 0 {
            return Err(WitnessError::Config(
                "local_cache_limit must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.capacity_warning_threshold)
            || self.capacity_warning_threshold == 0.0
        {
            return Err(WitnessError::Config(format!(
                "capacity_warning_threshold must be in (0, 1], got {}",
                self.capacity_warning_threshold
            )));
        }
        if let Some(interval) = self.cache_flush_interval {
            if interval.is_zero() {
                return Err(WitnessError::Config(
                    "cache_flush_interval must be non-zero".to_string(),
                ));
            }
            if self.consistency_mode != ConsistencyMode::Cache {
                return Err(WitnessError::Config(
                    "cache_flush_interval only applies to cache mode".to_string(),
                ));
            }
        }
        Ok(())
    }
}
