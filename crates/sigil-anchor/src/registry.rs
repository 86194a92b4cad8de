//! Network registry: which ledgers exist and how to reach them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sigil_core::NetworkId;

use crate::error::AnchorError;

/// Connection profile for one ledger network.
///
/// Read-only after registration. The explorer template contains a
/// `{tx}` placeholder substituted with the transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub network: NetworkId,
    /// JSON-RPC endpoint. HTTPS outside of local development.
    pub rpc_url: String,
    /// Address of the on-ledger anchor program.
    pub ledger_address: String,
    /// Funded sender address whose transactions the RPC provider signs.
    /// Absent for profiles only used with the mock target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter_address: Option<String>,
    /// Block explorer URL template with a `{tx}` placeholder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_template: Option<String>,
}

impl NetworkProfile {
    /// Explorer URL for a transaction on this network, if a template is
    /// configured.
    pub fn explorer_url(&self, transaction_hash: &str) -> Option<String> {
        self.explorer_template
            .as_ref()
            .map(|template| template.replace("{tx}", transaction_hash))
    }
}

/// Registry of known ledger networks.
///
/// Populated at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    profiles: HashMap<NetworkId, NetworkProfile>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the well-known public networks.
    ///
    /// RPC endpoints are placeholders; production deployments register
    /// their own profiles with provider URLs.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults = [
            (
                "ethereum",
                "https://eth.llamarpc.com",
                "https://etherscan.io/tx/{tx}",
            ),
            (
                "arbitrum",
                "https://arb1.arbitrum.io/rpc",
                "https://arbiscan.io/tx/{tx}",
            ),
            (
                "base",
                "https://mainnet.base.org",
                "https://basescan.org/tx/{tx}",
            ),
            (
                "polygon",
                "https://polygon-rpc.com",
                "https://polygonscan.com/tx/{tx}",
            ),
        ];
        for (name, rpc, explorer) in defaults {
            // Names are static lowercase identifiers, always valid.
            let network = NetworkId::new(name).expect("default network id must be valid");
            registry.register(NetworkProfile {
                network: network.clone(),
                rpc_url: rpc.to_string(),
                ledger_address: "0x0000000000000000000000000000000000000000".to_string(),
                submitter_address: None,
                explorer_template: Some(explorer.to_string()),
            });
        }
        registry
    }

    /// Register or replace a network profile.
    pub fn register(&mut self, profile: NetworkProfile) {
        self.profiles.insert(profile.network.clone(), profile);
    }

    /// Look up a profile, failing on unknown networks.
    pub fn get(&self, network: &NetworkId) -> Result<&NetworkProfile, AnchorError> {
        self.profiles
            .get(network)
            .ok_or_else(|| AnchorError::UnknownNetwork(network.as_str().to_string()))
    }

    /// Explorer URL for a transaction on a network, if known.
    pub fn explorer_url(&self, network: &NetworkId, transaction_hash: &str) -> Option<String> {
        self.profiles
            .get(network)
            .and_then(|profile| profile.explorer_url(transaction_hash))
    }

    pub fn networks(&self) -> impl Iterator<Item = &NetworkId> {
        self.profiles.keys()
    }
}
