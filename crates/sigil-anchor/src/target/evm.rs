//! # EVM JSON-RPC Ledger Target
//!
//! Anchors record commitments on EVM-compatible chains (Ethereum,
//! Arbitrum, Base, Polygon) by calling an anchor contract's
//! `recordAnchor(bytes32,bytes32,bytes32)` function via JSON-RPC.
//!
//! ## How It Works
//!
//! 1. `eth_gasPrice` quotes the suggested fee; the service shapes it
//!    with the configured fee strategy before each attempt.
//! 2. `eth_sendTransaction` submits the calldata. The RPC endpoint
//!    (wallet service, KMS-backed node, or unlocked dev account) signs
//!    the transaction; this target never holds ledger keys.
//! 3. `eth_getTransactionReceipt` plus `eth_blockNumber` drive
//!    confirmation polling.
//!
//! The contract takes three static 32-byte words: the record commitment
//! and SHA-256 digests of the payload pointer and parent pointer (zero
//! word when there is no parent). Keeping the pointer arguments as
//! fixed-width digests avoids dynamic ABI encoding and keeps calldata
//! size constant.
//!
//! ## Rejection Classification
//!
//! EIP-1193 wallets refuse with code 4001 (`userRejectedRequest`).
//! Those errors surface as [`AnchorError::Rejected`] and are never
//! retried. Everything else network-shaped is transient.

use sha2::{Digest, Sha256};
use sigil_core::NetworkId;

use super::{AnchorRequest, ConfirmationStatus, LedgerTarget, SubmitReceipt};
use crate::error::AnchorError;
use async_trait::async_trait;

/// 4-byte function selector for `recordAnchor(bytes32,bytes32,bytes32)`.
const RECORD_ANCHOR_SELECTOR: &str = "9f0c5e4d";

/// EIP-1193 error code for a user-rejected request.
const USER_REJECTED_REQUEST: i64 = 4001;

/// Configuration for the EVM JSON-RPC ledger target.
#[derive(Debug, Clone)]
pub struct EvmLedgerConfig {
    /// JSON-RPC endpoint URL (HTTPS outside local development).
    pub rpc_url: String,
    /// Anchor contract address (0x-prefixed, 40 hex chars).
    pub contract_address: String,
    /// Sender address whose transactions the RPC provider signs.
    pub from_address: String,
    /// Network identifier, matching the registry profile.
    pub network: NetworkId,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl EvmLedgerConfig {
    pub fn new(
        rpc_url: impl Into<String>,
        contract_address: impl Into<String>,
        from_address: impl Into<String>,
        network: NetworkId,
    ) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_address: contract_address.into(),
            from_address: from_address.into(),
            network,
            timeout_secs: 30,
        }
    }
}

/// Ledger target speaking EVM JSON-RPC.
#[derive(Debug)]
pub struct EvmLedgerTarget {
    client: reqwest::Client,
    config: EvmLedgerConfig,
}

impl EvmLedgerTarget {
    pub fn new(config: EvmLedgerConfig) -> Result<Self, AnchorError> {
        if !is_valid_eth_address(&config.contract_address) {
            return Err(AnchorError::InvalidConfig(format!(
                "invalid contract address: {}",
                config.contract_address
            )));
        }
        if !is_valid_eth_address(&config.from_address) {
            return Err(AnchorError::InvalidConfig(format!(
                "invalid from address: {}",
                config.from_address
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AnchorError::InvalidConfig(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    /// Send a JSON-RPC request and return the `result` field.
    async fn rpc_call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, AnchorError> {
        let network = self.config.network.as_str().to_string();
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self
            .client
            .post(&self.config.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnchorError::Unavailable {
                network: network.clone(),
                reason: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        if !resp.status().is_success() {
            return Err(AnchorError::Unavailable {
                network,
                reason: format!("HTTP {}", resp.status()),
            });
        }

        let json: serde_json::Value =
            resp.json().await.map_err(|e| AnchorError::Unavailable {
                network: network.clone(),
                reason: format!("invalid JSON response: {e}"),
            })?;

        if let Some(error) = json.get("error") {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error")
                .to_string();
            if code == USER_REJECTED_REQUEST || message.to_lowercase().contains("denied") {
                return Err(AnchorError::Rejected(message));
            }
            return Err(AnchorError::TransactionFailed {
                network,
                reason: message,
            });
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| AnchorError::Unavailable {
                network,
                reason: "JSON-RPC response missing 'result' field".to_string(),
            })
    }

    /// Encode `recordAnchor` calldata: selector plus three 32-byte words.
    fn encode_calldata(request: &AnchorRequest) -> String {
        let pointer_word = sha256_word(request.pointer.as_bytes());
        let parent_word = request
            .parent_pointer
            .as_deref()
            .map(|p| sha256_word(p.as_bytes()))
            .unwrap_or_else(|| "0".repeat(64));
        format!(
            "0x{RECORD_ANCHOR_SELECTOR}{}{}{}",
            request.commitment.to_hex(),
            pointer_word,
            parent_word
        )
    }
}

fn sha256_word(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Validates a 0x-prefixed 20-byte hex address.
fn is_valid_eth_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_hex_u64(value: &serde_json::Value) -> Option<u64> {
    value
        .as_str()
        .and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok())
}

fn parse_hex_u128(value: &serde_json::Value) -> Option<u128> {
    value
        .as_str()
        .and_then(|s| u128::from_str_radix(s.trim_start_matches("0x"), 16).ok())
}

#[async_trait]
impl LedgerTarget for EvmLedgerTarget {
    async fn suggest_fee(&self) -> Result<u128, AnchorError> {
        let result = self.rpc_call("eth_gasPrice", serde_json::json!([])).await?;
        parse_hex_u128(&result).ok_or_else(|| AnchorError::Unavailable {
            network: self.config.network.as_str().to_string(),
            reason: "eth_gasPrice returned a non-hex result".to_string(),
        })
    }

    async fn submit(&self, request: &AnchorRequest) -> Result<SubmitReceipt, AnchorError> {
        let tx = serde_json::json!({
            "from": self.config.from_address,
            "to": self.config.contract_address,
            "gasPrice": format!("0x{:x}", request.fee),
            "data": Self::encode_calldata(request),
        });

        let result = self
            .rpc_call("eth_sendTransaction", serde_json::json!([tx]))
            .await?;

        result
            .as_str()
            .map(|s| SubmitReceipt {
                transaction_hash: s.to_string(),
            })
            .ok_or_else(|| AnchorError::TransactionFailed {
                network: self.config.network.as_str().to_string(),
                reason: "eth_sendTransaction returned non-string result".to_string(),
            })
    }

    async fn confirmation(
        &self,
        transaction_hash: &str,
    ) -> Result<ConfirmationStatus, AnchorError> {
        let receipt = self
            .rpc_call(
                "eth_getTransactionReceipt",
                serde_json::json!([transaction_hash]),
            )
            .await?;

        // Null receipt means the transaction is still in flight.
        if receipt.is_null() {
            return Ok(ConfirmationStatus::Pending);
        }

        let status = receipt
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("0x0");
        if status == "0x0" {
            return Ok(ConfirmationStatus::Failed(
                "transaction reverted".to_string(),
            ));
        }

        let block_number = receipt
            .get("blockNumber")
            .and_then(parse_hex_u64)
            .unwrap_or(0);
        Ok(ConfirmationStatus::Confirmed { block_number })
    }

    fn network(&self) -> &NetworkId {
        &self.config.network
    }
}
