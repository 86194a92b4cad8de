//! # Witness End-to-End Integration Tests
//!
//! Full pipeline over a stateful target with the mock ledger:
//!
//! 1. Calls pass through transparently while records accumulate
//! 2. Records chain: first links to genesis, each next to its predecessor
//! 3. Sensitive values are scrubbed from records but not from returns
//! 4. Target errors are captured, then re-raised to the caller
//! 5. The whole stored chain verifies, and tampering is detected

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use sigil_anchor::{ChainRegistry, MockLedgerTarget};
use sigil_chain::{AnchorState, SigningChain};
use sigil_core::NetworkId;
use sigil_witness::{
    ConsistencyMode, Credential, Interceptable, RuntimeConfig, TargetError, Witness, WitnessError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A bank-teller-ish target with internal state, so successive calls
/// observe each other.
#[derive(Default)]
struct LedgerClerk {
    lookups: AtomicU64,
}

#[async_trait]
impl Interceptable for LedgerClerk {
    fn methods(&self) -> Vec<String> {
        vec![
            "greet".to_string(),
            "lookup_account".to_string(),
            "fail".to_string(),
        ]
    }

    async fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, TargetError> {
        match method {
            "greet" => Ok(json!(format!(
                "Hello, {}!",
                args.first().and_then(Value::as_str).unwrap_or("stranger")
            ))),
            "lookup_account" => {
                let n = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(json!({ "owner": args[0], "lookup_number": n }))
            }
            "fail" => Err(TargetError::new("AccountNotFound", "no such account")
                .with_stack("at LedgerClerk.fail")),
            other => Err(TargetError::new("MethodNotFound", other)),
        }
    }
}

async fn sync_witness() -> Witness<LedgerClerk> {
    let config = RuntimeConfig {
        consistency_mode: ConsistencyMode::Sync,
        ..RuntimeConfig::new(
            NetworkId::new("ethereum").unwrap(),
            Credential::SeedHex("42".repeat(32)),
        )
    };
    Witness::wrap_with_ledger(
        LedgerClerk::default(),
        config,
        Arc::new(MockLedgerTarget::local()),
        ChainRegistry::with_defaults(),
    )
    .await
    .unwrap()
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn calls_pass_through_and_records_chain() {
    let witness = sync_witness().await;

    let first = witness.call("greet", vec![json!("Ada")]).await.unwrap();
    assert_eq!(first, json!("Hello, Ada!"));

    let second = witness
        .call("lookup_account", vec![json!("Ada")])
        .await
        .unwrap();
    assert_eq!(second["lookup_number"], json!(1));

    let records = witness.records().await.unwrap();
    assert_eq!(records.len(), 2);

    // First record links to genesis, second to the first.
    assert!(records[0].record.previous_hash.is_zero());
    assert_eq!(
        records[1].record.previous_hash,
        records[0].record.entry_hash
    );

    // Single writer: both records carry the same signer.
    assert_eq!(
        records[0].record.signer_address,
        records[1].record.signer_address
    );

    // Sync mode confirmed both before the calls returned.
    for stored in &records {
        assert_eq!(stored.status.state, AnchorState::Confirmed);
        assert!(stored.status.transaction_hash.is_some());
        assert!(stored.record.verify());
    }

    witness.verify_chain().await.unwrap();
}

#[tokio::test]
async fn sensitive_values_are_scrubbed_from_records_only() {
    let witness = sync_witness().await;

    let result = witness
        .call(
            "lookup_account",
            vec![json!({
                "name": "Ada",
                "ssn": "123-45-6789",
                "email": "ada@example.com",
            })],
        )
        .await
        .unwrap();

    // The caller gets the real values back.
    assert_eq!(result["owner"]["ssn"], json!("123-45-6789"));
    assert_eq!(result["owner"]["email"], json!("ada@example.com"));

    // The record does not contain them anywhere.
    let records = witness.records().await.unwrap();
    let entry_json = serde_json::to_string(&records[0].record.entry).unwrap();
    assert!(!entry_json.contains("123-45-6789"));
    assert!(!entry_json.contains("ada@example.com"));
    assert!(entry_json.contains("[REDACTED]"));
}

#[tokio::test]
async fn target_errors_are_captured_then_reraised() {
    let witness = sync_witness().await;

    let err = witness.call("fail", vec![json!("acct-1")]).await.unwrap_err();
    let info = match &err {
        WitnessError::Target(info) => info,
        other => panic!("expected target error, got {other:?}"),
    };
    assert_eq!(info.name, "AccountNotFound");
    assert_eq!(info.message, "no such account");

    // The failed call is a first-class chain entry with the error
    // captured and no result; later calls keep chaining past it.
    witness.call("greet", vec![json!("Ada")]).await.unwrap();

    let records = witness.records().await.unwrap();
    assert_eq!(records.len(), 2);
    let failed_entry = &records[0].record.entry;
    assert!(failed_entry.result.is_none());
    assert_eq!(
        failed_entry.error.as_ref().unwrap().name,
        "AccountNotFound"
    );
    assert_eq!(
        records[1].record.previous_hash,
        records[0].record.entry_hash
    );
    witness.verify_chain().await.unwrap();
}

#[tokio::test]
async fn entries_record_method_timing_and_id() {
    let witness = sync_witness().await;
    witness.call("greet", vec![json!("Ada")]).await.unwrap();

    let records = witness.records().await.unwrap();
    let entry = &records[0].record.entry;
    assert_eq!(entry.method, "greet");
    assert_eq!(entry.args, vec![json!("Ada")]);
    assert!(entry.parent_id.is_none());
    // A top-level call has an id either way; the mock target is fast,
    // so only sanity-check the duration.
    assert!(entry.duration_ms < 5_000);
}

// ---------------------------------------------------------------------------
// Tamper evidence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tampered_record_breaks_verification() {
    let witness = sync_witness().await;
    witness.call("greet", vec![json!("Ada")]).await.unwrap();
    witness.call("greet", vec![json!("Grace")]).await.unwrap();

    let records: Vec<_> = witness
        .records()
        .await
        .unwrap()
        .into_iter()
        .map(|stored| stored.record)
        .collect();
    SigningChain::verify_chain(&records).unwrap();

    // Rewriting history invalidates the record's own hash.
    let mut forged = records.clone();
    forged[0].entry.args = vec![json!("Mallory")];
    let err = SigningChain::verify_chain(&forged).unwrap_err();
    assert!(err.is_integrity_violation());

    // Dropping the genesis-linked record leaves a chain that no longer
    // starts at the sentinel, so the truncation is detectable.
    let truncated = vec![records[1].clone()];
    assert!(SigningChain::verify_chain(&truncated).is_err());
    let mut reordered = records.clone();
    reordered.swap(0, 1);
    assert!(SigningChain::verify_chain(&reordered).is_err());
}

// ---------------------------------------------------------------------------
// Operational surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_and_explorer_url_after_confirmation() {
    let witness = sync_witness().await;
    witness.call("greet", vec![json!("Ada")]).await.unwrap();

    let stats = witness.storage_stats().await.unwrap();
    assert_eq!(stats.total_records, 1);
    assert_eq!(stats.confirmed_records, 1);
    assert_eq!(stats.pending_records, 0);
    assert!(stats.storage_bytes > 0);

    let hash = witness.records().await.unwrap()[0].record.entry_hash;
    let url = witness.explorer_url(&hash).await.unwrap().unwrap();
    assert!(url.starts_with("https://etherscan.io/tx/"));
}

#[tokio::test]
async fn unknown_method_is_rejected_without_invocation() {
    let witness = sync_witness().await;
    let err = witness.call("transfer_funds", vec![]).await.unwrap_err();
    assert!(matches!(err, WitnessError::UnknownMethod(_)));
    assert!(witness.records().await.unwrap().is_empty());
}
