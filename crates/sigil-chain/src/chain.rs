//! # Single-Writer Signing Chain
//!
//! All record creation for one signer flows through [`SigningChain::sign`],
//! which serializes appends behind an async lock. The lock guards the chain
//! tip (the entry hash of the most recently signed record), so concurrent
//! callers always observe a total, gap-free `previous_hash` ordering.
//!
//! ## Security Invariant
//!
//! The tip only advances after a signature is produced. If the key
//! provider declines or fails, the tip is untouched and the next caller
//! links to the same predecessor, leaving no hole in the chain.

use std::sync::Arc;

use sigil_core::{ContentDigest, Timestamp};
use sigil_crypto::{KeyProvider, SignerAddress};
use tokio::sync::Mutex;

use crate::envelope::TraceEntry;
use crate::error::ChainError;
use crate::record::{Commitment, SignedRecord};

/// The all-zero digest that the first record of a chain links to.
pub const GENESIS: ContentDigest = ContentDigest::zero();

/// Single-writer chain of signed call records.
pub struct SigningChain {
    provider: Arc<dyn KeyProvider>,
    signer_address: SignerAddress,
    tip: Mutex<ContentDigest>,
}

impl SigningChain {
    /// New chain starting at the genesis sentinel.
    pub fn new(provider: Arc<dyn KeyProvider>) -> Result<Self, ChainError> {
        Self::resume_from(provider, GENESIS)
    }

    /// Chain resuming from a known tip, e.g. the entry hash of the last
    /// record recovered from a store at startup.
    pub fn resume_from(
        provider: Arc<dyn KeyProvider>,
        tip: ContentDigest,
    ) -> Result<Self, ChainError> {
        let signer_address = provider.address()?;
        Ok(Self {
            provider,
            signer_address,
            tip: Mutex::new(tip),
        })
    }

    /// Address all records from this chain are attributed to.
    pub fn signer_address(&self) -> &SignerAddress {
        &self.signer_address
    }

    /// Current chain tip.
    pub async fn tip(&self) -> ContentDigest {
        *self.tip.lock().await
    }

    /// Sign an envelope into the chain.
    ///
    /// Holds the tip lock across hash, sign, and tip advance, so two
    /// concurrent calls can never produce the same `previous_hash`.
    pub async fn sign(&self, entry: TraceEntry) -> Result<SignedRecord, ChainError> {
        let entry_hash = entry.entry_hash()?;
        let created_at = Timestamp::now();

        let mut tip = self.tip.lock().await;
        let previous_hash = *tip;

        let commitment = Commitment {
            entry_hash: &entry_hash,
            previous_hash: &previous_hash,
            timestamp: &created_at,
        };
        let signature = self.provider.sign(&commitment.canonical_bytes()?)?;

        *tip = entry_hash;
        drop(tip);

        Ok(SignedRecord {
            entry,
            entry_hash,
            previous_hash,
            signature,
            signer_address: self.signer_address.clone(),
            created_at,
        })
    }

    /// Verify one record in isolation. See [`SignedRecord::verify`].
    pub fn verify(record: &SignedRecord) -> bool {
        record.verify()
    }

    /// Verify a complete chain of records.
    ///
    /// Each record must verify in isolation, the first record must link
    /// to the genesis sentinel, and each later `previous_hash` must
    /// equal the preceding record's `entry_hash`. A chain with its
    /// prefix removed therefore fails at index 0. Returns the index of
    /// the first break found.
    pub fn verify_chain(records: &[SignedRecord]) -> Result<(), ChainError> {
        for (index, record) in records.iter().enumerate() {
            if !record.verify() {
                return Err(ChainError::IntegrityViolation {
                    index,
                    reason: "record failed content or signature verification".to_string(),
                });
            }
            if index == 0 && !record.previous_hash.is_zero() {
                return Err(ChainError::IntegrityViolation {
                    index,
                    reason: format!(
                        "first record links to {} instead of the genesis sentinel",
                        record.previous_hash.to_hex()
                    ),
                });
            }
            if index > 0 && record.previous_hash != records[index - 1].entry_hash {
                return Err(ChainError::IntegrityViolation {
                    index,
                    reason: format!(
                        "linkage break: previous_hash {} does not match predecessor entry_hash {}",
                        record.previous_hash.to_hex(),
                        records[index - 1].entry_hash.to_hex()
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sigil_crypto::{ApprovalDecision, ApprovalGate, LocalKeyProvider, PromptKeyProvider};

    fn test_chain() -> SigningChain {
        let provider = Arc::new(LocalKeyProvider::from_seed_hex(&"33".repeat(32)).unwrap());
        SigningChain::new(provider).unwrap()
    }

    fn entry(method: &str) -> TraceEntry {
        TraceEntry::success(
            method,
            vec![json!("x")],
            json!("ok"),
            Timestamp::now(),
            1,
            None,
        )
    }

    #[tokio::test]
    async fn first_record_links_to_genesis() {
        let chain = test_chain();
        let record = chain.sign(entry("first")).await.unwrap();
        assert_eq!(record.previous_hash, GENESIS);
        assert!(record.verify());
    }

    #[tokio::test]
    async fn records_link_sequentially() {
        let chain = test_chain();
        let r1 = chain.sign(entry("one")).await.unwrap();
        let r2 = chain.sign(entry("two")).await.unwrap();
        let r3 = chain.sign(entry("three")).await.unwrap();
        assert_eq!(r2.previous_hash, r1.entry_hash);
        assert_eq!(r3.previous_hash, r2.entry_hash);
        assert_eq!(chain.tip().await, r3.entry_hash);
        SigningChain::verify_chain(&[r1, r2, r3]).unwrap();
    }

    #[tokio::test]
    async fn resumed_chain_links_to_given_tip() {
        let provider = Arc::new(LocalKeyProvider::from_seed_hex(&"33".repeat(32)).unwrap());
        let prior_tip = ContentDigest::from_bytes([5u8; 32]);
        let chain = SigningChain::resume_from(provider, prior_tip).unwrap();
        let record = chain.sign(entry("resumed")).await.unwrap();
        assert_eq!(record.previous_hash, prior_tip);
    }

    #[tokio::test]
    async fn declined_signing_leaves_tip_unchanged() {
        struct DeclineOnce(std::sync::atomic::AtomicBool);
        impl ApprovalGate for DeclineOnce {
            fn review(&self, _data: &sigil_core::CanonicalBytes) -> ApprovalDecision {
                if self.0.swap(false, std::sync::atomic::Ordering::SeqCst) {
                    ApprovalDecision::Decline("declined".to_string())
                } else {
                    ApprovalDecision::Approve
                }
            }
        }

        let provider = Arc::new(PromptKeyProvider::new(
            LocalKeyProvider::from_seed_hex(&"44".repeat(32)).unwrap(),
            Box::new(DeclineOnce(std::sync::atomic::AtomicBool::new(true))),
        ));
        let chain = SigningChain::new(provider).unwrap();

        let err = chain.sign(entry("declined")).await.unwrap_err();
        assert!(matches!(err, ChainError::Crypto(e) if e.is_declined()));
        assert_eq!(chain.tip().await, GENESIS);

        // The next call signs and links straight to genesis, no gap.
        let record = chain.sign(entry("accepted")).await.unwrap();
        assert_eq!(record.previous_hash, GENESIS);
    }

    #[tokio::test]
    async fn concurrent_signing_yields_a_linear_chain() {
        let chain = Arc::new(test_chain());
        let mut handles = Vec::new();
        for i in 0..16 {
            let chain = Arc::clone(&chain);
            handles.push(tokio::spawn(async move {
                chain.sign(entry(&format!("call-{i}"))).await.unwrap()
            }));
        }
        let mut records = Vec::new();
        for handle in handles {
            records.push(handle.await.unwrap());
        }

        // Regardless of completion order, the previous_hash set must form
        // one path from genesis through every record.
        use std::collections::HashSet;
        let prev: HashSet<_> = records.iter().map(|r| r.previous_hash).collect();
        let hashes: HashSet<_> = records.iter().map(|r| r.entry_hash).collect();
        assert_eq!(prev.len(), records.len(), "previous_hash values must be unique");
        assert!(prev.contains(&GENESIS));
        // Every non-genesis predecessor is some record's entry hash.
        assert!(prev
            .iter()
            .filter(|p| !p.is_zero())
            .all(|p| hashes.contains(p)));
    }

    #[tokio::test]
    async fn verify_chain_detects_tampered_record() {
        let chain = test_chain();
        let r1 = chain.sign(entry("one")).await.unwrap();
        let mut r2 = chain.sign(entry("two")).await.unwrap();
        r2.entry.args = vec![json!("tampered")];
        let err = SigningChain::verify_chain(&[r1, r2]).unwrap_err();
        assert!(matches!(
            err,
            ChainError::IntegrityViolation { index: 1, .. }
        ));
    }

    #[tokio::test]
    async fn verify_chain_detects_linkage_break() {
        let chain = test_chain();
        let r1 = chain.sign(entry("one")).await.unwrap();
        let _skipped = chain.sign(entry("two")).await.unwrap();
        let r3 = chain.sign(entry("three")).await.unwrap();
        let err = SigningChain::verify_chain(&[r1, r3]).unwrap_err();
        assert!(matches!(
            err,
            ChainError::IntegrityViolation { index: 1, .. }
        ));
    }

    #[tokio::test]
    async fn verify_chain_rejects_truncated_prefix() {
        let chain = test_chain();
        let _r1 = chain.sign(entry("one")).await.unwrap();
        let r2 = chain.sign(entry("two")).await.unwrap();
        let r3 = chain.sign(entry("three")).await.unwrap();
        // Dropping the first record must not yield a verifiable chain.
        let err = SigningChain::verify_chain(&[r2, r3]).unwrap_err();
        assert!(matches!(
            err,
            ChainError::IntegrityViolation { index: 0, .. }
        ));
    }

    #[tokio::test]
    async fn verify_chain_rejects_non_genesis_start() {
        let provider = Arc::new(LocalKeyProvider::from_seed_hex(&"33".repeat(32)).unwrap());
        let forged_tip = ContentDigest::from_bytes([0xaa; 32]);
        let chain = SigningChain::resume_from(provider, forged_tip).unwrap();
        let record = chain.sign(entry("forged")).await.unwrap();

        assert!(record.verify());
        let err = SigningChain::verify_chain(&[record]).unwrap_err();
        assert!(matches!(
            err,
            ChainError::IntegrityViolation { index: 0, .. }
        ));
    }
}
