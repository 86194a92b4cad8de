//! Signed, chain-linked call records.

use serde::{Deserialize, Serialize};
use sigil_core::{sha256_digest, CanonicalBytes, ContentDigest, Timestamp};
use sigil_crypto::{verify_with_address, Ed25519Signature, SignerAddress};

use crate::envelope::TraceEntry;
use crate::error::ChainError;

/// The signed commitment: what the Ed25519 signature actually covers.
///
/// Binding `previous_hash` into the signed material is what makes the
/// chain tamper-evident. Signing only the entry hash would let an
/// attacker re-link records without detection.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Commitment<'a> {
    pub entry_hash: &'a ContentDigest,
    pub previous_hash: &'a ContentDigest,
    pub timestamp: &'a Timestamp,
}

impl Commitment<'_> {
    /// Canonical bytes of the commitment, the sole signable input.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, ChainError> {
        Ok(CanonicalBytes::new(self)?)
    }

    /// Content digest of the commitment.
    pub fn digest(&self) -> Result<ContentDigest, ChainError> {
        Ok(sha256_digest(&self.canonical_bytes()?))
    }
}

/// A capture envelope bound into the hash chain.
///
/// Immutable once created. `entry_hash` is the digest of `entry`;
/// `previous_hash` links to the preceding record (all-zero for the first
/// record of a chain); `signature` is Ed25519 over the commitment of
/// `entry_hash`, `previous_hash`, and `created_at`; `signer_address` is
/// the hex-encoded verifying key the signature is attributed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedRecord {
    pub entry: TraceEntry,
    pub entry_hash: ContentDigest,
    pub previous_hash: ContentDigest,
    pub signature: Ed25519Signature,
    pub signer_address: SignerAddress,
    pub created_at: Timestamp,
}

impl SignedRecord {
    /// Verify this record in isolation.
    ///
    /// Checks that `entry_hash` matches the entry's content and that
    /// `signature` verifies over the commitment under `signer_address`.
    /// Any mutation of the entry, the linkage fields, the timestamp, or
    /// the address makes this return false. A record that cannot even be
    /// canonicalized is treated as failing verification.
    pub fn verify(&self) -> bool {
        let recomputed = match self.entry.entry_hash() {
            Ok(digest) => digest,
            Err(_) => return false,
        };
        if recomputed != self.entry_hash {
            return false;
        }

        let commitment = Commitment {
            entry_hash: &self.entry_hash,
            previous_hash: &self.previous_hash,
            timestamp: &self.created_at,
        };
        let bytes = match commitment.canonical_bytes() {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        verify_with_address(&bytes, &self.signature, &self.signer_address).is_ok()
    }

    /// Whether this is the first record of its chain.
    pub fn is_genesis_linked(&self) -> bool {
        self.previous_hash.is_zero()
    }
}
