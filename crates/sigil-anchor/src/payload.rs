//! Off-chain payload pointers.
//!
//! The ledger transaction carries only the record commitment plus
//! pointers to the off-chain content. The [`PayloadStore`] seam decides
//! what those pointers are; the default stores nothing and emits
//! content-addressed `cas://` pointers derived from the record's entry
//! hash, which any content-addressed store can later resolve.

use sigil_chain::SignedRecord;
use sigil_core::ContentDigest;

use crate::error::AnchorError;

/// Produces the off-chain pointers referenced by anchor transactions.
pub trait PayloadStore: Send + Sync {
    /// Persist (or address) a record's payload, returning its pointer.
    fn put(&self, record: &SignedRecord) -> Result<String, AnchorError>;

    /// Pointer for a record identified only by its entry hash, used for
    /// parent linkage without re-reading the parent record.
    fn pointer_for(&self, digest: &ContentDigest) -> String;
}

/// Content-addressed pointer scheme with no backing store.
///
/// `cas://<entry-hash-hex>` is resolvable by any store that indexes
/// records by their content digest, including the local record cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct CasPayloadStore;

impl PayloadStore for CasPayloadStore {
    fn put(&self, record: &SignedRecord) -> Result<String, AnchorError> {
        Ok(self.pointer_for(&record.entry_hash))
    }

    fn pointer_for(&self, digest: &ContentDigest) -> String {
        format!("cas://{}", digest.to_hex())
    }
}
