//! Snapshot hash: binds a decryption request to the exact ciphertext bytes present when it was issued.
//!
//! Layout fed to blake3, every field length-prefixed (u64 little-endian):
//!   domain_tag | system_identity | ciphertext_0 | ciphertext_1 | ...
//!
//! The same `SnapshotDomain` must hash both at request time and at callback time,
//! otherwise every callback fails with `StateMismatch`.

use crate::types::SnapshotHash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDomain {
    domain_tag: String,
    system_identity: String,
}

impl SnapshotDomain {
    pub fn new(domain_tag: impl Into<String>, system_identity: impl Into<String>) -> Self {
        SnapshotDomain {
            domain_tag: domain_tag.into(),
            system_identity: system_identity.into(),
        }
    }

    pub fn hash<B: AsRef<[u8]>>(&self, ordered_ciphertexts: &[B]) -> SnapshotHash {
        let mut hasher = blake3::Hasher::new();
        update_prefixed(&mut hasher, self.domain_tag.as_bytes());
        update_prefixed(&mut hasher, self.system_identity.as_bytes());
        for ct in ordered_ciphertexts {
            update_prefixed(&mut hasher, ct.as_ref());
        }
        SnapshotHash(*hasher.finalize().as_bytes())
    }
}

fn update_prefixed(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
