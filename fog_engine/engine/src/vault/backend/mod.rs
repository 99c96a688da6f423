pub mod simulated;

use crate::error::EngineResult;
use crate::types::CiphertextHandle;

/// The encrypted-value capability. The engine only ever asks these three questions
/// about a handle; ciphertext contents stay behind the trait.
pub trait CiphertextBackend: Send + Sync {
    /// Unknown handles are an error, not `false`.
    fn is_initialized(&self, handle: &CiphertextHandle) -> EngineResult<bool>;

    /// Deterministic serialization used only for snapshot hashing.
    fn canonical_bytes(&self, handle: &CiphertextHandle) -> EngineResult<Vec<u8>>;

    /// One-way transition to initialized for every handle, or for none of them.
    /// Only the record store calls this.
    fn bind_all(&self, handles: &[CiphertextHandle]) -> EngineResult<()>;
}
