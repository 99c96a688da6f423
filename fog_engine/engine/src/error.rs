//! Centralized fog engine error types.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Coarse grouping of rejections, used for logging and by callers deciding whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authorization,
    Timing,
    DataIntegrity,
    ProtocolIntegrity,
    Infrastructure,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Caller does not hold the role the operation requires.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("system is paused")]
    SystemPaused,

    /// Same action repeated for the same entity before the cooldown elapsed.
    #[error("cooldown active until {ready_at}")]
    CooldownActive { ready_at: u64 },
    #[error("batch epoch is closed")]
    BatchClosed,

    #[error("ciphertext handle already initialized")]
    AlreadyInitialized,
    #[error("record not initialized")]
    NotInitialized,
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Callback for a request that was already finalized.
    #[error("replay detected for request {0}")]
    ReplayDetected(u64),
    /// The record changed between request and callback.
    #[error("snapshot mismatch for request {0}")]
    StateMismatch(u64),
    #[error("invalid decryption proof for request {0}")]
    InvalidDecryptionProof(u64),
    #[error("malformed cleartext: expected 8 bytes, got {0}")]
    MalformedCleartext(usize),
    #[error("unknown request {0}")]
    UnknownRequest(u64),
    #[error("duplicate request id {0}")]
    DuplicateRequestId(u64),
    #[error("request {0} has expired")]
    RequestExpired(u64),
    #[error("request {0} has not reached its deadline")]
    RequestNotOverdue(u64),
    #[error("request {0} is already closed")]
    RequestClosed(u64),

    /// Ciphertext backend or oracle failure.
    #[error("backend error: {0}")]
    Backend(String),
    #[error("config error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn category(&self) -> ErrorCategory {
        use EngineError::*;
        match self {
            Unauthorized(_) | SystemPaused => ErrorCategory::Authorization,
            CooldownActive { .. } | BatchClosed => ErrorCategory::Timing,
            AlreadyInitialized | NotInitialized | InvalidParameter(_) => {
                ErrorCategory::DataIntegrity
            }
            ReplayDetected(_)
            | StateMismatch(_)
            | InvalidDecryptionProof(_)
            | MalformedCleartext(_)
            | UnknownRequest(_)
            | DuplicateRequestId(_)
            | RequestExpired(_)
            | RequestNotOverdue(_)
            | RequestClosed(_) => ErrorCategory::ProtocolIntegrity,
            Backend(_) | Config(_) => ErrorCategory::Infrastructure,
        }
    }

    /// Terminal rejections can never succeed on retry, whatever the payload.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineError::ReplayDetected(_) | EngineError::RequestExpired(_)
        )
    }
}
