//! Batch epoch: a monotonically increasing counter plus an open/closed window.

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEpoch {
    current_epoch: u64,
    is_open: bool,
}

impl BatchEpoch {
    /// Epochs start at 1.
    pub fn new(start_open: bool) -> Self {
        BatchEpoch {
            current_epoch: 1,
            is_open: start_open,
        }
    }

    pub fn current(&self) -> u64 {
        self.current_epoch
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn require_open(&self) -> EngineResult<()> {
        if !self.is_open {
            return Err(EngineError::BatchClosed);
        }
        Ok(())
    }

    /// Advance to the next epoch and open it. Returns the new epoch.
    pub fn open_next(&mut self) -> u64 {
        self.current_epoch += 1;
        self.is_open = true;
        self.current_epoch
    }

    /// Close without advancing. Returns the epoch that was closed.
    pub fn close(&mut self) -> u64 {
        self.is_open = false;
        self.current_epoch
    }
}
