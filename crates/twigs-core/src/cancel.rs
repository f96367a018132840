//! Cooperative cancellation shared between the CLI and the engine

use crate::error::{Result, TwigsError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable flag checked at phase boundaries and between plan items
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(UserAborted)` once cancelled
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(TwigsError::UserAborted)
        } else {
            Ok(())
        }
    }
}
