use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use super::types::{TlsError, TlsErrorKind};

/// Shared flag a caller flips to abort a build that is still reading or decrypting.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct BuildGuard {
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl BuildGuard {
    pub(crate) fn new(deadline: Option<Instant>, cancel: Option<CancelToken>) -> Self {
        Self { deadline, cancel }
    }

    pub(crate) fn check(&self, stage: &str) -> Result<(), TlsError> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(TlsError::new(
                TlsErrorKind::Cancelled,
                format!("build cancelled during {stage}"),
            ));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(TlsError::new(
                    TlsErrorKind::TimedOut,
                    format!("build deadline exceeded during {stage}"),
                ));
            }
        }
        Ok(())
    }
}
