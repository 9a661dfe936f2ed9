//! Cooperative cancellation.
//!
//! Engines never install signal handlers; a caller wanting Ctrl-C or timeout
//! behavior sets the token from its own handler or timer thread. The engines
//! poll the token at member boundaries and hash-chunk boundaries.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::Result;
use crate::VerifyError;

/// Shared cancellation flag, cheap to clone across threads.
///
/// # Examples
///
/// ```
/// use restcheck_core::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a new, unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Irreversible for the lifetime of the token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `Err(VerifyError::Interrupted)` once cancellation is
    /// requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(VerifyError::Interrupted)
        } else {
            Ok(())
        }
    }
}
