//! Cancellation and deadlines for transactions.

use crate::error::{CoreError, CoreResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cloneable cancellation flag.
///
/// All clones observe the same flag. Cancelling is permanent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels every operation observing this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Checks if the token was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Options for beginning a transaction.
#[derive(Debug, Clone, Default)]
pub struct TxOptions {
    /// Whether the transaction may mutate stores.
    pub writable: bool,
    /// External cancellation signal.
    pub cancel: Option<CancelToken>,
    /// Point in time after which every operation fails.
    pub deadline: Option<Instant>,
}

impl TxOptions {
    /// Options for a read-only transaction.
    #[must_use]
    pub fn read_only() -> Self {
        Self::default()
    }

    /// Options for a read-write transaction.
    #[must_use]
    pub fn writable() -> Self {
        Self {
            writable: true,
            ..Self::default()
        }
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to now.
    ///
    /// A timeout too large to represent as an [`Instant`] sets no deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }
}

/// The signal a transaction checks before every operation.
#[derive(Debug, Clone, Default)]
pub(crate) struct Signal {
    cancel: Option<CancelToken>,
    deadline: Option<Instant>,
}

impl Signal {
    pub(crate) fn new(cancel: Option<CancelToken>, deadline: Option<Instant>) -> Self {
        Self { cancel, deadline }
    }

    /// Fails if the token was cancelled or the deadline passed.
    pub(crate) fn check(&self) -> CoreResult<()> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(CoreError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(CoreError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn empty_signal_never_fires() {
        assert!(Signal::default().check().is_ok());
    }

    #[test]
    fn cancelled_signal() {
        let token = CancelToken::new();
        let signal = Signal::new(Some(token.clone()), None);
        assert!(signal.check().is_ok());
        token.cancel();
        assert!(matches!(signal.check(), Err(CoreError::Cancelled)));
    }

    #[test]
    fn expired_deadline() {
        let signal = Signal::new(None, Some(Instant::now()));
        assert!(matches!(signal.check(), Err(CoreError::DeadlineExceeded)));

        let later = Signal::new(None, Some(Instant::now() + Duration::from_secs(60)));
        assert!(later.check().is_ok());
    }

    #[test]
    fn cancellation_wins_over_deadline() {
        let token = CancelToken::new();
        token.cancel();
        let signal = Signal::new(Some(token), Some(Instant::now()));
        assert!(matches!(signal.check(), Err(CoreError::Cancelled)));
    }

    #[test]
    fn options_builders() {
        let opts = TxOptions::writable().with_timeout(Duration::from_secs(5));
        assert!(opts.writable);
        assert!(opts.deadline.is_some());
        assert!(!TxOptions::read_only().writable);
    }

    #[test]
    fn unbounded_timeout_sets_no_deadline() {
        let opts = TxOptions::read_only().with_timeout(Duration::MAX);
        assert!(opts.deadline.is_none());
    }
}
