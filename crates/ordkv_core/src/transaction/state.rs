//! Transaction state.

use crate::error::{CoreError, CoreResult};

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back, explicitly or on drop.
    RolledBack,
}

impl TransactionState {
    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(self) -> bool {
        self == TransactionState::Active
    }

    /// Fails with `TransactionClosed` unless the state is active.
    pub(crate) fn ensure_active(self) -> CoreResult<()> {
        match self {
            TransactionState::Active => Ok(()),
            TransactionState::Committed | TransactionState::RolledBack => {
                Err(CoreError::TransactionClosed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_state_passes() {
        assert!(TransactionState::Active.is_active());
        assert!(TransactionState::Active.ensure_active().is_ok());
    }

    #[test]
    fn terminal_states_are_closed() {
        for state in [TransactionState::Committed, TransactionState::RolledBack] {
            assert!(!state.is_active());
            assert!(matches!(
                state.ensure_active(),
                Err(CoreError::TransactionClosed)
            ));
        }
    }
}
