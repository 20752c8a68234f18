//! Two-step deletion: a transaction is only removed after the user confirms.
use crate::error::{Error, Result};
use crate::models::transaction::{Transaction, TransactionId};
use crate::store::TransactionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteState {
    #[default]
    Idle,
    PendingConfirmation(TransactionId),
}

/// What happened when a deletion was confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Nothing was pending.
    NothingPending,
    Removed(Transaction),
    /// The pending transaction was already gone, e.g. after a reload.
    Missing(TransactionId),
}

#[derive(Debug, Default)]
pub struct DeleteWorkflow {
    state: DeleteState,
}

impl DeleteWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DeleteState {
        self.state
    }

    pub fn pending(&self) -> Option<TransactionId> {
        match self.state() {
            DeleteState::Idle => None,
            DeleteState::PendingConfirmation(id) => Some(id),
        }
    }

    /// Marks `id` for deletion. A request made while another is pending
    /// replaces it.
    pub fn request_delete(&mut self, id: TransactionId) {
        if let DeleteState::PendingConfirmation(previous) = self.state {
            if previous != id {
                tracing::debug!(%previous, %id, "replacing pending delete request");
            }
        }
        self.state = DeleteState::PendingConfirmation(id);
    }

    /// Drops the pending request, returning the ID that was pending.
    pub fn cancel(&mut self) -> Option<TransactionId> {
        let pending = self.pending();
        self.state = DeleteState::Idle;
        pending
    }

    /// Removes the pending transaction from `store`.
    ///
    /// An I/O error keeps the request pending so it can be confirmed again.
    /// A target that no longer exists is not an error.
    pub fn confirm(&mut self, store: &mut TransactionStore) -> Result<DeleteOutcome> {
        let id = match self.state {
            DeleteState::Idle => return Ok(DeleteOutcome::NothingPending),
            DeleteState::PendingConfirmation(id) => id,
        };

        match store.remove(id) {
            Ok(removed) => {
                self.state = DeleteState::Idle;
                tracing::info!(%id, "deleted transaction");
                Ok(DeleteOutcome::Removed(removed))
            }
            Err(Error::NotFound(_)) => {
                self.state = DeleteState::Idle;
                tracing::warn!(%id, "confirmed delete of a transaction that no longer exists");
                Ok(DeleteOutcome::Missing(id))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::{Category, TransactionType};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn store_with(count: usize) -> (TempDir, TransactionStore) {
        let dir = tempdir().unwrap();
        let mut store = TransactionStore::open(dir.path().join("data.csv")).unwrap();
        for day in 0..count {
            store
                .add(Transaction::new(
                    TransactionId::new(),
                    NaiveDate::from_ymd_opt(2024, 1, 1 + day as u32).unwrap(),
                    Decimal::new(10, 0),
                    Category::Food,
                    TransactionType::Expense,
                    format!("meal {}", day),
                ))
                .unwrap();
        }
        (dir, store)
    }

    #[test]
    fn test_starts_idle() {
        let workflow = DeleteWorkflow::new();
        assert_eq!(workflow.state(), DeleteState::Idle);
        assert_eq!(workflow.pending(), None);
    }

    #[test]
    fn test_request_does_not_touch_store() {
        let (_dir, store) = store_with(2);
        let before = store.transactions().to_vec();
        let mut workflow = DeleteWorkflow::new();

        workflow.request_delete(before[0].id);

        assert_eq!(workflow.state(), DeleteState::PendingConfirmation(before[0].id));
        assert_eq!(store.transactions(), before.as_slice());
    }

    #[test]
    fn test_request_then_cancel_leaves_store_unchanged() {
        let (_dir, mut store) = store_with(2);
        let before = store.transactions().to_vec();
        let mut workflow = DeleteWorkflow::new();

        workflow.request_delete(before[0].id);
        assert_eq!(workflow.cancel(), Some(before[0].id));

        assert_eq!(workflow.state(), DeleteState::Idle);
        store.refresh().unwrap();
        assert_eq!(store.transactions(), before.as_slice());
    }

    #[test]
    fn test_request_then_confirm_removes_from_memory_and_disk() {
        let (_dir, mut store) = store_with(2);
        let target = store.transactions()[0].clone();
        let mut workflow = DeleteWorkflow::new();

        workflow.request_delete(target.id);
        let outcome = workflow.confirm(&mut store).unwrap();

        assert_eq!(outcome, DeleteOutcome::Removed(target.clone()));
        assert_eq!(workflow.state(), DeleteState::Idle);
        assert!(store.get(target.id).is_none());
        let reloaded = TransactionStore::open(store.path()).unwrap();
        assert!(reloaded.get(target.id).is_none());
        assert_eq!(reloaded.transactions().len(), 1);
    }

    #[test]
    fn test_last_request_wins() {
        let (_dir, mut store) = store_with(2);
        let first = store.transactions()[0].id;
        let second = store.transactions()[1].id;
        let mut workflow = DeleteWorkflow::new();

        workflow.request_delete(first);
        workflow.request_delete(second);
        assert_eq!(workflow.pending(), Some(second));

        workflow.confirm(&mut store).unwrap();
        assert!(store.get(first).is_some());
        assert!(store.get(second).is_none());
    }

    #[test]
    fn test_confirm_missing_target_returns_to_idle() {
        let (_dir, mut store) = store_with(1);
        let mut workflow = DeleteWorkflow::new();
        let missing = TransactionId::new();

        workflow.request_delete(missing);
        let outcome = workflow.confirm(&mut store).unwrap();

        assert_eq!(outcome, DeleteOutcome::Missing(missing));
        assert_eq!(workflow.state(), DeleteState::Idle);
        assert_eq!(store.transactions().len(), 1);
    }

    #[test]
    fn test_confirm_and_cancel_when_idle_are_no_ops() {
        let (_dir, mut store) = store_with(1);
        let mut workflow = DeleteWorkflow::new();

        assert_eq!(workflow.cancel(), None);
        assert_eq!(workflow.confirm(&mut store).unwrap(), DeleteOutcome::NothingPending);
        assert_eq!(workflow.state(), DeleteState::Idle);
        assert_eq!(store.transactions().len(), 1);
    }

    #[test]
    fn test_io_error_keeps_request_pending() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut store = TransactionStore::open(&path).unwrap();
        let tx = Transaction::new(
            TransactionId::new(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            Decimal::new(3, 0),
            Category::Other,
            TransactionType::Expense,
            String::new(),
        );
        store.add(tx.clone()).unwrap();

        // Replace the data file with a directory so the rename fails.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();

        let mut workflow = DeleteWorkflow::new();
        workflow.request_delete(tx.id);
        let result = workflow.confirm(&mut store);

        assert!(matches!(result, Err(Error::Io { .. })));
        assert_eq!(workflow.pending(), Some(tx.id));
        assert_eq!(store.transactions(), &[tx]);
    }
}
