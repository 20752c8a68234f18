//! The session controller: the only entry point the UI uses to read and
//! change transactions.
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{Error, Result};
use crate::models::transaction::{NewTransaction, Transaction, TransactionId};
use crate::operations::aggregate::{self, Summary};
use crate::operations::delete_workflow::{DeleteOutcome, DeleteWorkflow};
use crate::operations::import::read_import_file;
use crate::store::TransactionStore;

/// Returned by [Session::open] when the data file could not be parsed and
/// was moved out of the way.
#[derive(Debug)]
pub struct CorruptRecovery {
    pub error: Error,
    pub backup: PathBuf,
}

#[derive(Debug)]
pub struct Session {
    store: TransactionStore,
    deletion: DeleteWorkflow,
}

impl Session {
    pub fn new(store: TransactionStore) -> Self {
        Self {
            store,
            deletion: DeleteWorkflow::new(),
        }
    }

    /// Opens the data file at `path`.
    ///
    /// A corrupt file is renamed to `<name>.corrupt-<timestamp>` and the
    /// session starts empty. I/O errors are returned as is.
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, Option<CorruptRecovery>)> {
        let path = path.into();
        match TransactionStore::open(&path) {
            Ok(store) => {
                tracing::info!(
                    path = %path.display(),
                    count = store.transactions().len(),
                    "opened transaction store"
                );
                Ok((Self::new(store), None))
            }
            Err(error @ Error::CorruptData { .. }) => {
                let backup = backup_path(&path);
                fs::rename(&path, &backup).map_err(|e| Error::io(&path, e))?;
                tracing::warn!(
                    %error,
                    backup = %backup.display(),
                    "data file is corrupt, moved it aside and starting empty"
                );
                let session = Self::new(TransactionStore::empty(path));
                Ok((session, Some(CorruptRecovery { error, backup })))
            }
            Err(error) => Err(error),
        }
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    pub fn snapshot(&self) -> &[Transaction] {
        self.store.transactions()
    }

    pub fn summary(&self) -> Summary {
        aggregate::summarize(self.snapshot())
    }

    pub fn add_transaction(&mut self, new_transaction: NewTransaction) -> Result<Transaction> {
        let transaction = new_transaction.into_transaction()?;
        self.store.add(transaction.clone())?;
        tracing::info!(
            id = %transaction.id,
            amount = %transaction.amount,
            category = %transaction.category,
            transaction_type = %transaction.transaction_type,
            "added transaction"
        );
        self.reload_after_write();
        Ok(transaction)
    }

    /// Imports every row of a headerless CSV file, or none of them.
    pub fn import_csv(&mut self, path: &Path) -> Result<usize> {
        let transactions = read_import_file(path)?
            .into_iter()
            .map(NewTransaction::into_transaction)
            .collect::<Result<Vec<_>>>()?;
        let count = self.store.add_many(transactions)?;
        tracing::info!(count, source = %path.display(), "imported transactions");
        self.reload_after_write();
        Ok(count)
    }

    pub fn request_delete(&mut self, id: TransactionId) {
        self.deletion.request_delete(id);
    }

    pub fn pending_delete(&self) -> Option<TransactionId> {
        self.deletion.pending()
    }

    /// The transaction awaiting confirmation, if it still exists.
    pub fn pending_transaction(&self) -> Option<&Transaction> {
        self.pending_delete().and_then(|id| self.store.get(id))
    }

    pub fn confirm_delete(&mut self) -> Result<DeleteOutcome> {
        let outcome = self.deletion.confirm(&mut self.store)?;
        if matches!(outcome, DeleteOutcome::Removed(_)) {
            self.reload_after_write();
        }
        Ok(outcome)
    }

    pub fn cancel_delete(&mut self) -> Option<TransactionId> {
        let cancelled = self.deletion.cancel();
        if let Some(id) = cancelled {
            tracing::debug!(%id, "cancelled delete");
        }
        cancelled
    }

    /// Reloads the snapshot from disk.
    pub fn refresh(&mut self) -> Result<()> {
        self.store.refresh()
    }

    /// Picks up changes made by other writers once our own write is on disk.
    ///
    /// The write already succeeded, so a failed reload keeps the snapshot we
    /// just saved instead of failing the mutation.
    fn reload_after_write(&mut self) {
        if let Err(error) = self.store.refresh() {
            tracing::warn!(%error, "reload after write failed, keeping the saved snapshot");
        }
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "transactions".to_string());
    path.with_file_name(format!("{}.corrupt-{}", name, stamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::{Category, TransactionType};
    use crate::operations::add::parse_new_transaction;
    use crate::operations::delete_workflow::DeleteState;
    use crate::store::csv_file;
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir, tempdir};

    fn open_session() -> (TempDir, Session) {
        let dir = tempdir().unwrap();
        let (session, recovery) = Session::open(dir.path().join("data.csv")).unwrap();
        assert!(recovery.is_none());
        (dir, session)
    }

    fn add(session: &mut Session, input: &str) -> Transaction {
        session
            .add_transaction(parse_new_transaction(input).unwrap())
            .unwrap()
    }

    #[test]
    fn test_add_single_expense_updates_summary() {
        let (_dir, mut session) = open_session();
        add(&mut session, "2024-01-01, 50, Food, expense, lunch");

        let summary = session.summary();
        assert_eq!(summary.total_expenses, Decimal::new(50, 0));
        assert_eq!(summary.net_income, Decimal::new(-50, 0));
    }

    #[test]
    fn test_revenue_and_expense_summary() {
        let (_dir, mut session) = open_session();
        add(&mut session, "2024-01-01, 1000, Salary, revenue");
        add(&mut session, "2024-01-02, 200, Food, expense");

        let summary = session.summary();
        assert_eq!(summary.net_income, Decimal::new(800, 0));
        assert_eq!(
            summary.expenses_by_category,
            BTreeMap::from([(Category::Food, Decimal::new(200, 0))])
        );
        assert_eq!(
            summary.revenue_by_category,
            BTreeMap::from([(Category::Salary, Decimal::new(1000, 0))])
        );
    }

    #[test]
    fn test_added_transactions_survive_reopen() {
        let (dir, mut session) = open_session();
        let tx = add(&mut session, "2024-01-01, 50, Food, expense, lunch");

        let (reopened, _) = Session::open(dir.path().join("data.csv")).unwrap();
        assert_eq!(reopened.snapshot(), &[tx]);
    }

    #[test]
    fn test_negative_amount_rejected_and_store_unchanged() {
        let (_dir, mut session) = open_session();
        add(&mut session, "2024-01-01, 10, Food, expense");

        let invalid = NewTransaction {
            amount: Decimal::new(-5, 0),
            ..parse_new_transaction("2024-01-02, 1, Food, expense").unwrap()
        };
        let result = session.add_transaction(invalid);

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(session.snapshot().len(), 1);
        assert_eq!(csv_file::load(session.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_request_then_cancel() {
        let (_dir, mut session) = open_session();
        add(&mut session, "2024-01-01, 10, Food, expense");
        let before = session.snapshot().to_vec();

        session.request_delete(before[0].id);
        assert_eq!(session.pending_transaction(), Some(&before[0]));
        assert_eq!(session.cancel_delete(), Some(before[0].id));

        assert_eq!(session.pending_delete(), None);
        assert_eq!(session.snapshot(), before.as_slice());
        assert_eq!(csv_file::load(session.path()).unwrap(), before);
    }

    #[test]
    fn test_request_then_confirm() {
        let (_dir, mut session) = open_session();
        let first = add(&mut session, "2024-01-01, 10, Food, expense");
        let second = add(&mut session, "2024-01-02, 20, Utilities, expense");

        session.request_delete(first.id);
        let outcome = session.confirm_delete().unwrap();

        assert_eq!(outcome, DeleteOutcome::Removed(first.clone()));
        assert_eq!(session.deletion.state(), DeleteState::Idle);
        assert_eq!(session.snapshot(), &[second.clone()]);
        assert_eq!(csv_file::load(session.path()).unwrap(), vec![second]);
    }

    #[test]
    fn test_confirm_after_external_removal_is_quiet() {
        let (dir, mut session) = open_session();
        let tx = add(&mut session, "2024-01-01, 10, Food, expense");

        let (mut other, _) = Session::open(dir.path().join("data.csv")).unwrap();
        other.request_delete(tx.id);
        other.confirm_delete().unwrap();

        session.request_delete(tx.id);
        session.refresh().unwrap();
        assert_eq!(session.pending_transaction(), None);
        assert_eq!(session.confirm_delete().unwrap(), DeleteOutcome::Missing(tx.id));
        assert_eq!(session.pending_delete(), None);
    }

    #[test]
    fn test_corrupt_file_is_backed_up_and_session_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "Date,Amount,Category\nnot,a,row\n").unwrap();

        let (mut session, recovery) = Session::open(&path).unwrap();
        let recovery = recovery.expect("expected a corrupt data recovery");

        assert!(matches!(recovery.error, Error::CorruptData { .. }));
        assert!(session.snapshot().is_empty());
        assert!(!path.exists());
        assert_eq!(
            fs::read_to_string(&recovery.backup).unwrap(),
            "Date,Amount,Category\nnot,a,row\n"
        );
        let backup_name = recovery.backup.file_name().unwrap().to_string_lossy().into_owned();
        assert!(backup_name.starts_with("data.csv.corrupt-"));

        add(&mut session, "2024-01-01, 10, Food, expense");
        assert_eq!(csv_file::load(&path).unwrap().len(), 1);
        assert!(recovery.backup.exists());
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let (_dir, mut session) = open_session();
        add(&mut session, "2024-01-01, 10, Food, expense");

        let mut bad = NamedTempFile::new().unwrap();
        write!(bad, "2024-02-01,5,Food,expense\n2024-02-02,oops,Food,expense\n").unwrap();
        assert!(session.import_csv(bad.path()).is_err());
        assert_eq!(session.snapshot().len(), 1);

        let mut good = NamedTempFile::new().unwrap();
        write!(good, "2024-02-01,5,Food,expense\n2024-02-02,1200,Salary,revenue,Feb\n").unwrap();
        assert_eq!(session.import_csv(good.path()).unwrap(), 2);
        assert_eq!(session.snapshot().len(), 3);
        assert_eq!(csv_file::load(session.path()).unwrap().len(), 3);
        assert_eq!(
            session.summary().total_revenue,
            Decimal::new(1200, 0)
        );
        assert!(
            session
                .snapshot()
                .iter()
                .any(|t| t.transaction_type == TransactionType::Revenue && t.details == "Feb")
        );
    }

    #[test]
    fn test_amounts_past_the_largest_total_are_rejected() {
        let (_dir, mut session) = open_session();
        let first = add(&mut session, "2024-01-01, 79228162514264337593543950335, Salary, revenue");

        let result = session.add_transaction(
            parse_new_transaction("2024-01-02, 79228162514264337593543950335, Salary, revenue").unwrap(),
        );

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(session.snapshot(), &[first]);
        assert_eq!(session.summary().total_revenue, Decimal::MAX);
        assert_eq!(csv_file::load(session.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_import_past_the_largest_total_stores_nothing() {
        let (_dir, mut session) = open_session();
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "2024-01-01,79228162514264337593543950335,Salary,revenue\n\
             2024-01-02,79228162514264337593543950335,Investments,revenue\n"
        )
        .unwrap();

        assert!(matches!(session.import_csv(file.path()), Err(Error::Validation(_))));
        assert!(session.snapshot().is_empty());
        assert!(!session.path().exists());
    }

    #[test]
    fn test_failed_reload_after_write_keeps_saved_snapshot() {
        let (_dir, mut session) = open_session();
        let tx = add(&mut session, "2024-01-01, 10, Food, expense");

        // Another writer breaks the file between our save and the reload.
        fs::write(session.path(), "garbage\n").unwrap();
        session.reload_after_write();

        assert_eq!(session.snapshot(), &[tx]);
        assert!(session.refresh().is_err());
        assert_eq!(session.snapshot().len(), 1);
    }

    #[test]
    fn test_add_after_external_corruption_succeeds_once() {
        let (_dir, mut session) = open_session();
        let first = add(&mut session, "2024-01-01, 10, Food, expense");
        fs::write(session.path(), "garbage\n").unwrap();

        let second = session
            .add_transaction(parse_new_transaction("2024-01-02, 20, Food, expense").unwrap())
            .unwrap();

        let stored = csv_file::load(session.path()).unwrap();
        assert_eq!(stored, vec![first, second.clone()]);
        assert_eq!(stored.iter().filter(|t| t.id == second.id).count(), 1);
    }
}
