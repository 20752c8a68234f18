use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::transaction::{Transaction, TransactionId, TypeTotals, check_amount};
use crate::store::csv_file;

/// The in-memory snapshot of all transactions, backed by a CSV file.
///
/// Every mutation rewrites the whole file. The snapshot is only updated once
/// the write has succeeded, so after an error it still matches the file.
#[derive(Debug)]
pub struct TransactionStore {
    path: PathBuf,
    transactions: Vec<Transaction>,
}

impl TransactionStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let transactions = csv_file::load(&path)?;
        Ok(Self { path, transactions })
    }

    /// A store with no transactions that will write to `path` on the first
    /// mutation.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            transactions: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn add(&mut self, transaction: Transaction) -> Result<()> {
        self.add_many(vec![transaction]).map(|_| ())
    }

    /// Appends all of `transactions` with a single write.
    ///
    /// Nothing is written if any of them has a negative amount, a duplicate
    /// ID, or would take its type's total out of `Decimal` range.
    pub fn add_many(&mut self, transactions: Vec<Transaction>) -> Result<usize> {
        let count = transactions.len();
        let mut totals = TypeTotals::of(&self.transactions)?;
        let mut candidate = self.transactions.clone();
        for transaction in transactions {
            check_amount(transaction.amount)?;
            if candidate.iter().any(|t| t.id == transaction.id) {
                return Err(Error::Validation(format!(
                    "Transaction with ID {} already exists.",
                    transaction.id
                )));
            }
            totals.add(&transaction)?;
            candidate.push(transaction);
        }

        csv_file::save(&self.path, &candidate)?;
        self.transactions = candidate;
        Ok(count)
    }

    pub fn remove(&mut self, id: TransactionId) -> Result<Transaction> {
        let pos = self
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or(Error::NotFound(id))?;

        let mut candidate = self.transactions.clone();
        let removed = candidate.remove(pos);
        csv_file::save(&self.path, &candidate)?;
        self.transactions = candidate;
        Ok(removed)
    }

    /// Replaces the snapshot with what is currently on disk.
    pub fn refresh(&mut self) -> Result<()> {
        self.transactions = csv_file::load(&self.path)?;
        Ok(())
    }
}
