use chrono::NaiveDate;

use crate::models::transaction::{Category, Transaction, TransactionType};

/// Criteria for narrowing a snapshot. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub category: Option<Category>,
    pub transaction_type: Option<TransactionType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub fn matches(transaction: &Transaction, filter: &TransactionFilter) -> bool {
    if let Some(category) = filter.category {
        if transaction.category != category {
            return false;
        }
    }
    if let Some(transaction_type) = filter.transaction_type {
        if transaction.transaction_type != transaction_type {
            return false;
        }
    }
    if let Some(from) = filter.from {
        if transaction.date < from {
            return false;
        }
    }
    if let Some(to) = filter.to {
        if transaction.date > to {
            return false;
        }
    }
    true
}

pub fn apply<'a>(transactions: &'a [Transaction], filter: &TransactionFilter) -> Vec<&'a Transaction> {
    transactions
        .iter()
        .filter(|transaction| matches(transaction, filter))
        .collect()
}

pub fn search_by_category<'a>(category: Category, transactions: &'a [Transaction]) -> Vec<&'a Transaction> {
    apply(
        transactions,
        &TransactionFilter {
            category: Some(category),
            ..TransactionFilter::default()
        },
    )
}

/// Parses `FROM..TO` where either side may be empty, e.g. `2025-01-01..`.
pub fn parse_date_range(input: &str) -> Result<(Option<NaiveDate>, Option<NaiveDate>), String> {
    let (left, right) = input
        .trim()
        .split_once("..")
        .ok_or_else(|| "Invalid date range. Use YYYY-MM-DD..YYYY-MM-DD".to_string())?;

    let parse = |s: &str| -> Result<Option<NaiveDate>, String> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("Invalid date '{}'. Use YYYY-MM-DD.", s))
    };

    let from = parse(left)?;
    let to = parse(right)?;
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err("Invalid range: start date must be <= end date".to_string());
        }
    }
    Ok((from, to))
}
