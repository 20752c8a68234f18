//! Totals and breakdowns derived from a transaction snapshot.
//!
//! Everything here is a pure function of its input slice. Sums saturate at
//! `Decimal::MAX`; stored snapshots never get that far.
use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::models::transaction::{Category, Transaction, TransactionType};

pub fn total_by_type(transactions: &[Transaction], transaction_type: TransactionType) -> Decimal {
    transactions
        .iter()
        .filter(|t| t.transaction_type == transaction_type)
        .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.amount))
}

pub fn net_income(transactions: &[Transaction]) -> Decimal {
    total_by_type(transactions, TransactionType::Revenue)
        .saturating_sub(total_by_type(transactions, TransactionType::Expense))
}

/// Sums amounts per category for one transaction type.
///
/// Categories without a matching transaction are absent from the map.
pub fn group_by_category(
    transactions: &[Transaction],
    transaction_type: TransactionType,
) -> BTreeMap<Category, Decimal> {
    let mut totals = BTreeMap::new();
    for transaction in transactions
        .iter()
        .filter(|t| t.transaction_type == transaction_type)
    {
        let total = totals.entry(transaction.category).or_insert(Decimal::ZERO);
        *total = total.saturating_add(transaction.amount);
    }
    totals
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePoint {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
}

/// One point per transaction, ascending by date.
///
/// The sort is stable: transactions sharing a date keep their snapshot order.
pub fn time_series(transactions: &[Transaction]) -> Vec<TimePoint> {
    let mut series: Vec<TimePoint> = transactions
        .iter()
        .map(|t| TimePoint {
            date: t.date,
            amount: t.amount,
            transaction_type: t.transaction_type,
        })
        .collect();
    series.sort_by_key(|p| p.date);
    series
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthTotals {
    pub revenue: Decimal,
    pub expense: Decimal,
}

impl MonthTotals {
    pub fn net(&self) -> Decimal {
        self.revenue.saturating_sub(self.expense)
    }
}

/// Revenue and expense totals per calendar month, only for months that
/// have transactions.
pub fn monthly_totals(transactions: &[Transaction]) -> BTreeMap<YearMonth, MonthTotals> {
    let mut months: BTreeMap<YearMonth, MonthTotals> = BTreeMap::new();
    for transaction in transactions {
        let entry = months.entry(YearMonth::of(transaction.date)).or_default();
        match transaction.transaction_type {
            TransactionType::Revenue => entry.revenue = entry.revenue.saturating_add(transaction.amount),
            TransactionType::Expense => entry.expense = entry.expense.saturating_add(transaction.amount),
        }
    }
    months
}

/// Everything the presentation layer needs to render the overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub transactions: usize,
    pub total_revenue: Decimal,
    pub total_expenses: Decimal,
    pub net_income: Decimal,
    pub revenue_by_category: BTreeMap<Category, Decimal>,
    pub expenses_by_category: BTreeMap<Category, Decimal>,
    pub series: Vec<TimePoint>,
    pub monthly: BTreeMap<YearMonth, MonthTotals>,
}

pub fn summarize(transactions: &[Transaction]) -> Summary {
    Summary {
        transactions: transactions.len(),
        total_revenue: total_by_type(transactions, TransactionType::Revenue),
        total_expenses: total_by_type(transactions, TransactionType::Expense),
        net_income: net_income(transactions),
        revenue_by_category: group_by_category(transactions, TransactionType::Revenue),
        expenses_by_category: group_by_category(transactions, TransactionType::Expense),
        series: time_series(transactions),
        monthly: monthly_totals(transactions),
    }
}
