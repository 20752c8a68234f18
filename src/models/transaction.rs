use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::Error;

/// Durable identifier of a transaction, persisted in the `Id` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for TransactionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| Error::Validation(format!("Invalid transaction ID '{}'. Expected a UUID.", s.trim())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Salary,
    Investments,
    Food,
    Transportation,
    Entertainment,
    Utilities,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Salary,
        Category::Investments,
        Category::Food,
        Category::Transportation,
        Category::Entertainment,
        Category::Utilities,
        Category::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Salary => "Salary",
            Category::Investments => "Investments",
            Category::Food => "Food",
            Category::Transportation => "Transportation",
            Category::Entertainment => "Entertainment",
            Category::Utilities => "Utilities",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = Category::ALL.iter().map(|c| c.name()).collect();
                Error::Validation(format!(
                    "Unknown category '{}'. Use one of: {}.",
                    s,
                    names.join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransactionType {
    Revenue,
    Expense,
}

impl TransactionType {
    pub fn name(self) -> &'static str {
        match self {
            TransactionType::Revenue => "Revenue",
            TransactionType::Expense => "Expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "revenue" | "income" => Ok(TransactionType::Revenue),
            "expense" => Ok(TransactionType::Expense),
            other => Err(Error::Validation(format!(
                "Invalid transaction type '{}'. Use 'revenue' or 'expense'.",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub category: Category,
    pub transaction_type: TransactionType,
    /// Free text, empty when the user gave none.
    pub details: String,
}

impl Transaction {
    pub fn new(
        id: TransactionId,
        date: NaiveDate,
        amount: Decimal,
        category: Category,
        transaction_type: TransactionType,
        details: String,
    ) -> Self {
        Self {
            id,
            date,
            amount,
            category,
            transaction_type,
            details,
        }
    }
}

/// A transaction as entered by the user, before it has an ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub category: Category,
    pub transaction_type: TransactionType,
    pub details: String,
}

pub fn check_amount(amount: Decimal) -> Result<(), Error> {
    if amount < Decimal::ZERO {
        return Err(Error::Validation(format!(
            "Amount must not be negative, got {}. Use the transaction type to record an expense.",
            amount
        )));
    }
    Ok(())
}

/// Running revenue and expense sums.
///
/// A stored snapshot keeps both sums within `Decimal` range, so totals
/// computed over it cannot overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeTotals {
    pub revenue: Decimal,
    pub expense: Decimal,
}

impl TypeTotals {
    pub fn of(transactions: &[Transaction]) -> Result<Self, Error> {
        let mut totals = Self::default();
        for transaction in transactions {
            totals.add(transaction)?;
        }
        Ok(totals)
    }

    pub fn add(&mut self, transaction: &Transaction) -> Result<(), Error> {
        let total = match transaction.transaction_type {
            TransactionType::Revenue => &mut self.revenue,
            TransactionType::Expense => &mut self.expense,
        };
        *total = total.checked_add(transaction.amount).ok_or_else(|| {
            Error::Validation(format!(
                "Amount {} is too large: total {} would exceed {}.",
                transaction.amount,
                transaction.transaction_type.name().to_lowercase(),
                Decimal::MAX
            ))
        })?;
        Ok(())
    }
}

impl NewTransaction {
    pub fn validate(&self) -> Result<(), Error> {
        check_amount(self.amount)
    }

    /// Validates the input and assigns a fresh ID.
    pub fn into_transaction(self) -> Result<Transaction, Error> {
        self.validate()?;
        Ok(Transaction::new(
            TransactionId::new(),
            self.date,
            self.amount,
            self.category,
            self.transaction_type,
            self.details,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_transaction(amount: Decimal) -> NewTransaction {
        NewTransaction {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            amount,
            category: Category::Food,
            transaction_type: TransactionType::Expense,
            details: "lunch".to_string(),
        }
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("food".parse::<Category>().unwrap(), Category::Food);
        assert_eq!(" UTILITIES ".parse::<Category>().unwrap(), Category::Utilities);
    }

    #[test]
    fn test_category_parse_unknown() {
        let err = "Groceries".parse::<Category>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("Groceries"));
    }

    #[test]
    fn test_transaction_type_accepts_income_alias() {
        assert_eq!("income".parse::<TransactionType>().unwrap(), TransactionType::Revenue);
        assert_eq!("Revenue".parse::<TransactionType>().unwrap(), TransactionType::Revenue);
        assert_eq!("EXPENSE".parse::<TransactionType>().unwrap(), TransactionType::Expense);
        assert!("refund".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_transaction_id_display_parses_back() {
        let id = TransactionId::new();
        assert_eq!(id.to_string().parse::<TransactionId>().unwrap(), id);
        assert!("not-a-uuid".parse::<TransactionId>().is_err());
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let result = new_transaction(Decimal::new(-5, 0)).into_transaction();
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_zero_amount_is_accepted() {
        let tx = new_transaction(Decimal::ZERO).into_transaction().unwrap();
        assert_eq!(tx.amount, Decimal::ZERO);
    }

    #[test]
    fn test_into_transaction_assigns_distinct_ids() {
        let a = new_transaction(Decimal::new(50, 0)).into_transaction().unwrap();
        let b = new_transaction(Decimal::new(50, 0)).into_transaction().unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.details, "lunch");
    }

    #[test]
    fn test_type_totals_reject_overflow_per_type() {
        let revenue = NewTransaction {
            transaction_type: TransactionType::Revenue,
            ..new_transaction(Decimal::MAX)
        }
        .into_transaction()
        .unwrap();
        let expense = new_transaction(Decimal::MAX).into_transaction().unwrap();

        let mut totals = TypeTotals::of(&[revenue.clone(), expense]).unwrap();
        assert_eq!(totals.revenue, Decimal::MAX);
        assert_eq!(totals.expense, Decimal::MAX);

        let result = totals.add(&revenue);
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(totals.revenue, Decimal::MAX);
    }
}
