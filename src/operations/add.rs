use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::transaction::{Category, NewTransaction, TransactionType};

pub const INPUT_FORMAT: &str = "date(YYYY-MM-DD), amount, category, type(revenue/expense), details";

/// Parses one line of user input in [INPUT_FORMAT].
///
/// Details are optional and may themselves contain commas.
pub fn parse_new_transaction(input: &str) -> Result<NewTransaction> {
    let parts: Vec<&str> = input.trim().splitn(5, ',').map(|s| s.trim()).collect();
    if parts.len() < 4 {
        return Err(Error::Validation(format!(
            "Invalid number of details provided. Expected at least 4 values separated by commas but got {}",
            parts.len()
        )));
    }
    create_new_transaction(parts[0], parts[1], parts[2], parts[3], parts.get(4).copied().unwrap_or(""))
}

pub fn create_new_transaction(
    date: &str,
    amount: &str,
    category: &str,
    transaction_type: &str,
    details: &str,
) -> Result<NewTransaction> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("Invalid date '{}'. Please use YYYY-MM-DD.", date.trim())))?;

    let amount = Decimal::from_str(amount.trim()).map_err(|_| {
        Error::Validation(format!(
            "Invalid amount format '{}'. Please provide a valid decimal number.",
            amount.trim()
        ))
    })?;

    let new_transaction = NewTransaction {
        date,
        amount,
        category: Category::from_str(category)?,
        transaction_type: TransactionType::from_str(transaction_type)?,
        details: details.to_string(),
    };
    new_transaction.validate()?;
    Ok(new_transaction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_input() {
        let tx = parse_new_transaction("2024-01-01, 50, Food, expense, lunch").unwrap();
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(tx.amount, Decimal::new(50, 0));
        assert_eq!(tx.category, Category::Food);
        assert_eq!(tx.transaction_type, TransactionType::Expense);
        assert_eq!(tx.details, "lunch");
    }

    #[test]
    fn test_parse_details_are_optional() {
        let tx = parse_new_transaction("2024-01-01,1000,salary,revenue").unwrap();
        assert_eq!(tx.category, Category::Salary);
        assert_eq!(tx.details, "");
    }

    #[test]
    fn test_parse_details_keep_commas() {
        let tx = parse_new_transaction("2024-01-01, 12.5, Food, expense, pizza, salad, soda").unwrap();
        assert_eq!(tx.details, "pizza, salad, soda");
    }

    #[test]
    fn test_parse_negative_amount_rejected() {
        let result = parse_new_transaction("2024-01-01, -5, Food, expense, refund?");
        assert!(matches!(result, Err(Error::Validation(ref msg)) if msg.contains("negative")));
    }

    #[test]
    fn test_parse_too_few_values() {
        let result = parse_new_transaction("2024-01-01, 5, Food");
        assert!(matches!(result, Err(Error::Validation(ref msg)) if msg.contains("got 3")));
    }

    #[test]
    fn test_parse_invalid_date() {
        let result = parse_new_transaction("01-01-2024, 5, Food, expense");
        assert!(matches!(result, Err(Error::Validation(ref msg)) if msg.contains("Invalid date")));
    }

    #[test]
    fn test_parse_invalid_amount() {
        let result = parse_new_transaction("2024-01-01, five, Food, expense");
        assert!(matches!(result, Err(Error::Validation(ref msg)) if msg.contains("Invalid amount")));
    }

    #[test]
    fn test_parse_unknown_category_and_type() {
        assert!(parse_new_transaction("2024-01-01, 5, Rent, expense").is_err());
        assert!(parse_new_transaction("2024-01-01, 5, Food, transfer").is_err());
    }
}
