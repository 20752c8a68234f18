//! Reading and writing the flat CSV file that holds every transaction.
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;
use std::str::FromStr;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::models::transaction::{Category, Transaction, TransactionId, TransactionType, TypeTotals};

pub const HEADER: [&str; 6] = ["Id", "Date", "Amount", "Category", "Type", "Details"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Loads all transactions from `path`.
///
/// A missing file is an empty store. Anything that does not match [HEADER]
/// and its column types is reported as [Error::CorruptData].
pub fn load(path: &Path) -> Result<Vec<Transaction>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no data file yet, starting empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(Error::io(path, e)),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = reader
        .headers()
        .map_err(|e| read_error(path, e))?
        .clone();

    let mut transactions = Vec::new();
    let mut seen = HashSet::new();
    let mut totals = TypeTotals::default();
    let mut record = StringRecord::new();

    if headers.is_empty() {
        // Zero-length file: nothing was ever written.
        return Ok(transactions);
    }
    check_header(path, &headers)?;

    while reader.read_record(&mut record).map_err(|e| read_error(path, e))? {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let transaction = parse_record(&record).map_err(|reason| Error::corrupt(path, line, reason))?;
        if !seen.insert(transaction.id) {
            return Err(Error::corrupt(
                path,
                line,
                format!("duplicate transaction ID {}", transaction.id),
            ));
        }
        totals
            .add(&transaction)
            .map_err(|e| Error::corrupt(path, line, e.to_string()))?;
        transactions.push(transaction);
    }

    tracing::debug!(path = %path.display(), count = transactions.len(), "loaded transactions");
    Ok(transactions)
}

/// Replaces the contents of `path` with `transactions`.
///
/// The rows are written to a temporary file in the same directory which is
/// then renamed over `path`, so readers see either the old or the new file.
pub fn save(path: &Path, transactions: &[Transaction]) -> Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| Error::io(&dir, e))?;
    {
        let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
        writer.write_record(HEADER).map_err(|e| write_error(path, e))?;
        for transaction in transactions {
            writer
                .write_record(to_record(transaction))
                .map_err(|e| write_error(path, e))?;
        }
        writer.flush().map_err(|e| Error::io(path, e))?;
    }
    tmp.as_file().sync_all().map_err(|e| Error::io(path, e))?;
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;

    tracing::debug!(path = %path.display(), count = transactions.len(), "saved transactions");
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn check_header(path: &Path, headers: &StringRecord) -> Result<()> {
    let matches = headers.len() == HEADER.len()
        && headers
            .iter()
            .zip(HEADER)
            .all(|(actual, expected)| actual.trim().eq_ignore_ascii_case(expected));
    if matches {
        Ok(())
    } else {
        Err(Error::corrupt(
            path,
            1,
            format!(
                "expected header '{}', got '{}'",
                HEADER.join(","),
                headers.iter().collect::<Vec<_>>().join(",")
            ),
        ))
    }
}

fn parse_record(record: &StringRecord) -> std::result::Result<Transaction, String> {
    if record.len() != HEADER.len() {
        return Err(format!(
            "expected {} columns, got {}",
            HEADER.len(),
            record.len()
        ));
    }

    let field = |idx: usize| record.get(idx).unwrap_or("");

    let id = TransactionId::from_str(field(0)).map_err(|e| e.to_string())?;
    let date = NaiveDate::parse_from_str(field(1).trim(), DATE_FORMAT)
        .map_err(|_| format!("invalid date '{}'", field(1)))?;
    let amount = Decimal::from_str(field(2).trim())
        .map_err(|_| format!("invalid amount '{}'", field(2)))?;
    if amount < Decimal::ZERO {
        return Err(format!("negative amount {}", amount));
    }
    let category = Category::from_str(field(3)).map_err(|e| e.to_string())?;
    let transaction_type = TransactionType::from_str(field(4)).map_err(|e| e.to_string())?;

    Ok(Transaction::new(
        id,
        date,
        amount,
        category,
        transaction_type,
        field(5).to_string(),
    ))
}

fn to_record(transaction: &Transaction) -> [String; 6] {
    [
        transaction.id.to_string(),
        transaction.date.format(DATE_FORMAT).to_string(),
        transaction.amount.to_string(),
        transaction.category.name().to_string(),
        transaction.transaction_type.name().to_string(),
        transaction.details.clone(),
    ]
}

fn read_error(path: &Path, error: csv::Error) -> Error {
    let line = error.position().map(|p| p.line()).unwrap_or(0);
    match error.into_kind() {
        csv::ErrorKind::Io(e) => Error::io(path, e),
        csv::ErrorKind::Utf8 { err, .. } => Error::corrupt(path, line, err.to_string()),
        other => Error::corrupt(path, line, format!("{:?}", other)),
    }
}

fn write_error(path: &Path, error: csv::Error) -> Error {
    match error.into_kind() {
        csv::ErrorKind::Io(e) => Error::io(path, e),
        other => Error::io(path, io::Error::other(format!("{:?}", other))),
    }
}
