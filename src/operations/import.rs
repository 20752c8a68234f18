use std::fs::File;
use std::path::Path;

use super::add::create_new_transaction;
use crate::error::{Error, Result};
use crate::models::transaction::NewTransaction;

/// Reads a headerless CSV of `date,amount,category,type[,details]` rows.
///
/// Every row is validated before returning, so callers either get all rows
/// or an error naming the first bad line.
pub fn read_import_file(path: &Path) -> Result<Vec<NewTransaction>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut transactions = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            match e.into_kind() {
                csv::ErrorKind::Io(io) => Error::io(path, io),
                other => Error::Validation(format!("CSV parse error on line {}: {:?}", line, other)),
            }
        })?;
        // Blank lines are skipped by the reader, so count from the file.
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() != 4 && record.len() != 5 {
            return Err(Error::Validation(format!(
                "Invalid number of columns on line {}: expected 4 or 5, got {}",
                line,
                record.len()
            )));
        }

        let field = |idx: usize| record.get(idx).unwrap_or("");
        let transaction = create_new_transaction(field(0), field(1), field(2), field(3), field(4))
            .map_err(|e| Error::Validation(format!("Line {}: {}", line, e)))?;

        transactions.push(transaction);
    }

    Ok(transactions)
}
