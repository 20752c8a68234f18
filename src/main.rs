mod config;
mod error;
mod logging;
mod models;
mod operations;
mod session;
mod store;

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use config::Config;
use error::{Error, Result};
use models::transaction::{Category, TransactionId};
use operations::add::{INPUT_FORMAT, parse_new_transaction};
use operations::aggregate::Summary;
use operations::delete_workflow::DeleteOutcome;
use operations::filter::search_by_category;
use session::Session;

const HELP: &str = "Commands:
  add               add a transaction
  list              show all transactions
  search <category> show the transactions of one category
  delete <id>       delete a transaction (the first characters of the ID are enough)
  summary           show totals and category breakdowns
  import <path>     import a CSV of date,amount,category,type,details rows
  browse            open the interactive transaction table
  report            open the chart dashboard
  help              show this message
  exit              quit";

#[derive(Debug, PartialEq, Eq)]
enum UserCommand<'a> {
    Add,
    List,
    Search(&'a str),
    Delete(&'a str),
    Summary,
    Import(&'a str),
    Browse,
    Report,
    Help,
    Exit,
    Unknown(&'a str),
}

fn main() -> ExitCode {
    let config = Config::parse();

    if let Err(e) = logging::setup_logging(&config) {
        eprintln!("Could not set up logging: {}", e);
    }

    let mut session = match Session::open(&config.data_file) {
        Ok((session, recovery)) => {
            if let Some(recovery) = recovery {
                println!("Warning: {}", recovery.error);
                println!(
                    "The unreadable file was moved to {} and you are starting with no transactions.",
                    recovery.backup.display()
                );
            }
            session
        }
        Err(e) => {
            tracing::error!("could not open data file: {}", e);
            eprintln!("Could not open {}: {}", config.data_file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    println!("Welcome to the finance tracker! Data file: {}", session.path().display());
    run_shell(&mut session);
    ExitCode::SUCCESS
}

fn run_shell(session: &mut Session) {
    loop {
        let Some(input) = prompt("Enter a command (type help for a list):") else {
            break;
        };
        if input.is_empty() {
            continue;
        }

        let result = match parse_command(&input) {
            UserCommand::Add => add_command(session),
            UserCommand::List => {
                print_transactions(session.snapshot().iter());
                Ok(())
            }
            UserCommand::Search(category) => search_command(session, category),
            UserCommand::Delete(id) => delete_command(session, id),
            UserCommand::Summary => {
                print_summary(&session.summary());
                Ok(())
            }
            UserCommand::Import(path) => session.import_csv(Path::new(path)).map(|count| {
                println!("Successfully imported {} transactions.", count);
            }),
            UserCommand::Browse => operations::browse::run_browse(session),
            UserCommand::Report => operations::report::run_report(session.summary()),
            UserCommand::Help => {
                println!("{}", HELP);
                Ok(())
            }
            UserCommand::Exit => {
                println!("Exiting the application.");
                break;
            }
            UserCommand::Unknown(command) => {
                println!("Unknown command '{}'.\n{}", command, HELP);
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::warn!("command failed: {}", e);
            println!("Error: {}", e);
            if matches!(e, Error::Io { .. }) {
                println!("Nothing was saved. Please try again.");
            }
        }
    }
}

fn parse_command(input: &str) -> UserCommand<'_> {
    let input = input.trim();
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };

    match command.to_lowercase().as_str() {
        "add" => UserCommand::Add,
        "list" | "print" => UserCommand::List,
        "search" => UserCommand::Search(rest),
        "delete" | "remove" => UserCommand::Delete(rest),
        "summary" => UserCommand::Summary,
        "import" => UserCommand::Import(rest),
        "browse" => UserCommand::Browse,
        "report" => UserCommand::Report,
        "help" | "?" => UserCommand::Help,
        "exit" | "quit" => UserCommand::Exit,
        _ => UserCommand::Unknown(command),
    }
}

/// Prints `message` and reads one trimmed line. `None` on end of input.
fn prompt(message: &str) -> Option<String> {
    println!("{}", message);
    let _ = io::stdout().flush();
    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) => None,
        Ok(_) => Some(input.trim().to_string()),
        Err(e) => {
            tracing::error!("failed to read from stdin: {}", e);
            None
        }
    }
}

fn add_command(session: &mut Session) -> Result<()> {
    let Some(input) = prompt(&format!("Enter transaction details in the format:\n{}", INPUT_FORMAT)) else {
        return Ok(());
    };
    let transaction = session.add_transaction(parse_new_transaction(&input)?)?;
    println!("Transaction added successfully! ID: {}", transaction.id);
    Ok(())
}

fn search_command(session: &Session, category: &str) -> Result<()> {
    let category: Category = category.parse()?;
    let found = search_by_category(category, session.snapshot());
    if found.is_empty() {
        println!("No transactions found for category: {}", category);
    } else {
        print_transactions(found.into_iter());
    }
    Ok(())
}

fn delete_command(session: &mut Session, id_input: &str) -> Result<()> {
    let id = resolve_id(session, id_input)?;
    session.request_delete(id);

    if let Some(transaction) = session.pending_transaction() {
        println!(
            "{}  {}  {:>10}  {:<14} {}",
            transaction.date, transaction.transaction_type, transaction.amount, transaction.category, transaction.details
        );
    }

    let answer = prompt("Delete this transaction? This cannot be undone. (y/n)").unwrap_or_default();
    if !matches!(answer.to_lowercase().as_str(), "y" | "yes") {
        session.cancel_delete();
        println!("Delete cancelled.");
        return Ok(());
    }

    match session.confirm_delete() {
        Ok(DeleteOutcome::Removed(_)) => println!("Transaction removed successfully."),
        Ok(DeleteOutcome::Missing(id)) => println!("Transaction {} no longer exists.", id),
        Ok(DeleteOutcome::NothingPending) => println!("Nothing to delete."),
        Err(e) => {
            // Do not leave the shell with a request that nobody can see.
            session.cancel_delete();
            return Err(e);
        }
    }
    Ok(())
}

/// Accepts a full ID or a prefix that matches exactly one transaction.
fn resolve_id(session: &Session, input: &str) -> Result<TransactionId> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::Validation("Transaction ID cannot be empty.".to_string()));
    }
    if let Ok(id) = input.parse::<TransactionId>() {
        return Ok(id);
    }

    let needle = input.to_lowercase();
    let mut matches = session
        .snapshot()
        .iter()
        .filter(|t| t.id.to_string().starts_with(&needle));
    match (matches.next(), matches.next()) {
        (Some(t), None) => Ok(t.id),
        (None, _) => Err(Error::Validation(format!("No transaction ID starts with '{}'.", input))),
        (Some(_), Some(_)) => Err(Error::Validation(format!(
            "More than one transaction ID starts with '{}'. Type more characters.",
            input
        ))),
    }
}

fn print_transactions<'a>(transactions: impl Iterator<Item = &'a models::transaction::Transaction>) {
    let mut count = 0;
    for transaction in transactions {
        println!(
            "{}  {}  {:<7}  {:>10}  {:<14} {}",
            transaction.id,
            transaction.date,
            transaction.transaction_type,
            transaction.amount,
            transaction.category,
            transaction.details
        );
        count += 1;
    }
    if count == 0 {
        println!("No transactions recorded yet. Use add to create one.");
    }
}

fn print_summary(summary: &Summary) {
    println!("Transactions:   {}", summary.transactions);
    println!("Total revenue:  {:.2}", summary.total_revenue);
    println!("Total expenses: {:.2}", summary.total_expenses);
    println!("Net income:     {:.2}", summary.net_income);

    for (title, groups) in [
        ("Revenue by category:", &summary.revenue_by_category),
        ("Expenses by category:", &summary.expenses_by_category),
    ] {
        if groups.is_empty() {
            continue;
        }
        println!("{}", title);
        for (category, amount) in groups {
            println!("  {:<15} {:>12.2}", category.name(), amount);
        }
    }

    if !summary.monthly.is_empty() {
        println!("By month:");
        for (month, totals) in &summary.monthly {
            println!(
                "  {}  revenue {:>10.2}  expenses {:>10.2}  net {:>10.2}",
                month,
                totals.revenue,
                totals.expense,
                totals.net()
            );
        }
    }
}
