pub mod csv_file;
pub mod transaction_store;

pub use transaction_store::TransactionStore;
