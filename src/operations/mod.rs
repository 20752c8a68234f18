pub mod add;
pub mod aggregate;
pub mod browse;
pub mod delete_workflow;
pub mod filter;
pub mod import;
pub mod report;
