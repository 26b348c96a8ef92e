//! The transaction recorder.
//!
//! This module contains everything related to transaction records:
//! - The `TransactionRecord` model and `NewTransaction` for describing ledger changes
//! - Database functions for appending records and reading an account's history
//! - The route handler for the transaction history

mod core;
mod history_endpoint;

pub use core::{
    Direction, NewTransaction, TransactionId, TransactionRecord, TransactionStatus,
    TransactionType, create_transaction_table, get_transactions_for_account, record_transaction,
};
pub use history_endpoint::get_transactions_endpoint;

#[cfg(test)]
pub use core::count_transactions;
