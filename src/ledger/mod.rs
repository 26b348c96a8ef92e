//! The account ledger: moving money into, out of and between accounts.
//!
//! This module contains:
//! - The `Amount` type and the parsing of amounts from request bodies
//! - The pure balance rules for deposits, withdrawals and transfers
//! - The database operations that apply the rules and record transactions
//! - The route handlers for the ledger endpoints

mod amount;
mod core;
mod endpoints;
mod service;

pub use amount::Amount;
pub use core::{apply_deposit, apply_transfer, apply_withdrawal};
pub use endpoints::{deposit_endpoint, transfer_endpoint, withdraw_endpoint};
pub use service::{deposit, transfer, withdraw};
