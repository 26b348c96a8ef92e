//! The balance rules for deposits, withdrawals and transfers.
//!
//! These functions only compute the new state of the accounts involved, they
//! do not touch the database. See [crate::ledger::deposit] and friends for
//! the versions that load, save and record.

use crate::{Error, account::Account, ledger::Amount};

/// Credit `amount` to `account`.
///
/// # Errors
///
/// Returns [Error::BalanceOverflow] if the new balance or total cannot be represented.
pub fn apply_deposit(account: &Account, amount: Amount) -> Result<Account, Error> {
    let amount = amount.as_decimal();

    Ok(Account {
        balance: account
            .balance
            .checked_add(amount)
            .ok_or(Error::BalanceOverflow)?,
        total_deposited: account
            .total_deposited
            .checked_add(amount)
            .ok_or(Error::BalanceOverflow)?,
        ..account.clone()
    })
}

/// Debit `amount` from `account`.
///
/// Withdrawing the entire balance is allowed and leaves a balance of exactly zero.
///
/// # Errors
///
/// Returns:
/// - [Error::InsufficientFunds] if `amount` is greater than the balance.
/// - [Error::BalanceOverflow] if the withdrawn total cannot be represented.
pub fn apply_withdrawal(account: &Account, amount: Amount) -> Result<Account, Error> {
    let amount = amount.as_decimal();

    if amount > account.balance {
        return Err(Error::InsufficientFunds);
    }

    Ok(Account {
        balance: account.balance - amount,
        total_withdrawn: account
            .total_withdrawn
            .checked_add(amount)
            .ok_or(Error::BalanceOverflow)?,
        ..account.clone()
    })
}

/// Move `amount` from `sender` to `recipient`.
///
/// Returns the updated sender and recipient, in that order.
///
/// # Errors
///
/// Returns:
/// - [Error::SelfTransfer] if both accounts are the same, whatever the amount.
/// - [Error::InsufficientFunds] if `amount` is greater than the sender's balance.
/// - [Error::BalanceOverflow] if the recipient's new balance cannot be represented.
pub fn apply_transfer(
    sender: &Account,
    recipient: &Account,
    amount: Amount,
) -> Result<(Account, Account), Error> {
    if sender.id == recipient.id {
        return Err(Error::SelfTransfer);
    }

    Ok((
        apply_withdrawal(sender, amount)?,
        apply_deposit(recipient, amount)?,
    ))
}
