//! Deposits, withdrawals and transfers against the database.
//!
//! Each operation runs inside a single SQLite transaction: the accounts are
//! loaded, the balance rules applied, the accounts saved with their expected
//! version and the transaction records appended. Nothing is written unless
//! every step succeeds.

use rusqlite::Connection;

use crate::{
    Error,
    account::{Account, AccountId, get_account_by_email_or_account_number, get_account_by_id, save_account},
    ledger::{Amount, apply_deposit, apply_transfer, apply_withdrawal},
    transaction::{NewTransaction, record_transaction},
};

/// Deposit `amount` into the account `account_id` and record the deposit.
///
/// Returns the updated account.
///
/// # Errors
///
/// Returns:
/// - [Error::NotFound] if the account does not exist.
/// - [Error::BalanceOverflow] if the new balance cannot be represented.
/// - [Error::StaleAccount] if the account was modified concurrently.
/// - [Error::SqlError] if an SQL related error occurred.
pub fn deposit(
    account_id: AccountId,
    amount: Amount,
    connection: &mut Connection,
) -> Result<Account, Error> {
    let transaction = connection.transaction()?;

    let account = get_account_by_id(account_id, &transaction)?;
    let account = save_account(&apply_deposit(&account, amount)?, &transaction)?;
    record_transaction(NewTransaction::deposit(account.id, amount), &transaction)?;

    transaction.commit()?;
    tracing::debug!("Deposited {} into account {}", amount.as_decimal(), account.id);

    Ok(account)
}

/// Withdraw `amount` from the account `account_id` and record the withdrawal.
///
/// Returns the updated account.
///
/// # Errors
///
/// Returns:
/// - [Error::NotFound] if the account does not exist.
/// - [Error::InsufficientFunds] if `amount` is greater than the balance.
/// - [Error::StaleAccount] if the account was modified concurrently.
/// - [Error::SqlError] if an SQL related error occurred.
pub fn withdraw(
    account_id: AccountId,
    amount: Amount,
    connection: &mut Connection,
) -> Result<Account, Error> {
    let transaction = connection.transaction()?;

    let account = get_account_by_id(account_id, &transaction)?;
    let account = save_account(&apply_withdrawal(&account, amount)?, &transaction)?;
    record_transaction(NewTransaction::withdrawal(account.id, amount), &transaction)?;

    transaction.commit()?;
    tracing::debug!("Withdrew {} from account {}", amount.as_decimal(), account.id);

    Ok(account)
}

/// Send `amount` from the account `sender_id` to the account identified by
/// `recipient_key`, an email address or account number.
///
/// Both balances are saved before the pair of transaction records is written.
/// If saving the recipient fails, the sender's debit is rolled back.
///
/// Returns the updated sender.
///
/// # Errors
///
/// Returns:
/// - [Error::RecipientNotFound] if no account matches `recipient_key`.
/// - [Error::SelfTransfer] if the recipient is the sender.
/// - [Error::InsufficientFunds] if `amount` is greater than the sender's balance.
/// - [Error::StaleAccount] if either account was modified concurrently.
/// - [Error::NotFound] if the sender does not exist.
/// - [Error::SqlError] if an SQL related error occurred.
pub fn transfer(
    sender_id: AccountId,
    recipient_key: &str,
    amount: Amount,
    connection: &mut Connection,
) -> Result<Account, Error> {
    let transaction = connection.transaction()?;

    let sender = get_account_by_id(sender_id, &transaction)?;
    let recipient = match get_account_by_email_or_account_number(recipient_key, &transaction) {
        Ok(recipient) => recipient,
        Err(Error::NotFound) => return Err(Error::RecipientNotFound),
        Err(error) => return Err(error),
    };

    let (sender, recipient) = apply_transfer(&sender, &recipient, amount)?;
    let sender = save_account(&sender, &transaction)?;
    let recipient = save_account(&recipient, &transaction)?;

    for record in NewTransaction::transfer_pair(&sender, &recipient, amount) {
        record_transaction(record, &transaction)?;
    }

    transaction.commit()?;
    tracing::debug!(
        "Transferred {} from account {} to account {}",
        amount.as_decimal(),
        sender.id,
        recipient.id
    );

    Ok(sender)
}
