//! The audit record written for every change to an account balance.

use std::str::FromStr;

use rusqlite::{Connection, Row, types::Type};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    account::{Account, AccountId, AccountNumber},
    ledger::Amount,
};

/// Alias for the integer type used for transaction record IDs.
pub type TransactionId = i64;

/// What caused the balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money paid into the account.
    Deposit,
    /// Money taken out of the account.
    Withdraw,
    /// Money sent to or received from another account.
    Transfer,
}

impl TransactionType {
    fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
            TransactionType::Transfer => "transfer",
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionType::Deposit),
            "withdraw" => Ok(TransactionType::Withdraw),
            "transfer" => Ok(TransactionType::Transfer),
            other => Err(format!("unknown transaction type \"{other}\"")),
        }
    }
}

/// Whether money came into the account (credit) or left it (debit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money came into the account.
    Credit,
    /// Money left the account.
    Debit,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Credit => "credit",
            Direction::Debit => "debit",
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Direction::Credit),
            "debit" => Ok(Direction::Debit),
            other => Err(format!("unknown direction \"{other}\"")),
        }
    }
}

/// The status of a transaction. Every recorded transaction has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// The transaction was applied to the balance.
    Completed,
}

/// The other side of a transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct Counterparty {
    pub email: String,
    pub account_number: AccountNumber,
}

impl From<&Account> for Counterparty {
    fn from(account: &Account) -> Self {
        Self {
            email: account.email.clone(),
            account_number: account.account_number.clone(),
        }
    }
}

/// A transaction that has not been written to the database yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub transaction_type: TransactionType,
    pub direction: Direction,
    pub amount: Amount,
    pub counterparty: Option<Counterparty>,
}

impl NewTransaction {
    /// The record of a deposit into `account_id`.
    pub fn deposit(account_id: AccountId, amount: Amount) -> Self {
        Self {
            account_id,
            transaction_type: TransactionType::Deposit,
            direction: Direction::Credit,
            amount,
            counterparty: None,
        }
    }

    /// The record of a withdrawal from `account_id`.
    pub fn withdrawal(account_id: AccountId, amount: Amount) -> Self {
        Self {
            account_id,
            transaction_type: TransactionType::Withdraw,
            direction: Direction::Debit,
            amount,
            counterparty: None,
        }
    }

    /// The pair of records for a transfer from `sender` to `recipient`.
    ///
    /// The first record debits the sender and names the recipient, the second
    /// credits the recipient and names the sender.
    pub fn transfer_pair(sender: &Account, recipient: &Account, amount: Amount) -> [Self; 2] {
        [
            Self {
                account_id: sender.id,
                transaction_type: TransactionType::Transfer,
                direction: Direction::Debit,
                amount,
                counterparty: Some(Counterparty::from(recipient)),
            },
            Self {
                account_id: recipient.id,
                transaction_type: TransactionType::Transfer,
                direction: Direction::Credit,
                amount,
                counterparty: Some(Counterparty::from(sender)),
            },
        ]
    }
}

/// An immutable entry in an account's transaction history.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// The ID of the record in the application database.
    pub id: TransactionId,
    /// The account whose history the record belongs to.
    pub account_id: AccountId,
    /// Whether the record is a deposit, withdrawal or transfer.
    pub transaction_type: TransactionType,
    /// Whether money came into or left the account.
    pub direction: Direction,
    /// The amount moved, always greater than zero.
    pub amount: Decimal,
    /// The email of the other side of a transfer.
    pub counterparty_email: Option<String>,
    /// The account number of the other side of a transfer.
    pub counterparty_account_number: Option<String>,
    /// The status of the transaction.
    pub status: TransactionStatus,
    /// When the transaction was recorded.
    pub date: OffsetDateTime,
}

/// Create the transaction table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account_transaction (
            id INTEGER PRIMARY KEY,
            account_id INTEGER NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('deposit', 'withdraw', 'transfer')),
            direction TEXT NOT NULL CHECK (direction IN ('credit', 'debit')),
            amount TEXT NOT NULL,
            counterparty_email TEXT,
            counterparty_account_number TEXT,
            status TEXT NOT NULL DEFAULT 'completed',
            date TEXT NOT NULL,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    // Speed up fetching an account's history, newest first.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_account_transaction_account_date
        ON account_transaction(account_id, date DESC)",
        (),
    )?;

    Ok(())
}

/// Append a completed transaction to the history, timestamped with the current time.
///
/// Callers must only record a transaction after the balance change it
/// describes has been saved.
///
/// # Errors
///
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn record_transaction(
    transaction: NewTransaction,
    connection: &Connection,
) -> Result<TransactionRecord, Error> {
    let date = OffsetDateTime::now_utc();
    let (counterparty_email, counterparty_account_number) = match transaction.counterparty {
        Some(counterparty) => (
            Some(counterparty.email),
            Some(counterparty.account_number.to_string()),
        ),
        None => (None, None),
    };

    connection.execute(
        "INSERT INTO account_transaction
            (account_id, type, direction, amount, counterparty_email,
            counterparty_account_number, status, date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'completed', ?7)",
        (
            transaction.account_id.as_i64(),
            transaction.transaction_type.as_str(),
            transaction.direction.as_str(),
            transaction.amount.as_decimal().to_string(),
            &counterparty_email,
            &counterparty_account_number,
            date,
        ),
    )?;

    Ok(TransactionRecord {
        id: connection.last_insert_rowid(),
        account_id: transaction.account_id,
        transaction_type: transaction.transaction_type,
        direction: transaction.direction,
        amount: transaction.amount.as_decimal(),
        counterparty_email,
        counterparty_account_number,
        status: TransactionStatus::Completed,
        date,
    })
}

fn parse_column<T>(row: &Row, index: usize) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: ToString,
{
    let raw: String = row.get(index)?;

    raw.parse().map_err(|error: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, error.to_string().into())
    })
}

fn map_transaction_row(row: &Row) -> Result<TransactionRecord, rusqlite::Error> {
    Ok(TransactionRecord {
        id: row.get(0)?,
        account_id: AccountId::new(row.get(1)?),
        transaction_type: parse_column(row, 2)?,
        direction: parse_column(row, 3)?,
        amount: parse_column(row, 4)?,
        counterparty_email: row.get(5)?,
        counterparty_account_number: row.get(6)?,
        status: TransactionStatus::Completed,
        date: row.get(7)?,
    })
}

/// Get every transaction recorded for `account_id`, newest first.
///
/// Transactions recorded within the same instant are ordered by when they were inserted.
///
/// # Errors
///
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn get_transactions_for_account(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<TransactionRecord>, Error> {
    connection
        .prepare(
            "SELECT id, account_id, type, direction, amount, counterparty_email,
                counterparty_account_number, date
            FROM account_transaction
            WHERE account_id = :account_id
            ORDER BY date DESC, id DESC",
        )?
        .query_map(&[(":account_id", &account_id.as_i64())], map_transaction_row)?
        .map(|maybe_record| maybe_record.map_err(Error::from))
        .collect()
}

/// Count the transactions recorded for `account_id`.
#[cfg(test)]
pub fn count_transactions(account_id: AccountId, connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM account_transaction WHERE account_id = ?1",
            (account_id.as_i64(),),
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count as usize)
        .map_err(|error| error.into())
}
