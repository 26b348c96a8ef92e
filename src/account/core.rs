//! The bank account model and the functions for loading and saving accounts.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer account IDs.
///
/// This is the internal record identifier. Customers refer to accounts by
/// [AccountNumber] instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AccountId(i64);

impl AccountId {
    /// Create a new account ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the account ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The kind of bank account a customer opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// A savings account.
    Savings,
    /// A current (checking) account.
    Current,
}

impl AccountType {
    /// The name used for the account type in the database and in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "savings",
            AccountType::Current => "current",
        }
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "savings" => Ok(AccountType::Savings),
            "current" => Ok(AccountType::Current),
            _ => Err(Error::InvalidAccountType(s.to_owned())),
        }
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The customer facing, system generated identifier of an account, e.g. "KB171234567842".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Wrap a string as an account number.
    ///
    /// The caller should ensure that `account_number` is unique.
    pub fn new_unchecked(account_number: String) -> Self {
        Self(account_number)
    }

    /// The account number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A customer's bank account.
///
/// The balance is never negative and the running totals only ever grow.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The ID of the account in the application database.
    pub id: AccountId,
    /// The customer's display name.
    pub name: String,
    /// The customer's email address, stored in lower case.
    pub email: String,
    /// The customer's phone number.
    pub phone: String,
    /// The kind of account.
    pub account_type: AccountType,
    /// The unique number customers use to refer to the account.
    pub account_number: AccountNumber,
    /// The customer's password hash.
    pub password_hash: PasswordHash,
    /// The amount of money currently in the account.
    pub balance: Decimal,
    /// The sum of all money that has come into the account.
    pub total_deposited: Decimal,
    /// The sum of all money that has left the account.
    pub total_withdrawn: Decimal,
    /// Incremented every time the account is saved.
    ///
    /// Saving an account whose version is out of date fails, see [save_account].
    pub version: i64,
    /// When the account was opened.
    pub created_at: OffsetDateTime,
}

/// The details needed to open a new account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub account_type: AccountType,
    pub account_number: AccountNumber,
    pub password_hash: PasswordHash,
}

/// The view of an account that is safe to send to its owner.
///
/// The password hash and bookkeeping fields are left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub account_type: AccountType,
    pub account_number: AccountNumber,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_deposited: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_withdrawn: Decimal,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            account_type: account.account_type,
            account_number: account.account_number.clone(),
            balance: account.balance,
            total_deposited: account.total_deposited,
            total_withdrawn: account.total_withdrawn,
        }
    }
}

/// Create the account table.
///
/// Emails are compared case-insensitively by the unique constraint.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            phone TEXT NOT NULL,
            account_type TEXT NOT NULL,
            account_number TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            balance TEXT NOT NULL,
            total_deposited TEXT NOT NULL,
            total_withdrawn TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

const ACCOUNT_COLUMNS: &str = "id, name, email, phone, account_type, account_number, password, \
    balance, total_deposited, total_withdrawn, version, created_at";

fn get_decimal(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let raw: String = row.get(index)?;

    Decimal::from_str(&raw)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, error.into()))
}

/// Map a row selected with the account columns to an [Account].
pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    let raw_account_type: String = row.get(4)?;
    let account_type = AccountType::from_str(&raw_account_type).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, error.to_string().into())
    })?;
    let raw_password_hash: String = row.get(6)?;

    Ok(Account {
        id: AccountId::new(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        account_type,
        account_number: AccountNumber::new_unchecked(row.get(5)?),
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        balance: get_decimal(row, 7)?,
        total_deposited: get_decimal(row, 8)?,
        total_withdrawn: get_decimal(row, 9)?,
        version: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// Insert a new account with a zero balance into the database.
///
/// # Errors
///
/// Returns:
/// - [Error::DuplicateEmail] if the email is already registered, ignoring case.
/// - [Error::DuplicateAccountNumber] if the account number is already taken.
/// - [Error::SqlError] if an SQL related error occurred.
pub fn insert_account(new_account: NewAccount, connection: &Connection) -> Result<Account, Error> {
    let created_at = OffsetDateTime::now_utc();
    let zero = Decimal::ZERO.to_string();

    connection.execute(
        "INSERT INTO account (name, email, phone, account_type, account_number, password, \
            balance, total_deposited, total_withdrawn, version, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?7, 0, ?8)",
        (
            &new_account.name,
            &new_account.email,
            &new_account.phone,
            new_account.account_type.as_str(),
            new_account.account_number.as_str(),
            new_account.password_hash.as_ref(),
            &zero,
            created_at,
        ),
    )?;

    let id = AccountId::new(connection.last_insert_rowid());

    Ok(Account {
        id,
        name: new_account.name,
        email: new_account.email,
        phone: new_account.phone,
        account_type: new_account.account_type,
        account_number: new_account.account_number,
        password_hash: new_account.password_hash,
        balance: Decimal::ZERO,
        total_deposited: Decimal::ZERO,
        total_withdrawn: Decimal::ZERO,
        version: 0,
        created_at,
    })
}

/// Get the account with the ID `account_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if `account_id` does not belong to an account, or
/// [Error::SqlError] if there was an error trying to access the database.
pub fn get_account_by_id(account_id: AccountId, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = :id"
        ))?
        .query_row(&[(":id", &account_id.as_i64())], map_row_to_account)
        .map_err(|error| error.into())
}

/// Get the account registered with `email`, ignoring case and surrounding whitespace.
///
/// # Errors
///
/// Returns [Error::NotFound] if no account uses the email, or [Error::SqlError]
/// if there was an error trying to access the database.
pub fn get_account_by_email(email: &str, connection: &Connection) -> Result<Account, Error> {
    let email = normalize_email(email);

    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE email = :email"
        ))?
        .query_row(&[(":email", &email)], map_row_to_account)
        .map_err(|error| error.into())
}

/// Get the account matching `key`, either by email (ignoring case) or by
/// exact account number.
///
/// # Errors
///
/// Returns [Error::NotFound] if no account matches, or [Error::SqlError] if
/// there was an error trying to access the database.
pub fn get_account_by_email_or_account_number(
    key: &str,
    connection: &Connection,
) -> Result<Account, Error> {
    let key = key.trim();

    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account \
            WHERE email = :email OR account_number = :account_number"
        ))?
        .query_row(
            &[(":email", &normalize_email(key)), (":account_number", &key.to_owned())],
            map_row_to_account,
        )
        .map_err(|error| error.into())
}

/// Check whether an account already uses `account_number`.
pub fn account_number_exists(account_number: &str, connection: &Connection) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM account WHERE account_number = ?1)",
            (account_number,),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Write the mutable fields of `account` back to the database.
///
/// The write only succeeds if the stored version still equals
/// `account.version`, i.e. nobody saved the account since it was loaded.
/// Returns the account with its new version.
///
/// # Errors
///
/// Returns:
/// - [Error::StaleAccount] if the account was saved by someone else in the meantime.
/// - [Error::NotFound] if the account does not exist.
/// - [Error::SqlError] if an SQL related error occurred.
pub fn save_account(account: &Account, connection: &Connection) -> Result<Account, Error> {
    let rows_affected = connection.execute(
        "UPDATE account
        SET name = ?1, phone = ?2, password = ?3, balance = ?4, total_deposited = ?5,
            total_withdrawn = ?6, version = version + 1
        WHERE id = ?7 AND version = ?8",
        (
            &account.name,
            &account.phone,
            account.password_hash.as_ref(),
            account.balance.to_string(),
            account.total_deposited.to_string(),
            account.total_withdrawn.to_string(),
            account.id.as_i64(),
            account.version,
        ),
    )?;

    if rows_affected == 0 {
        let exists: bool = connection.query_row(
            "SELECT EXISTS(SELECT 1 FROM account WHERE id = ?1)",
            (account.id.as_i64(),),
            |row| row.get(0),
        )?;

        return Err(if exists {
            tracing::warn!(
                "Account {} changed since version {} was loaded",
                account.id,
                account.version
            );
            Error::StaleAccount
        } else {
            Error::NotFound
        });
    }

    Ok(Account {
        version: account.version + 1,
        ..account.clone()
    })
}

/// Lower-case and trim an email address so that it can be compared with stored emails.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod account_tests {
    use rust_decimal::Decimal;
    use std::str::FromStr;

    use crate::{
        Error, PasswordHash,
        account::{
            AccountId, AccountNumber, AccountType, AccountView, account_number_exists,
            get_account_by_email, get_account_by_email_or_account_number, get_account_by_id,
            insert_account, save_account,
        },
        test_utils::{get_test_connection, new_account},
    };

    #[test]
    fn insert_account_starts_with_zero_balances() {
        let connection = get_test_connection();

        let account = insert_account(new_account("a@x.com", "KB000000000001"), &connection).unwrap();

        assert!(account.id.as_i64() > 0);
        assert_eq!(account.balance, Decimal::ZERO);
        assert_eq!(account.total_deposited, Decimal::ZERO);
        assert_eq!(account.total_withdrawn, Decimal::ZERO);
        assert_eq!(account.version, 0);
    }

    #[test]
    fn insert_account_fails_on_duplicate_email_ignoring_case() {
        let connection = get_test_connection();
        insert_account(new_account("a@x.com", "KB000000000001"), &connection).unwrap();

        let result = insert_account(new_account("A@X.com", "KB000000000002"), &connection);

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn insert_account_fails_on_duplicate_account_number() {
        let connection = get_test_connection();
        insert_account(new_account("a@x.com", "KB000000000001"), &connection).unwrap();

        let result = insert_account(new_account("b@x.com", "KB000000000001"), &connection);

        assert_eq!(result, Err(Error::DuplicateAccountNumber));
    }

    #[test]
    fn get_account_by_id_round_trips() {
        let connection = get_test_connection();
        let account = insert_account(new_account("a@x.com", "KB000000000001"), &connection).unwrap();

        let got = get_account_by_id(account.id, &connection).unwrap();

        assert_eq!(got, account);
    }

    #[test]
    fn get_account_by_id_fails_with_non_existent_id() {
        let connection = get_test_connection();

        assert_eq!(
            get_account_by_id(AccountId::new(42), &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn get_account_by_email_ignores_case_and_whitespace() {
        let connection = get_test_connection();
        let account = insert_account(new_account("a@x.com", "KB000000000001"), &connection).unwrap();

        let got = get_account_by_email("  A@X.COM ", &connection).unwrap();

        assert_eq!(got.id, account.id);
    }

    #[test]
    fn recipient_lookup_matches_email_or_account_number() {
        let connection = get_test_connection();
        let account = insert_account(new_account("a@x.com", "KB000000000001"), &connection).unwrap();

        let by_email = get_account_by_email_or_account_number("A@x.com", &connection).unwrap();
        let by_number =
            get_account_by_email_or_account_number("KB000000000001", &connection).unwrap();

        assert_eq!(by_email.id, account.id);
        assert_eq!(by_number.id, account.id);
    }

    #[test]
    fn recipient_lookup_requires_exact_account_number() {
        let connection = get_test_connection();
        insert_account(new_account("a@x.com", "KB000000000001"), &connection).unwrap();

        assert_eq!(
            get_account_by_email_or_account_number("kb000000000001", &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn account_number_exists_reports_taken_numbers() {
        let connection = get_test_connection();
        insert_account(new_account("a@x.com", "KB000000000001"), &connection).unwrap();

        assert!(account_number_exists("KB000000000001", &connection).unwrap());
        assert!(!account_number_exists("KB000000000002", &connection).unwrap());
    }

    #[test]
    fn save_account_persists_changes_and_bumps_version() {
        let connection = get_test_connection();
        let mut account =
            insert_account(new_account("a@x.com", "KB000000000001"), &connection).unwrap();
        account.balance = Decimal::from_str("12.50").unwrap();
        account.total_deposited = Decimal::from_str("12.50").unwrap();
        account.name = "Asha K".to_owned();

        let saved = save_account(&account, &connection).unwrap();
        let got = get_account_by_id(account.id, &connection).unwrap();

        assert_eq!(saved.version, 1);
        assert_eq!(got, saved);
    }

    #[test]
    fn save_account_rejects_stale_version() {
        let connection = get_test_connection();
        let account = insert_account(new_account("a@x.com", "KB000000000001"), &connection).unwrap();
        let mut first_copy = account.clone();
        let mut second_copy = account.clone();

        first_copy.balance = Decimal::from(10);
        save_account(&first_copy, &connection).unwrap();
        second_copy.balance = Decimal::from(20);
        let result = save_account(&second_copy, &connection);

        assert_eq!(result, Err(Error::StaleAccount));
        let got = get_account_by_id(account.id, &connection).unwrap();
        assert_eq!(got.balance, Decimal::from(10));
    }

    #[test]
    fn save_account_fails_for_missing_account() {
        let connection = get_test_connection();
        let mut account =
            insert_account(new_account("a@x.com", "KB000000000001"), &connection).unwrap();
        account.id = AccountId::new(999);

        assert_eq!(save_account(&account, &connection), Err(Error::NotFound));
    }

    #[test]
    fn view_leaves_out_password_hash() {
        let connection = get_test_connection();
        let account = insert_account(new_account("a@x.com", "KB000000000001"), &connection).unwrap();

        let json = serde_json::to_value(AccountView::from(&account)).unwrap();

        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["accountNumber"], "KB000000000001");
        assert_eq!(json["accountType"], "savings");
        assert_eq!(json["balance"], 0.0);
    }

    #[test]
    fn account_type_parses_ignoring_case() {
        assert_eq!("Savings".parse::<AccountType>(), Ok(AccountType::Savings));
        assert_eq!(" CURRENT ".parse::<AccountType>(), Ok(AccountType::Current));
        assert_eq!(
            "checking".parse::<AccountType>(),
            Err(Error::InvalidAccountType("checking".to_owned()))
        );
    }

    #[test]
    fn account_number_displays_as_plain_string() {
        let number = AccountNumber::new_unchecked("KB123".to_owned());

        assert_eq!(number.to_string(), "KB123");
        assert_eq!(serde_json::to_value(&number).unwrap(), "KB123");
    }

    #[test]
    fn hashed_password_is_stored() {
        let connection = get_test_connection();
        let mut details = new_account("a@x.com", "KB000000000001");
        details.password_hash = PasswordHash::from_raw_password("secret1", 4).unwrap();

        let account = insert_account(details, &connection).unwrap();
        let got = get_account_by_id(account.id, &connection).unwrap();

        assert!(got.password_hash.verify("secret1").unwrap());
    }
}
