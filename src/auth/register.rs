//! Opening new accounts.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use email_address::EmailAddress;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    account::{
        Account, AccountId, AccountNumber, AccountType, NewAccount, generate_unique_account_number,
        get_account_by_email, insert_account, normalize_email,
    },
};

/// The details a customer submits to open an account.
///
/// Every field is optional so that missing fields are reported as a
/// validation error rather than a malformed request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// The customer's display name.
    pub name: Option<String>,
    /// The customer's email address.
    pub email: Option<String>,
    /// The customer's phone number.
    pub phone: Option<String>,
    /// "savings" or "current", ignoring case.
    pub account_type: Option<String>,
    /// The password for logging in.
    pub password: Option<String>,
    /// Must equal `password`.
    pub confirm_password: Option<String>,
}

/// A registration that passed validation, with its fields normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRegistration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub account_type: AccountType,
    pub password: ValidatedPassword,
}

fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.trim().is_empty())
}

/// Check that an email address has the form `local@domain.tld`.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) || email.matches('@').count() != 1 {
        return false;
    }

    if !EmailAddress::is_valid(email) {
        return false;
    }

    match email.rsplit_once('@') {
        Some((_, domain)) => {
            domain
                .split('.')
                .filter(|label| !label.is_empty())
                .count()
                >= 2
        }
        None => false,
    }
}

/// Validate and normalize a registration.
///
/// The checks are made in the order: required fields, email format, password
/// length, password confirmation, account type.
///
/// # Errors
///
/// Returns:
/// - [Error::MissingFields] if any field is missing or blank.
/// - [Error::InvalidEmail] if the email is not of the form `local@domain.tld`.
/// - [Error::PasswordTooShort] if the password is too short.
/// - [Error::PasswordMismatch] if the password and its confirmation differ.
/// - [Error::InvalidAccountType] if the account type is not "savings" or "current".
pub fn validate_registration(registration: &Registration) -> Result<ValidRegistration, Error> {
    let (
        Some(name),
        Some(email),
        Some(phone),
        Some(account_type),
        Some(password),
        Some(confirm_password),
    ) = (
        required(&registration.name),
        required(&registration.email),
        required(&registration.phone),
        required(&registration.account_type),
        required(&registration.password),
        required(&registration.confirm_password),
    )
    else {
        return Err(Error::MissingFields("all fields are required"));
    };

    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(Error::InvalidEmail);
    }

    let validated_password = ValidatedPassword::new(password)?;
    if password != confirm_password {
        return Err(Error::PasswordMismatch);
    }

    let account_type = AccountType::from_str(account_type)?;

    Ok(ValidRegistration {
        name: name.trim().to_owned(),
        email,
        phone: phone.trim().to_owned(),
        account_type,
        password: validated_password,
    })
}

/// Open an account for an already validated registration whose password was
/// hashed by the caller.
///
/// A unique account number is generated for the account.
///
/// # Errors
///
/// Returns:
/// - [Error::DuplicateEmail] if the email is already registered, ignoring case.
/// - [Error::AccountNumbersExhausted] if no free account number was found.
/// - [Error::SqlError] if an SQL related error occurred.
pub fn open_account(
    registration: ValidRegistration,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<Account, Error> {
    match get_account_by_email(&registration.email, connection) {
        Ok(_) => return Err(Error::DuplicateEmail),
        Err(Error::NotFound) => {}
        Err(error) => return Err(error),
    }

    let account_number = generate_unique_account_number(connection)?;

    let account = insert_account(
        NewAccount {
            name: registration.name,
            email: registration.email,
            phone: registration.phone,
            account_type: registration.account_type,
            account_number,
            password_hash,
        },
        connection,
    )?;

    tracing::info!(
        "Opened {} account {} for account ID {}",
        account.account_type,
        account.account_number,
        account.id
    );

    Ok(account)
}

/// Validate `registration`, hash its password with `password_hash_cost` and open the account.
///
/// # Errors
///
/// Returns any of the errors from [validate_registration] and [open_account],
/// or [Error::HashingError] if the password could not be hashed.
pub fn register(
    registration: Registration,
    password_hash_cost: u32,
    connection: &Connection,
) -> Result<Account, Error> {
    let registration = validate_registration(&registration)?;
    let password_hash = PasswordHash::new(registration.password.clone(), password_hash_cost)?;

    open_account(registration, password_hash, connection)
}

/// The state needed for opening accounts.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The bcrypt cost for hashing new passwords.
    pub password_hash_cost: u32,
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            password_hash_cost: state.password_hash_cost,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The summary of a newly opened account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredAccount {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub account_number: AccountNumber,
}

/// The response body for a successful registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: RegisteredAccount,
}

/// A route handler for opening a new account, responds with 201 Created.
///
/// The password is hashed before the database lock is taken.
pub async fn register_endpoint(
    State(state): State<RegistrationState>,
    WithRejection(Json(registration), _): WithRejection<Json<Registration>, Error>,
) -> Result<(StatusCode, Json<RegisterResponse>), Error> {
    let registration = validate_registration(&registration)?;
    let password_hash = PasswordHash::new(registration.password.clone(), state.password_hash_cost)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let account = open_account(registration, password_hash, &connection)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Account created successfully".to_owned(),
            user: RegisteredAccount {
                id: account.id,
                name: account.name,
                email: account.email,
                account_number: account.account_number,
            },
        }),
    ))
}


#[cfg(test)]
mod register_tests {
    use rust_decimal::Decimal;

    use crate::{
        Error,
        account::{ACCOUNT_NUMBER_PREFIX, get_account_by_email},
        auth::{Registration, register},
        test_utils::get_test_connection,
    };

    fn registration(email: &str) -> Registration {
        Registration {
            name: Some("Asha".to_owned()),
            email: Some(email.to_owned()),
            phone: Some("0211234567".to_owned()),
            account_type: Some("current".to_owned()),
            password: Some("secret1".to_owned()),
            confirm_password: Some("secret1".to_owned()),
        }
    }

    #[test]
    fn opens_account_with_zero_balances() {
        let connection = get_test_connection();

        let account = register(registration("asha@example.com"), 4, &connection).unwrap();

        assert_eq!(account.balance, Decimal::ZERO);
        assert_eq!(account.total_deposited, Decimal::ZERO);
        assert_eq!(account.total_withdrawn, Decimal::ZERO);
        assert!(account.account_number.as_str().starts_with(ACCOUNT_NUMBER_PREFIX));
        assert!(account.password_hash.verify("secret1").unwrap());
        assert_ne!(account.password_hash.as_ref(), "secret1");
        assert_eq!(get_account_by_email("asha@example.com", &connection), Ok(account));
    }

    #[test]
    fn duplicate_email_is_rejected_ignoring_case() {
        let connection = get_test_connection();
        register(registration("asha@example.com"), 4, &connection).unwrap();

        let result = register(registration("ASHA@example.com"), 4, &connection);

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn account_numbers_are_unique() {
        let connection = get_test_connection();

        let first = register(registration("a@example.com"), 4, &connection).unwrap();
        let second = register(registration("b@example.com"), 4, &connection).unwrap();

        assert_ne!(first.account_number, second.account_number);
    }
}
