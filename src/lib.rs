//! bank_rs is a web service for a small banking demo.
//!
//! Customers register an account, log in, move money in and out of their
//! balance, send money to other customers and review their transaction
//! history. This library provides a JSON REST API that a browser dashboard
//! talks to, with the session held in an encrypted cookie.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod account;
mod app_state;
mod auth;
mod db;
mod endpoints;
mod ledger;
mod logging;
mod not_found;
mod password;
mod profile;
mod routing;
#[cfg(test)]
mod test_utils;
mod transaction;

pub use account::{Account, AccountId, AccountNumber, AccountType, get_account_by_email};
pub use app_state::AppState;
pub use auth::{Registration, register};
pub use db::initialize as initialize_db;
pub use ledger::{Amount, deposit, transfer, withdraw};
pub use logging::logging_middleware;
pub use password::{MIN_PASSWORD_LENGTH, PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use transaction::{TransactionRecord, get_transactions_for_account};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// One or more required fields were missing or blank.
    ///
    /// The string describes which fields are required.
    #[error("{0}")]
    MissingFields(&'static str),

    /// The email address is not of the form `local@domain.tld`.
    #[error("invalid email format")]
    InvalidEmail,

    /// The password has fewer than [MIN_PASSWORD_LENGTH] characters.
    #[error("password must be at least {} characters", MIN_PASSWORD_LENGTH)]
    PasswordTooShort,

    /// The password and its confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// The account type is not one of the supported account types.
    #[error("\"{0}\" is not a valid account type, expected \"savings\" or \"current\"")]
    InvalidAccountType(String),

    /// The amount was missing, not a number, or not greater than zero.
    #[error("please enter a valid positive amount")]
    InvalidAmount,

    /// The request body could not be parsed.
    #[error("could not parse the request body: {0}")]
    MalformedRequest(String),

    /// The email address is already used by another account.
    #[error("email already registered")]
    DuplicateEmail,

    /// The email/password combination did not match a registered account.
    ///
    /// The same error is used for an unknown email and a wrong password so
    /// that clients cannot probe for registered email addresses.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The current password given when changing password was wrong.
    #[error("current password is incorrect")]
    IncorrectPassword,

    /// The request did not carry a valid, unexpired session cookie.
    #[error("not logged in")]
    Unauthenticated,

    /// No account matched the email address or account number of a transfer recipient.
    #[error("recipient not found")]
    RecipientNotFound,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The account balance is lower than the amount to withdraw or transfer.
    #[error("insufficient balance")]
    InsufficientFunds,

    /// The recipient of a transfer is the sender.
    #[error("cannot transfer to yourself")]
    SelfTransfer,

    /// Applying the amount would exceed the range of representable balances.
    #[error("the amount is too large for this account")]
    BalanceOverflow,

    /// The account was modified by another request after it was loaded.
    ///
    /// The client may retry the request.
    #[error("the account was modified by another request, please try again")]
    StaleAccount,

    /// The account number generated for a new account is already taken.
    #[error("the account number already exists in the database")]
    DuplicateAccountNumber,

    /// No free account number was found within the attempt limit.
    #[error("could not generate a unique account number")]
    AccountNumbersExhausted,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The session token could not be created.
    #[error("could not create the session token: {0}")]
    TokenError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

/// The broad class of an [Error], as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed, missing or out-of-range input.
    Validation,
    /// Bad credentials or a missing session.
    Authentication,
    /// A referenced resource does not exist.
    NotFound,
    /// The request is well-formed but breaks a ledger rule.
    BusinessRule,
    /// The request raced with another modification of the same account.
    Conflict,
    /// Anything the client cannot fix.
    Internal,
}

impl ErrorKind {
    /// The machine readable code sent in the `error` field of error responses.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Authentication => "authentication_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::BusinessRule => "business_rule_error",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal_error",
        }
    }

    /// The HTTP status code for errors of this kind.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::Validation | ErrorKind::BusinessRule => StatusCode::BAD_REQUEST,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingFields(_)
            | Error::InvalidEmail
            | Error::PasswordTooShort
            | Error::PasswordMismatch
            | Error::InvalidAccountType(_)
            | Error::InvalidAmount
            | Error::MalformedRequest(_)
            | Error::DuplicateEmail => ErrorKind::Validation,
            Error::InvalidCredentials | Error::IncorrectPassword | Error::Unauthenticated => {
                ErrorKind::Authentication
            }
            Error::RecipientNotFound | Error::NotFound => ErrorKind::NotFound,
            Error::InsufficientFunds | Error::SelfTransfer | Error::BalanceOverflow => {
                ErrorKind::BusinessRule
            }
            Error::StaleAccount => ErrorKind::Conflict,
            Error::DuplicateAccountNumber
            | Error::AccountNumbersExhausted
            | Error::HashingError(_)
            | Error::TokenError(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError => ErrorKind::Internal,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("account.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("account.account_number") =>
            {
                Error::DuplicateAccountNumber
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::MalformedRequest(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();

        let message = match kind {
            // Internal errors are not intended to be shown to the client.
            ErrorKind::Internal => {
                tracing::error!("An unexpected error occurred: {}", self);
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            _ => capitalize(&self.to_string()),
        };

        (
            kind.status(),
            Json(json!({
                "error": kind.code(),
                "message": message,
            })),
        )
            .into_response()
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
