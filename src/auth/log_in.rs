//! Handles log-in requests.
//! The cookie module handles the lower level session cookie logic.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use axum_extra::extract::{PrivateCookieJar, WithRejection, cookie::Key};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    account::{Account, AccountView, get_account_by_email},
    auth::set_auth_cookie,
};

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The data submitted to log in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogInData {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// The response body for a successful log-in.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogInResponse {
    pub message: String,
    pub user: AccountView,
}

/// Check that `password` is the password of `account`.
///
/// # Errors
///
/// Returns [Error::InvalidCredentials] if the password is wrong, or
/// [Error::HashingError] if the stored hash could not be checked.
pub fn verify_credentials(account: &Account, password: &str) -> Result<(), Error> {
    match account.password_hash.verify(password) {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::InvalidCredentials),
        Err(error) => Err(Error::HashingError(error.to_string())),
    }
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in the session cookie is set and the customer's
/// account is returned.
///
/// An unknown email and a wrong password give the same error.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    WithRejection(Json(data), _): WithRejection<Json<LogInData>, Error>,
) -> Result<(PrivateCookieJar, Json<LogInResponse>), Error> {
    let (Some(email), Some(password)) = (
        data.email.as_deref().filter(|email| !email.trim().is_empty()),
        data.password.as_deref().filter(|password| !password.is_empty()),
    ) else {
        return Err(Error::MissingFields("email and password are required"));
    };

    let account = {
        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        match get_account_by_email(email, &connection) {
            Ok(account) => account,
            Err(Error::NotFound) => return Err(Error::InvalidCredentials),
            Err(error) => return Err(error),
        }
    };

    verify_credentials(&account, password)?;

    let jar = set_auth_cookie(jar, account.id, state.cookie_duration)?;
    tracing::info!("Account {} logged in", account.id);

    Ok((
        jar,
        Json(LogInResponse {
            message: "Login successful".to_owned(),
            user: AccountView::from(&account),
        }),
    ))
}
