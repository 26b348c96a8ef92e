use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    account::{AccountId, AccountView, get_account_by_id},
};

/// The state needed to look up the logged-in customer.
#[derive(Debug, Clone)]
pub struct CurrentUserState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CurrentUserState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The response body holding a customer's account.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: AccountView,
}

/// Get the account of the logged-in customer.
///
/// # Errors
///
/// Returns [Error::Unauthenticated] if the session refers to an account that
/// no longer exists.
pub async fn get_current_user(
    State(state): State<CurrentUserState>,
    Extension(account_id): Extension<AccountId>,
) -> Result<Json<UserResponse>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let account = match get_account_by_id(account_id, &connection) {
        Ok(account) => account,
        Err(Error::NotFound) => {
            tracing::warn!("Session refers to missing account {account_id}");
            return Err(Error::Unauthenticated);
        }
        Err(error) => return Err(error),
    };

    Ok(Json(UserResponse {
        user: AccountView::from(&account),
    }))
}
