//! The profile manager: viewing and editing the logged-in customer's details
//! and changing their password.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use axum_extra::extract::WithRejection;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    account::{Account, AccountId, AccountView, get_account_by_id, save_account},
    auth::UserResponse,
};

/// The state needed to view and edit profiles.
#[derive(Debug, Clone)]
pub struct ProfileState {
    /// The bcrypt cost for hashing new passwords.
    pub password_hash_cost: u32,
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            password_hash_cost: state.password_hash_cost,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The fields of a profile that a customer may change.
///
/// Missing or blank fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// The data submitted to change a password.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

/// The response body for a successful profile update.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileUpdateResponse {
    pub message: String,
    pub user: AccountView,
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Apply the provided, non-blank fields of `update` to `account`.
///
/// The email and account number are never changed.
pub fn apply_profile_update(account: &Account, update: &ProfileUpdate) -> Account {
    let mut updated = account.clone();

    if let Some(name) = non_blank(&update.name) {
        updated.name = name.to_owned();
    }

    if let Some(phone) = non_blank(&update.phone) {
        updated.phone = phone.to_owned();
    }

    updated
}

/// Update the name and phone of the account `account_id`.
///
/// # Errors
///
/// Returns:
/// - [Error::NotFound] if the account does not exist.
/// - [Error::StaleAccount] if the account was modified concurrently.
/// - [Error::SqlError] if an SQL related error occurred.
pub fn update_profile(
    account_id: AccountId,
    update: &ProfileUpdate,
    connection: &Connection,
) -> Result<Account, Error> {
    let account = get_account_by_id(account_id, connection)?;

    if update.name.is_none() && update.phone.is_none() {
        return Ok(account);
    }

    save_account(&apply_profile_update(&account, update), connection)
}

/// Check the fields of a password change.
///
/// Returns the current password and the validated new password.
///
/// # Errors
///
/// Returns:
/// - [Error::MissingFields] if any field is missing or empty.
/// - [Error::PasswordTooShort] if the new password is too short.
/// - [Error::PasswordMismatch] if the new password and its confirmation differ.
pub fn validate_password_change(change: &PasswordChange) -> Result<(&str, ValidatedPassword), Error> {
    let (Some(current_password), Some(new_password), Some(confirm_password)) = (
        change.current_password.as_deref().filter(|p| !p.is_empty()),
        change.new_password.as_deref().filter(|p| !p.is_empty()),
        change.confirm_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(Error::MissingFields("all password fields are required"));
    };

    let validated_password = ValidatedPassword::new(new_password)?;

    if new_password != confirm_password {
        return Err(Error::PasswordMismatch);
    }

    Ok((current_password, validated_password))
}

/// Check `current_password` against `account` and hash `new_password`.
///
/// Returns the account with the new password hash, ready to be saved.
///
/// # Errors
///
/// Returns [Error::IncorrectPassword] if `current_password` is wrong, or
/// [Error::HashingError] if a password could not be hashed or checked.
pub fn change_password(
    account: &Account,
    current_password: &str,
    new_password: ValidatedPassword,
    password_hash_cost: u32,
) -> Result<Account, Error> {
    let is_current_password = account
        .password_hash
        .verify(current_password)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !is_current_password {
        return Err(Error::IncorrectPassword);
    }

    Ok(Account {
        password_hash: PasswordHash::new(new_password, password_hash_cost)?,
        ..account.clone()
    })
}

fn lock(
    db_connection: &Mutex<Connection>,
) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

/// A route handler for getting the logged-in customer's profile.
pub async fn get_profile(
    State(state): State<ProfileState>,
    Extension(account_id): Extension<AccountId>,
) -> Result<Json<UserResponse>, Error> {
    let account = get_account_by_id(account_id, &*lock(&state.db_connection)?)?;

    Ok(Json(UserResponse {
        user: AccountView::from(&account),
    }))
}

/// A route handler for updating the logged-in customer's name and phone.
pub async fn update_profile_endpoint(
    State(state): State<ProfileState>,
    Extension(account_id): Extension<AccountId>,
    WithRejection(Json(update), _): WithRejection<Json<ProfileUpdate>, Error>,
) -> Result<Json<ProfileUpdateResponse>, Error> {
    let account = update_profile(account_id, &update, &*lock(&state.db_connection)?)?;

    Ok(Json(ProfileUpdateResponse {
        message: "Profile updated successfully".to_owned(),
        user: AccountView::from(&account),
    }))
}

/// A route handler for changing the logged-in customer's password.
///
/// The password checks and hashing happen without holding the database lock.
/// If the account changed in the meantime the request fails with a conflict.
pub async fn change_password_endpoint(
    State(state): State<ProfileState>,
    Extension(account_id): Extension<AccountId>,
    WithRejection(Json(change), _): WithRejection<Json<PasswordChange>, Error>,
) -> Result<Json<Value>, Error> {
    let (current_password, new_password) = validate_password_change(&change)?;

    let account = get_account_by_id(account_id, &*lock(&state.db_connection)?)?;
    let account = change_password(
        &account,
        current_password,
        new_password,
        state.password_hash_cost,
    )?;
    save_account(&account, &*lock(&state.db_connection)?)?;

    tracing::info!("Account {account_id} changed their password");

    Ok(Json(json!({ "message": "Password changed successfully" })))
}


#[cfg(test)]
mod profile_endpoint_tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        auth::UserResponse,
        endpoints,
        profile::ProfileUpdateResponse,
        test_utils::{TEST_PASSWORD, assert_error, log_in_as, new_test_server, register_customer},
    };

    #[tokio::test]
    async fn get_profile_returns_account() {
        let server = new_test_server();
        register_customer(&server, "Asha", "asha@example.com").await;
        let cookie = log_in_as(&server, "asha@example.com").await;

        let response = server.get(endpoints::PROFILE).add_cookie(cookie).await;

        response.assert_status_ok();
        assert_eq!(response.json::<UserResponse>().user.name, "Asha");
    }

    #[tokio::test]
    async fn update_profile_ignores_email() {
        let server = new_test_server();
        register_customer(&server, "Asha", "asha@example.com").await;
        let cookie = log_in_as(&server, "asha@example.com").await;

        let response = server
            .put(endpoints::PROFILE)
            .add_cookie(cookie)
            .json(&json!({ "name": "Asha Rao", "email": "evil@example.com" }))
            .await;

        response.assert_status_ok();
        let body = response.json::<ProfileUpdateResponse>();
        assert_eq!(body.message, "Profile updated successfully");
        assert_eq!(body.user.name, "Asha Rao");
        assert_eq!(body.user.email, "asha@example.com");
    }

    #[tokio::test]
    async fn change_password_with_wrong_current_password_is_unauthorized() {
        let server = new_test_server();
        register_customer(&server, "Asha", "asha@example.com").await;
        let cookie = log_in_as(&server, "asha@example.com").await;

        let response = server
            .put(endpoints::CHANGE_PASSWORD)
            .add_cookie(cookie)
            .json(&json!({
                "currentPassword": "wrongpassword",
                "newPassword": "newsecret",
                "confirmPassword": "newsecret",
            }))
            .await;

        assert_error(
            &response,
            StatusCode::UNAUTHORIZED,
            "authentication_error",
            "Current password is incorrect",
        );
    }

    #[tokio::test]
    async fn changed_password_is_used_for_log_in() {
        let server = new_test_server();
        register_customer(&server, "Asha", "asha@example.com").await;
        let cookie = log_in_as(&server, "asha@example.com").await;

        let response = server
            .put(endpoints::CHANGE_PASSWORD)
            .add_cookie(cookie)
            .json(&json!({
                "currentPassword": TEST_PASSWORD,
                "newPassword": "newsecret",
                "confirmPassword": "newsecret",
            }))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "message": "Password changed successfully" }));

        server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "asha@example.com", "password": TEST_PASSWORD }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "asha@example.com", "password": "newsecret" }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn change_password_with_mismatch_is_bad_request() {
        let server = new_test_server();
        register_customer(&server, "Asha", "asha@example.com").await;
        let cookie = log_in_as(&server, "asha@example.com").await;

        let response = server
            .put(endpoints::CHANGE_PASSWORD)
            .add_cookie(cookie)
            .json(&json!({
                "currentPassword": TEST_PASSWORD,
                "newPassword": "newsecret",
                "confirmPassword": "newsecret2",
            }))
            .await;

        assert_error(
            &response,
            StatusCode::BAD_REQUEST,
            "validation_error",
            "Passwords do not match",
        );
    }
}
