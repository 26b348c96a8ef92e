#![allow(missing_docs)]

use axum::http::StatusCode;
use axum_extra::extract::cookie::Cookie;
use axum_test::{TestResponse, TestServer};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    AppState, PasswordHash,
    account::{AccountNumber, AccountType, NewAccount},
    auth::COOKIE_TOKEN,
    build_router, endpoints,
    initialize_db,
};

/// The bcrypt cost used in tests, the lowest bcrypt allows.
pub(crate) const TEST_HASH_COST: u32 = 4;
/// The password of every customer registered with [register_customer].
pub(crate) const TEST_PASSWORD: &str = "secret1";

/// An initialized in-memory database.
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    initialize_db(&connection).expect("Could not initialize database.");
    connection
}

/// The details for a savings account with a placeholder password hash.
pub(crate) fn new_account(email: &str, account_number: &str) -> NewAccount {
    NewAccount {
        name: "Test Customer".to_owned(),
        email: email.to_owned(),
        phone: "0210000000".to_owned(),
        account_type: AccountType::Savings,
        account_number: AccountNumber::new_unchecked(account_number.to_owned()),
        password_hash: PasswordHash::new_unchecked("hunter2"),
    }
}

pub(crate) fn get_test_state() -> AppState {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");

    AppState::new(connection, "42", TEST_HASH_COST).expect("Could not create app state.")
}

pub(crate) fn new_test_server() -> TestServer {
    TestServer::new(build_router(get_test_state()))
}

/// Register a savings account for `name` with the password [TEST_PASSWORD].
pub(crate) async fn register_customer(server: &TestServer, name: &str, email: &str) {
    server
        .post(endpoints::REGISTER)
        .json(&json!({
            "name": name,
            "email": email,
            "phone": "0211234567",
            "accountType": "savings",
            "password": TEST_PASSWORD,
            "confirmPassword": TEST_PASSWORD,
        }))
        .await
        .assert_status(StatusCode::CREATED);
}

/// Log in as the customer registered with `email` and return the session cookie.
pub(crate) async fn log_in_as(server: &TestServer, email: &str) -> Cookie<'static> {
    let response = server
        .post(endpoints::LOG_IN)
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .await;

    response.assert_status_ok();
    response.cookie(COOKIE_TOKEN)
}

/// Assert that `response` is a JSON error of the given status, category and message.
#[track_caller]
pub(crate) fn assert_error(
    response: &TestResponse,
    status: StatusCode,
    error: &str,
    message: &str,
) {
    response.assert_status(status);
    assert_eq!(
        response.json::<Value>(),
        json!({ "error": error, "message": message })
    );
}
