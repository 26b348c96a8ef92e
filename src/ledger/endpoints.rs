//! Route handlers for depositing, withdrawing and transferring money.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use axum_extra::extract::WithRejection;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    AppState, Error,
    account::AccountId,
    ledger::{Amount, deposit, transfer, withdraw},
};

/// The state needed to change account balances.
#[derive(Debug, Clone)]
pub struct LedgerState {
    /// The database connection for managing accounts and transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LedgerState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body of a deposit or withdrawal request.
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    /// A JSON number or numeric string.
    pub amount: Option<Value>,
}

/// The body of a transfer request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// The email address or account number of the recipient.
    pub recipient_email_or_account: Option<String>,
    /// A JSON number or numeric string.
    pub amount: Option<Value>,
}

/// The response to a successful deposit.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepositResponse {
    pub message: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_deposited: Decimal,
}

/// The response to a successful withdrawal or transfer.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalResponse {
    pub message: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_withdrawn: Decimal,
}

/// A route handler for depositing money into the logged-in customer's account.
pub async fn deposit_endpoint(
    State(state): State<LedgerState>,
    Extension(account_id): Extension<AccountId>,
    WithRejection(Json(request), _): WithRejection<Json<AmountRequest>, Error>,
) -> Result<Json<DepositResponse>, Error> {
    let amount = Amount::parse(request.amount.as_ref())?;

    let mut connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let account = deposit(account_id, amount, &mut connection)?;

    Ok(Json(DepositResponse {
        message: "Deposit successful".to_owned(),
        balance: account.balance,
        total_deposited: account.total_deposited,
    }))
}

/// A route handler for withdrawing money from the logged-in customer's account.
pub async fn withdraw_endpoint(
    State(state): State<LedgerState>,
    Extension(account_id): Extension<AccountId>,
    WithRejection(Json(request), _): WithRejection<Json<AmountRequest>, Error>,
) -> Result<Json<WithdrawalResponse>, Error> {
    let amount = Amount::parse(request.amount.as_ref())?;

    let mut connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let account = withdraw(account_id, amount, &mut connection)?;

    Ok(Json(WithdrawalResponse {
        message: "Withdrawal successful".to_owned(),
        balance: account.balance,
        total_withdrawn: account.total_withdrawn,
    }))
}

/// A route handler for sending money from the logged-in customer's account
/// to another customer.
pub async fn transfer_endpoint(
    State(state): State<LedgerState>,
    Extension(account_id): Extension<AccountId>,
    WithRejection(Json(request), _): WithRejection<Json<TransferRequest>, Error>,
) -> Result<Json<WithdrawalResponse>, Error> {
    let recipient_key = request
        .recipient_email_or_account
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(Error::MissingFields(
            "please provide recipient and valid amount",
        ))?;
    let amount = Amount::parse(request.amount.as_ref())?;

    let mut connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let account = transfer(account_id, recipient_key, amount, &mut connection)?;

    Ok(Json(WithdrawalResponse {
        message: "Transfer successful".to_owned(),
        balance: account.balance,
        total_withdrawn: account.total_withdrawn,
    }))
}
