//! Defines the endpoint for listing the logged-in customer's transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    account::AccountId,
    transaction::{
        Direction, TransactionId, TransactionRecord, TransactionStatus, TransactionType,
        get_transactions_for_account,
    },
};

/// The state needed to list transactions.
#[derive(Debug, Clone)]
pub struct TransactionHistoryState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionHistoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A transaction as shown in the customer's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub direction: Direction,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// The counterparty's email, or their account number if there is no email.
    pub recipient: Option<String>,
    pub recipient_account_number: Option<String>,
    pub status: TransactionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

impl From<TransactionRecord> for TransactionView {
    fn from(record: TransactionRecord) -> Self {
        Self {
            id: record.id,
            transaction_type: record.transaction_type,
            direction: record.direction,
            amount: record.amount,
            recipient: record
                .counterparty_email
                .clone()
                .or_else(|| record.counterparty_account_number.clone()),
            recipient_account_number: record.counterparty_account_number,
            status: record.status,
            date: record.date,
        }
    }
}

/// The response body for the transaction history.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionHistory {
    pub transactions: Vec<TransactionView>,
}

/// A route handler for the logged-in customer's transactions, newest first.
pub async fn get_transactions_endpoint(
    State(state): State<TransactionHistoryState>,
    Extension(account_id): Extension<AccountId>,
) -> Result<Json<TransactionHistory>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let transactions = get_transactions_for_account(account_id, &connection)?
        .into_iter()
        .map(TransactionView::from)
        .collect();

    Ok(Json(TransactionHistory { transactions }))
}
