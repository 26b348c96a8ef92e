//! Generates the account numbers given to new accounts.
//!
//! An account number is "KB" followed by the last ten digits of the current
//! Unix time in milliseconds and a two digit random suffix. Collisions are
//! retried a bounded number of times before switching to sixteen random digits.

use rand::Rng;
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    Error,
    account::{AccountNumber, account_number_exists},
};

/// The prefix shared by all account numbers.
pub const ACCOUNT_NUMBER_PREFIX: &str = "KB";

/// How many candidates to try from each candidate space before giving up on it.
const ATTEMPTS_PER_SPACE: usize = 10;

fn time_based_candidate(now: OffsetDateTime, rng: &mut impl Rng) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let suffix: u8 = rng.gen_range(0..100);

    format!(
        "{ACCOUNT_NUMBER_PREFIX}{:010}{suffix:02}",
        millis.rem_euclid(10_000_000_000)
    )
}

fn wide_candidate(rng: &mut impl Rng) -> String {
    let digits: u64 = rng.gen_range(0..10_000_000_000_000_000);

    format!("{ACCOUNT_NUMBER_PREFIX}{digits:016}")
}

/// Generate an account number that `is_taken` reports as free.
///
/// # Errors
///
/// Returns [Error::AccountNumbersExhausted] if every candidate was taken, or
/// any error returned by `is_taken`.
pub fn generate_account_number<R, F>(
    rng: &mut R,
    now: OffsetDateTime,
    mut is_taken: F,
) -> Result<AccountNumber, Error>
where
    R: Rng,
    F: FnMut(&str) -> Result<bool, Error>,
{
    for attempt in 1..=ATTEMPTS_PER_SPACE {
        let candidate = time_based_candidate(now, rng);

        if !is_taken(&candidate)? {
            return Ok(AccountNumber::new_unchecked(candidate));
        }

        tracing::debug!("Account number {candidate} is taken (attempt {attempt})");
    }

    tracing::warn!(
        "No free account number after {ATTEMPTS_PER_SPACE} attempts, \
        falling back to random account numbers"
    );

    for _ in 0..ATTEMPTS_PER_SPACE {
        let candidate = wide_candidate(rng);

        if !is_taken(&candidate)? {
            return Ok(AccountNumber::new_unchecked(candidate));
        }
    }

    Err(Error::AccountNumbersExhausted)
}

/// Generate an account number that no account in the database uses yet.
///
/// # Errors
///
/// Returns [Error::AccountNumbersExhausted] if no free number was found, or
/// [Error::SqlError] if the database could not be queried.
pub fn generate_unique_account_number(connection: &Connection) -> Result<AccountNumber, Error> {
    generate_account_number(&mut rand::thread_rng(), OffsetDateTime::now_utc(), |candidate| {
        account_number_exists(candidate, connection)
    })
}
