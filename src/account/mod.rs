//! Bank accounts: the account model, how accounts are stored and how new
//! accounts get their account number.

mod core;
mod number;

pub use core::{
    Account, AccountId, AccountNumber, AccountType, AccountView, NewAccount,
    account_number_exists, create_account_table, get_account_by_email,
    get_account_by_email_or_account_number, get_account_by_id, insert_account, normalize_email,
    save_account,
};
pub use number::{ACCOUNT_NUMBER_PREFIX, generate_account_number, generate_unique_account_number};
