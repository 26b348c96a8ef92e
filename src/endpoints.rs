//! The API endpoint URIs.

/// The route for opening a new account.
pub const REGISTER: &str = "/auth/register";
/// The route for logging in a customer.
pub const LOG_IN: &str = "/auth/login";
/// The route for the client to log out the current customer.
pub const LOG_OUT: &str = "/auth/logout";
/// The route for getting the logged-in customer.
pub const CURRENT_USER: &str = "/auth/me";
/// The route for depositing money.
pub const DEPOSIT: &str = "/account/deposit";
/// The route for withdrawing money.
pub const WITHDRAW: &str = "/account/withdraw";
/// The route for sending money to another customer.
pub const TRANSFER: &str = "/account/transfer";
/// The route for the logged-in customer's transaction history.
pub const TRANSACTIONS: &str = "/account/transactions";
/// The route for viewing and updating the logged-in customer's profile.
pub const PROFILE: &str = "/account/profile";
/// The route for changing the logged-in customer's password.
pub const CHANGE_PASSWORD: &str = "/account/change-password";
