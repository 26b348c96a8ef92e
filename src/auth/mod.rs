//! Registration, logging in and out, and the session cookie that identifies
//! the logged-in customer.

mod cookie;
mod current_user;
mod log_in;
mod log_out;
mod middleware;
mod register;
mod token;

pub use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use current_user::{UserResponse, get_current_user};
pub use log_in::{post_log_in, verify_credentials};
pub use log_out::post_log_out;
pub use middleware::{AuthState, auth_guard};
pub use register::{Registration, register, register_endpoint};
pub(super) use token::Token;

#[cfg(test)]
pub use cookie::COOKIE_TOKEN;
