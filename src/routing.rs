//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::{get, post, put},
};

use crate::{
    AppState,
    auth::{AuthState, auth_guard, get_current_user, post_log_in, post_log_out, register_endpoint},
    endpoints,
    ledger::{deposit_endpoint, transfer_endpoint, withdraw_endpoint},
    not_found::get_404_not_found,
    profile::{change_password_endpoint, get_profile, update_profile_endpoint},
    transaction::get_transactions_endpoint,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::REGISTER, post(register_endpoint))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, post(post_log_out));

    let protected_routes = Router::new()
        .route(endpoints::CURRENT_USER, get(get_current_user))
        .route(endpoints::DEPOSIT, post(deposit_endpoint))
        .route(endpoints::WITHDRAW, post(withdraw_endpoint))
        .route(endpoints::TRANSFER, post(transfer_endpoint))
        .route(endpoints::TRANSACTIONS, get(get_transactions_endpoint))
        .route(
            endpoints::PROFILE,
            get(get_profile).put(update_profile_endpoint),
        )
        .route(endpoints::CHANGE_PASSWORD, put(change_password_endpoint))
        .layer(middleware::from_fn_with_state(
            AuthState::from_ref(&state),
            auth_guard,
        ));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}
