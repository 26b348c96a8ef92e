//! Authentication middleware that validates the session cookie.

use axum::{
    extract::{FromRef, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};

use crate::{AppState, auth::cookie::get_token_from_cookies};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware function that checks for a valid session cookie.
///
/// The account ID is placed into the request and the request executed normally if
/// the cookie is valid, otherwise a 401 Unauthorized JSON error is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(account_id): Extension<AccountId>` to receive the account ID.
pub async fn auth_guard(jar: PrivateCookieJar, mut request: Request, next: Next) -> Response {
    match get_token_from_cookies(&jar) {
        Ok(token) => {
            request.extensions_mut().insert(token.account_id);
            next.run(request).await
        }
        Err(error) => {
            tracing::debug!("Rejected request to {}: {error}", request.uri().path());
            error.into_response()
        }
    }
}

#[cfg(test)]
mod auth_guard_tests {
    use axum::{
        Extension, Router,
        extract::Path,
        http::StatusCode,
        middleware,
        routing::{get, post},
    };
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key},
    };
    use axum_test::TestServer;
    use sha2::Digest;
    use time::Duration;

    use crate::{
        Error,
        account::AccountId,
        auth::{AuthState, COOKIE_TOKEN, auth_guard, set_auth_cookie},
        test_utils::assert_error,
    };

    async fn test_handler(Extension(account_id): Extension<AccountId>) -> String {
        account_id.to_string()
    }

    async fn stub_log_in_route(
        Path((account_id, duration_seconds)): Path<(i64, i64)>,
        jar: PrivateCookieJar,
    ) -> Result<PrivateCookieJar, Error> {
        set_auth_cookie(
            jar,
            AccountId::new(account_id),
            Duration::seconds(duration_seconds),
        )
    }

    const TEST_LOG_IN_ROUTE_PATH: &str = "/log_in/{account_id}/{duration_seconds}";
    const TEST_PROTECTED_ROUTE: &str = "/protected";

    fn get_test_server() -> TestServer {
        get_test_server_with_secret("nafstenoas")
    }

    fn get_test_server_with_secret(secret: &str) -> TestServer {
        let hash = sha2::Sha512::digest(secret);
        let state = AuthState {
            cookie_key: Key::from(&hash),
        };

        let app = Router::new()
            .route(TEST_PROTECTED_ROUTE, get(test_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .route(TEST_LOG_IN_ROUTE_PATH, post(stub_log_in_route))
            .with_state(state);

        TestServer::new(app)
    }

    #[tokio::test]
    async fn get_protected_route_with_valid_cookie() {
        let server = get_test_server();
        let response = server.post("/log_in/42/60").await;

        response.assert_status_ok();
        let token_cookie = response.cookie(COOKIE_TOKEN);

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(token_cookie)
            .await;

        response.assert_status_ok();
        response.assert_text("42");
    }

    #[tokio::test]
    async fn get_protected_route_with_no_cookie_is_unauthorized() {
        let server = get_test_server();

        let response = server.get(TEST_PROTECTED_ROUTE).await;

        assert_error(
            &response,
            StatusCode::UNAUTHORIZED,
            "authentication_error",
            "Not logged in",
        );
    }

    #[tokio::test]
    async fn get_protected_route_with_tampered_cookie_is_unauthorized() {
        let server = get_test_server();

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(Cookie::build((COOKIE_TOKEN, "FOOBAR")).build())
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn get_protected_route_with_expired_cookie_is_unauthorized() {
        let server = get_test_server();
        let response = server.post("/log_in/42/-10").await;
        response.assert_status_ok();
        // The browser would drop an expired cookie, so rebuild it to send it anyway.
        let expired_cookie = response.cookie(COOKIE_TOKEN);
        let expired_cookie = Cookie::new(COOKIE_TOKEN, expired_cookie.value().to_owned());

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(expired_cookie)
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn cookie_from_another_key_is_unauthorized() {
        let server = get_test_server();
        let other_server = get_test_server_with_secret("a different secret");
        let forged_cookie = other_server.post("/log_in/42/60").await.cookie(COOKIE_TOKEN);

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(forged_cookie)
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}
