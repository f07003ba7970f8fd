//! Authentication guard for protected routes.
//!
//! Reads `Authorization: <scheme> <token>`, resolves the session token to an
//! account and hands the account to the wrapped handler as an `Extension`.

use axum::{
    extract::{Extension, Request},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::accounts::{AccountError, AccountService};

/// Second whitespace-separated field of the `Authorization` header.
///
/// The scheme is not checked.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_whitespace().nth(1))
}

/// Middleware: reject with 401 unless the request carries a valid session token.
///
/// # Errors
/// `AccountError::Unauthorized`, or `StoreFailure` if the account lookup fails.
pub async fn require_auth(
    Extension(service): Extension<Arc<AccountService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AccountError> {
    let Some(token) = bearer_token(request.headers()).map(ToString::to_string) else {
        debug!("missing or malformed authorization header");
        return Err(AccountError::Unauthorized);
    };

    let account = service.authenticate(&token).await?;
    request.extensions_mut().insert(account);

    Ok(next.run(request).await)
}
