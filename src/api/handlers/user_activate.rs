use axum::{
    extract::{Extension, Query},
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::IntoParams;

use crate::accounts::{AccountError, AccountService, ActivationFailure};

/// Where the browser lands after a successful activation.
pub const LOGIN_PATH: &str = "/login";

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Activation {
    /// Activation token from the emailed link.
    token: Option<String>,
}

#[utoipa::path(
    get,
    path= "/api/users/activate",
    params(Activation),
    responses (
        (status = 302, description = "Account activated, redirect to the login page"),
        (status = 400, description = "Activation code is expired or not valid", body = crate::api::error::ErrorBody),
    ),
    tag= "users"
)]
#[instrument(skip_all)]
pub async fn activate(
    service: Extension<Arc<AccountService>>,
    query: Option<Query<Activation>>,
) -> impl IntoResponse {
    let Some(token) = query.and_then(|Query(activation)| activation.token) else {
        return AccountError::ActivationTokenInvalid(ActivationFailure::Invalid).into_response();
    };

    match service.activate(&token).await {
        Ok(_) => (StatusCode::FOUND, [(LOCATION, LOGIN_PATH)]).into_response(),
        Err(e) => e.into_response(),
    }
}
