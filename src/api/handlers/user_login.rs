use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::{accounts::AccountService, api::error::ErrorBody};

#[derive(ToSchema, Serialize, Deserialize)]
pub struct UserLogin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for UserLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserLogin")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct UserSession {
    pub email: String,
    pub token: String,
    pub is_activated: bool,
}

#[utoipa::path(
    post,
    path= "/api/users/login",
    request_body = UserLogin,
    responses (
        (status = 200, description = "Login successful", body = UserSession, content_type = "application/json"),
        (status = 400, description = "Invalid email or password", body = ErrorBody),
    ),
    tag= "users"
)]
#[instrument(skip(service))]
pub async fn login(
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<UserLogin>>,
) -> impl IntoResponse {
    let Some(Json(user)) = payload else {
        return (StatusCode::BAD_REQUEST, Json(ErrorBody::new("Missing payload"))).into_response();
    };

    match service.login(&user.email, &user.password).await {
        Ok(outcome) => {
            debug!("Login successful");

            (
                StatusCode::OK,
                Json(UserSession {
                    email: outcome.email,
                    token: outcome.token,
                    is_activated: outcome.is_enabled,
                }),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}
