use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{accounts::AccountService, api::error::ErrorBody};

#[derive(ToSchema, Serialize, Deserialize)]
pub struct UserRegister {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for UserRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRegister")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct UserRegistered {
    pub email: String,
}

#[utoipa::path(
    post,
    path= "/api/users/register",
    request_body = UserRegister,
    responses (
        (status = 200, description = "Registration accepted, activation link sent", body = UserRegistered, content_type = "application/json"),
        (status = 400, description = "Invalid email, short password or email already used", body = ErrorBody),
    ),
    tag= "users"
)]
#[instrument(skip(service))]
pub async fn register(
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<UserRegister>>,
) -> impl IntoResponse {
    let Some(Json(user)) = payload else {
        return (StatusCode::BAD_REQUEST, Json(ErrorBody::new("Missing payload"))).into_response();
    };

    match service.register(&user.email, &user.password).await {
        Ok(email) => (StatusCode::OK, Json(UserRegistered { email })).into_response(),
        Err(e) => e.into_response(),
    }
}
