use axum::{extract::Extension, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::accounts::Account;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Me {
    pub email: String,
    pub is_activated: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl From<Account> for Me {
    fn from(account: Account) -> Self {
        Self {
            email: account.email,
            is_activated: account.is_enabled,
            confirmed_at: account.confirmed_at,
        }
    }
}

#[utoipa::path(
    get,
    path= "/api/users/me",
    responses (
        (status = 200, description = "Account behind the session token", body = Me, content_type = "application/json"),
        (status = 401, description = "Missing, expired or invalid session token", body = crate::api::error::ErrorBody),
    ),
    tag= "users"
)]
// the guard has already resolved the account
pub async fn me(Extension(account): Extension<Account>) -> impl IntoResponse {
    Json(Me::from(account))
}
