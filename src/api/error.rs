use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::accounts::AccountError;

/// Body of every non-2xx response.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::StoreFailure(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };

        let message = if status.is_server_error() {
            let kind = self.kind();
            let err = anyhow::Error::new(self);
            error!(kind, "request failed: {err:#}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}
