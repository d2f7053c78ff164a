//! HTTP mapping for core errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use expense_core::ExpenseError;
use serde_json::json;

/// Handler error: wraps [`ExpenseError`] and renders `{ "error", "message" }`.
#[derive(Debug)]
pub struct AppError(pub ExpenseError);

impl From<ExpenseError> for AppError {
    fn from(err: ExpenseError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.0.is_internal() {
            tracing::error!(error = ?self.0, "request failed");
        }
        let body = json!({
            "error": self.0.kind(),
            "message": self.0.public_message(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_kind_to_status() {
        let resp = AppError(ExpenseError::Conflict("dup".into())).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let resp = AppError(ExpenseError::Internal(anyhow::anyhow!("pool closed"))).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
