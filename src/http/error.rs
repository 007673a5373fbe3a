use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use crate::EcommerceError;

impl EcommerceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::EmptyOrder | Self::InsufficientStock { .. } | Self::AlreadyShipped
            | Self::InvalidStatus(_) | Self::NoStatusChange(_) | Self::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::IncompleteOrderData | Self::OrderNumberExhausted | Self::Upstream(_) | Self::StorageError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::EmptyOrder => "empty_order",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::AlreadyShipped => "already_shipped",
            Self::InvalidStatus(_) => "invalid_status",
            Self::NoStatusChange(_) => "no_status_change",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::IncompleteOrderData => "incomplete_order_data",
            Self::OrderNumberExhausted => "order_number_exhausted",
            Self::Upstream(_) => "upstream_error",
            Self::StorageError(_) => "internal_error",
        }
    }
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Upstream(_) | Self::StorageError(_) => {
                tracing::error!(error = %self, "request failed");
                "Internal server error".to_string()
            }
            Self::IncompleteOrderData | Self::OrderNumberExhausted => {
                tracing::error!(error = %self, "request failed");
                self.to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(json!({ "error": self.code(), "message": message }))).into_response()
    }
}
