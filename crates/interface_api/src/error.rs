//! API error handling

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;
use validator::{ValidationErrors, ValidationErrorsKind};

use domain_billing::BillingError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{message}")]
    InsufficientStock { message: String, details: Value },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg, None),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "Request validation failed".to_string(),
                Some(json!(errors)),
            ),
            ApiError::InsufficientStock { message, details } => {
                (StatusCode::BAD_REQUEST, "insufficient_stock", message, Some(details))
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "transaction_conflict", msg, None),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg, None),
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            BillingError::InsufficientStock {
                product_id,
                ref product_code,
                requested,
                available,
                shortfall,
            } => ApiError::InsufficientStock {
                details: json!({
                    "productId": product_id.as_uuid(),
                    "productCode": product_code,
                    "requested": requested,
                    "available": available,
                    "shortfall": shortfall,
                }),
                message: err.to_string(),
            },
            BillingError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            BillingError::TransactionConflict(msg) => ApiError::Conflict(msg),
            BillingError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details = Vec::new();
        collect_validation_errors("", &errors, &mut details);
        details.sort();
        ApiError::Validation(details)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Flattens nested validation errors into `path: code` strings
fn collect_validation_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for e in field_errors {
                    match &e.message {
                        Some(message) => out.push(format!("{}: {}", path, message)),
                        None => out.push(format!("{}: {}", path, e.code)),
                    }
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_validation_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_validation_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::ProductId;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (BillingError::invalid("no items"), StatusCode::BAD_REQUEST),
            (BillingError::not_found("Bill", "x"), StatusCode::NOT_FOUND),
            (BillingError::TransactionConflict("lock".into()), StatusCode::CONFLICT),
            (BillingError::Internal("io".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                BillingError::insufficient_stock(ProductId::new(), None, 3, 2),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_insufficient_stock_carries_shortfall() {
        let err = ApiError::from(BillingError::insufficient_stock(
            ProductId::new(),
            Some("LAMP-01".into()),
            3,
            2,
        ));
        match err {
            ApiError::InsufficientStock { details, .. } => {
                assert_eq!(details["shortfall"], 1);
                assert_eq!(details["productCode"], "LAMP-01");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
