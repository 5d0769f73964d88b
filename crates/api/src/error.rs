//! API error types with HTTP response mapping.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use domain::DomainError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or unknown credentials.
    Unauthorized(String),
    /// Authenticated, but not allowed.
    Forbidden(String),
    /// Domain logic error.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::Map::new();

        let status = match self {
            ApiError::NotFound(msg) => {
                body.insert("error".into(), msg.into());
                StatusCode::NOT_FOUND
            }
            ApiError::BadRequest(msg) => {
                body.insert("error".into(), msg.into());
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(msg) => {
                body.insert("error".into(), msg.into());
                let mut response =
                    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response();
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    header::HeaderValue::from_static("Bearer"),
                );
                return response;
            }
            ApiError::Forbidden(msg) => {
                body.insert("error".into(), msg.into());
                StatusCode::FORBIDDEN
            }
            ApiError::Domain(err) => {
                let status = domain_error_status(&err);
                if status.is_server_error() {
                    tracing::error!(error = %err, "order store failure");
                }
                body.insert("error".into(), err.to_string().into());
                if let DomainError::Validation(validation) = &err {
                    body.insert(
                        "violations".into(),
                        serde_json::to_value(&validation.violations).unwrap_or_default(),
                    );
                }
                status
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InvalidTransition { .. }
        | DomainError::PaymentNotAllowed { .. }
        | DomainError::OrderClosed(_)
        | DomainError::ConcurrentUpdate(_)
        | DomainError::DuplicateId(_) => StatusCode::CONFLICT,
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

#[cfg(test)]
mod tests {
    use domain::{OrderId, OrderStatus, ValidationError};
    use order_store::OrderStoreError;

    use super::*;

    #[test]
    fn domain_errors_map_to_status_codes() {
        let id = OrderId::from_sequence(1);
        let cases = [
            (
                DomainError::Validation(ValidationError::single("items", "is required")),
                StatusCode::BAD_REQUEST,
            ),
            (DomainError::NotFound(id.clone()), StatusCode::NOT_FOUND),
            (
                DomainError::InvalidTransition {
                    id: id.clone(),
                    from: OrderStatus::Cancelled,
                    to: OrderStatus::Preparing,
                },
                StatusCode::CONFLICT,
            ),
            (DomainError::DuplicateId(id.clone()), StatusCode::CONFLICT),
            (
                DomainError::Storage(OrderStoreError::Corrupt("bad row".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn unauthorized_sets_challenge_header() {
        let response = ApiError::Unauthorized("missing bearer token".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
