//! HTTP error type.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use resmeta_common::Error;
use serde_json::json;
use tracing::{error, info};

/// Detail returned for 500s when running in production
pub const UNEXPECTED_ERROR: &str = "Unexpected error";

/// API error, rendered as `{"errors":[{"status":N,"detail":"..."}]}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "errors": [{
                "status": self.status.as_u16(),
                "detail": self.detail,
            }]
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = StatusCode::from_u16(err.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", err);
        } else if let Error::Forbidden { reason } = &err {
            info!("Request forbidden: {}", reason);
        } else {
            info!("Request rejected ({}): {}", status.as_u16(), err);
        }
        Self::new(status, err.to_string())
    }
}

/// Response mapper installed in production: 500 bodies never leak the raw
/// message.
pub async fn mask_internal_errors(response: Response) -> Response {
    if response.status() == StatusCode::INTERNAL_SERVER_ERROR {
        return ApiError::internal(UNEXPECTED_ERROR).into_response();
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use resmeta_common::{FieldError, ValidationReport};

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(Error::Unauthorized).status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(Error::forbidden("not a member")).status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(Error::Store("disk".into())).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_forbidden_reason_is_not_exposed() {
        let err = ApiError::from(Error::forbidden("record belongs to u2"));
        assert_eq!(err.detail, "Forbidden");
    }

    #[test]
    fn test_validation_detail() {
        let mut report = ValidationReport::new();
        report.push(FieldError::new("language", "language can not be empty."));
        let err = ApiError::from(Error::Validation(report));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.detail, "- language: language can not be empty. - ");
    }

    #[tokio::test]
    async fn test_mask_internal_errors() {
        let masked = mask_internal_errors(ApiError::internal("redb exploded").into_response()).await;
        assert_eq!(masked.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(masked.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["errors"][0]["detail"], UNEXPECTED_ERROR);

        let kept = mask_internal_errors(ApiError::bad_request("nope").into_response()).await;
        assert_eq!(kept.status(), StatusCode::BAD_REQUEST);
    }
}
