//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fabula_error::{DispatchErrorKind, FabulaError, FabulaErrorKind};
use serde_json::json;

/// An API error carrying the status code and JSON body to send.
///
/// Dispatch rejections map onto client-facing statuses with their display
/// message; everything else is a 500 with the detail kept in the logs.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: serde_json::Value,
}

impl ApiError {
    /// A 400 with the given message.
    pub fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": message }),
        }
    }

    /// A 404 with the given message.
    pub fn not_found(message: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: json!({ "error": message }),
        }
    }
}

impl From<FabulaError> for ApiError {
    fn from(err: FabulaError) -> Self {
        if let FabulaErrorKind::Dispatch(dispatch) = err.kind() {
            let message = dispatch.kind.to_string();
            let (status, body) = match &dispatch.kind {
                DispatchErrorKind::StoryNotFound | DispatchErrorKind::ChapterNotFound => {
                    (StatusCode::NOT_FOUND, json!({ "error": message }))
                }
                DispatchErrorKind::GenerationInProgress => {
                    (StatusCode::CONFLICT, json!({ "error": message }))
                }
                DispatchErrorKind::InsufficientCredits {
                    required,
                    available,
                } => (
                    StatusCode::BAD_REQUEST,
                    json!({
                        "error": message,
                        "required": required,
                        "available": available,
                    }),
                ),
                DispatchErrorKind::OverdraftBlocked | DispatchErrorKind::UnsupportedKind(_) => {
                    (StatusCode::BAD_REQUEST, json!({ "error": message }))
                }
                DispatchErrorKind::QueueUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": message }))
                }
            };
            return Self { status, body };
        }

        tracing::error!(error = %err, "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({ "error": "Internal server error." }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_error::DispatchError;

    fn status_for(kind: DispatchErrorKind) -> StatusCode {
        let err: FabulaError = DispatchError::new(kind).into();
        ApiError::from(err).status
    }

    #[test]
    fn test_dispatch_rejections_map_to_client_statuses() {
        assert_eq!(
            status_for(DispatchErrorKind::StoryNotFound),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(DispatchErrorKind::GenerationInProgress),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(DispatchErrorKind::InsufficientCredits {
                required: 50,
                available: 3
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(DispatchErrorKind::OverdraftBlocked),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(DispatchErrorKind::UnsupportedKind("cover_image".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(DispatchErrorKind::QueueUnavailable("full".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_insufficient_credits_body_carries_figures() {
        let err: FabulaError = DispatchError::new(DispatchErrorKind::InsufficientCredits {
            required: 50,
            available: 3,
        })
        .into();
        let api = ApiError::from(err);
        assert_eq!(api.body["required"], 50);
        assert_eq!(api.body["available"], 3);
    }
}
