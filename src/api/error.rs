use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Methods the state endpoint serves, advertised on 405 responses.
pub const ALLOWED_METHODS: &str = "GET, POST";

/// Request-scoped failures. Each maps to a status; none reach the crate
/// [`Error`](crate::Error) type.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    /// LOCK, UNLOCK and every other method outside GET and POST.
    MethodNotAllowed,
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ApiError::MethodNotAllowed => {
                (status, [(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS))])
                    .into_response()
            }
            ApiError::Unauthorized(message) => (
                status,
                [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Basic realm=\"tfstate\""))],
                Json(ErrorBody { error: "unauthorized", message }),
            )
                .into_response(),
            ApiError::Internal(message) => {
                (status, Json(ErrorBody { error: "internal_error", message })).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_not_allowed_advertises_allowed_methods() {
        let response = ApiError::MethodNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "GET, POST");
    }

    #[test]
    fn test_unauthorized_sets_challenge() {
        let response = ApiError::Unauthorized("missing credentials".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"tfstate\""
        );
    }

    #[test]
    fn test_internal_is_500() {
        let response = ApiError::Internal("failed to read state".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
