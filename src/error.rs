use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unexpected catalog response shape: {0}")]
    GatewayShape(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("No usable audio features for the selection")]
    NoUsableFeatures,

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),
}

impl AppError {
    /// Errors that end a request instead of degrading the current gateway call
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Auth(_))
    }

    /// Errors meaning "nothing to recommend" rather than a failure
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            AppError::NoUsableFeatures | AppError::InsufficientData(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Auth(_) | AppError::GatewayShape(_) | AppError::HttpClient(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::NoUsableFeatures | AppError::InsufficientData(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_auth_is_fatal() {
        assert!(AppError::Auth("denied".to_string()).is_fatal());
        assert!(!AppError::GatewayShape("{}".to_string()).is_fatal());
        assert!(!AppError::ExternalApi("503".to_string()).is_fatal());
        assert!(!AppError::NoUsableFeatures.is_fatal());
    }

    #[test]
    fn test_empty_result_errors() {
        assert!(AppError::NoUsableFeatures.is_empty_result());
        assert!(AppError::InsufficientData("0 rows".to_string()).is_empty_result());
        assert!(!AppError::Auth("denied".to_string()).is_empty_result());
    }

    #[test]
    fn test_status_mapping() {
        let response = AppError::Auth("denied".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = AppError::InvalidInput("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::NoUsableFeatures.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
