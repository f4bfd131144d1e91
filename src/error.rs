use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The main error type for Money Buddy services
#[derive(Debug, thiserror::Error)]
pub enum MoneyBuddyError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Standard error response body.
///
/// Server errors carry a generic message; the full error is only logged.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_id: String,
}

impl MoneyBuddyError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    pub fn too_many_requests(msg: impl Into<String>) -> Self {
        Self::TooManyRequests(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) | Self::Anyhow(_) | Self::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Returns a message that is safe to send to clients.
    ///
    /// Client errors (4xx) keep their message. Server errors collapse to a
    /// generic message so connection strings or payload fragments never leak
    /// (CWE-209).
    pub fn safe_message(&self) -> String {
        match self {
            Self::NotFound(msg) => format!("Not found: {}", msg),
            Self::BadRequest(msg) => format!("Bad request: {}", msg),
            Self::Unauthorized(msg) => format!("Unauthorized: {}", msg),
            Self::TooManyRequests(msg) => format!("Too many requests: {}", msg),

            Self::Internal(_) | Self::Anyhow(_) => "Internal server error".to_string(),
            Self::ServiceUnavailable(_) => "Service unavailable".to_string(),
            Self::Database(_) => "Database error".to_string(),
        }
    }

    /// Whether the error is the server's fault (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for MoneyBuddyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            status = status.as_u16(),
            error_id = %error_id,
            error = %self,
            "Request failed"
        );

        let body = ErrorResponse {
            error: self.safe_message(),
            error_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias used across the crate
pub type Result<T> = std::result::Result<T, MoneyBuddyError>;

impl From<serde_json::Error> for MoneyBuddyError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            MoneyBuddyError::BadRequest(format!("JSON error: {}", err))
        } else {
            MoneyBuddyError::Internal(format!("JSON serialization error: {}", err))
        }
    }
}

#[cfg(feature = "database")]
impl From<sea_orm::DbErr> for MoneyBuddyError {
    fn from(err: sea_orm::DbErr) -> Self {
        match &err {
            sea_orm::DbErr::RecordNotFound(msg) => MoneyBuddyError::NotFound(if msg.is_empty() {
                "Record not found".to_string()
            } else {
                msg.clone()
            }),
            sea_orm::DbErr::Conn(inner) => {
                MoneyBuddyError::Database(format!("Connection error: {}", inner))
            }
            sea_orm::DbErr::Exec(inner) => {
                MoneyBuddyError::Database(format!("Execution error: {}", inner))
            }
            sea_orm::DbErr::Query(inner) => {
                MoneyBuddyError::Database(format!("Query error: {}", inner))
            }
            _ => MoneyBuddyError::Database(format!("Database error: {}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = MoneyBuddyError::not_found("Intent not found");
        assert!(matches!(err, MoneyBuddyError::NotFound(_)));
        assert_eq!(err.to_string(), "Not found: Intent not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bad_request_error() {
        let err = MoneyBuddyError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "Bad request: Invalid input");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unauthorized_error() {
        let err = MoneyBuddyError::unauthorized("Invalid signature");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_database_error_is_server_error() {
        let err = MoneyBuddyError::database("connection refused");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
    }

    #[test]
    fn test_too_many_requests_error() {
        let err = MoneyBuddyError::too_many_requests("Rate limit exceeded");
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_anyhow_error() {
        let err: MoneyBuddyError = anyhow::anyhow!("Something unexpected").into();
        assert!(matches!(err, MoneyBuddyError::Anyhow(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_safe_message_hides_server_details() {
        let err = MoneyBuddyError::database("postgres://user:hunter2@db/ledger refused");
        assert_eq!(err.safe_message(), "Database error");

        let err = MoneyBuddyError::internal("stack overflow in handler");
        assert_eq!(err.safe_message(), "Internal server error");

        let err = MoneyBuddyError::bad_request("missing field");
        assert_eq!(err.safe_message(), "Bad request: missing field");
    }

    #[test]
    fn test_json_error_classification() {
        let err: MoneyBuddyError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, MoneyBuddyError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_into_response_hides_internal_message() {
        let response = MoneyBuddyError::internal("secret detail").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
        assert!(json["error_id"].is_string());
        assert!(!String::from_utf8_lossy(&body).contains("secret detail"));
    }
}
