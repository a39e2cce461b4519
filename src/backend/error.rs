//! Backend error type

use reqwest::StatusCode;
use thiserror::Error;

use super::models::ErrorBody;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid {0}: not a valid HTTP header value")]
    InvalidHeader(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{message} (status {status})")]
    Api { status: StatusCode, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BackendError {
    /// Build an error from a non-success response body
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return Self::Unauthorized;
        }

        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| {
                let text = String::from_utf8_lossy(body).trim().to_string();
                if text.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                } else {
                    text
                }
            });

        Self::Api { status, message }
    }

    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_status() {
        let err = BackendError::from_response(StatusCode::UNAUTHORIZED, b"{}");
        assert!(matches!(err, BackendError::Unauthorized));
        assert_eq!(err.to_string(), "Unauthorized");
    }

    #[test]
    fn test_invalid_header_names_the_value() {
        let err = BackendError::InvalidHeader("anon key");
        assert_eq!(err.to_string(), "Invalid anon key: not a valid HTTP header value");
    }

    #[test]
    fn test_message_from_json_body() {
        let err = BackendError::from_response(
            StatusCode::BAD_REQUEST,
            br#"{"code": 400, "msg": "User already registered"}"#,
        );
        assert_eq!(err.user_message(), "User already registered");
        assert_eq!(err.to_string(), "User already registered (status 400 Bad Request)");
    }

    #[test]
    fn test_message_from_plain_body() {
        let err = BackendError::from_response(StatusCode::BAD_GATEWAY, b"upstream down\n");
        assert_eq!(err.user_message(), "upstream down");
    }

    #[test]
    fn test_message_from_empty_body() {
        let err = BackendError::from_response(StatusCode::INTERNAL_SERVER_ERROR, b"");
        assert_eq!(err.user_message(), "Internal Server Error");
    }
}
