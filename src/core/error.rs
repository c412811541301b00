use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Error::InvalidArgument(ref reason) => {
                tracing::error!("rejected token request: {}", reason);
                (StatusCode::BAD_REQUEST, "Invalid argument")
            }
            Error::Unauthorized => {
                tracing::debug!("request not authenticated");
                (StatusCode::UNAUTHORIZED, "Unauthorized")
            }
            Error::Forbidden => {
                tracing::debug!("request lacks required role");
                (StatusCode::FORBIDDEN, "Forbidden")
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Error::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::InvalidArgument("negative".into())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }
}
