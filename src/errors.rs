use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("No strategy registered: {0}")]
    NoStrategy(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("WebDriver error: {0}")]
    WebDriver(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Human action required: {0}")]
    HumanActionRequired(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoStrategy,
    Authentication,
    WebDriver,
    Download,
    Timeout,
    HumanActionRequired,
    Parse,
    Relay,
    Unknown,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
}

impl ScrapeError {
    fn to_error_code(&self) -> ErrorCode {
        match self {
            ScrapeError::NoStrategy(_) => ErrorCode::NoStrategy,
            ScrapeError::Authentication(_) => ErrorCode::Authentication,
            ScrapeError::WebDriver(_) => ErrorCode::WebDriver,
            ScrapeError::Download(_) => ErrorCode::Download,
            ScrapeError::Timeout(_) => ErrorCode::Timeout,
            ScrapeError::HumanActionRequired(_) => ErrorCode::HumanActionRequired,
            ScrapeError::Parse(_) => ErrorCode::Parse,
            ScrapeError::Relay(_) => ErrorCode::Relay,
            ScrapeError::Unknown(_) => ErrorCode::Unknown,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ScrapeError::NoStrategy(_) => StatusCode::NOT_FOUND,
            ScrapeError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ScrapeError::WebDriver(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ScrapeError::Download(_) => StatusCode::BAD_GATEWAY,
            ScrapeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ScrapeError::HumanActionRequired(_) => StatusCode::PRECONDITION_FAILED,
            ScrapeError::Parse(_) => StatusCode::BAD_REQUEST,
            ScrapeError::Relay(_) => StatusCode::BAD_GATEWAY,
            ScrapeError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.to_error_code();
        let message = self.to_string();

        let error_response = ErrorResponse {
            error: ErrorDetail { code, message },
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<fantoccini::error::CmdError> for ScrapeError {
    fn from(err: fantoccini::error::CmdError) -> Self {
        ScrapeError::WebDriver(err.to_string())
    }
}

impl From<fantoccini::error::NewSessionError> for ScrapeError {
    fn from(err: fantoccini::error::NewSessionError) -> Self {
        ScrapeError::WebDriver(err.to_string())
    }
}

impl From<serde_json::Error> for ScrapeError {
    fn from(err: serde_json::Error) -> Self {
        ScrapeError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        ScrapeError::Relay(err.to_string())
    }
}

impl From<std::io::Error> for ScrapeError {
    fn from(err: std::io::Error) -> Self {
        ScrapeError::Download(err.to_string())
    }
}

impl From<zip::result::ZipError> for ScrapeError {
    fn from(err: zip::result::ZipError) -> Self {
        ScrapeError::Download(err.to_string())
    }
}
