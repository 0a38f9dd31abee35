use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::line::{Direction, LineState};

#[derive(Debug, Error)]
pub enum GpioError {
    #[error("Invalid physical pin number: {0}")]
    InvalidPin(u32),
    #[error("Invalid gpio direction: {0}")]
    InvalidDirection(String),
    #[error("Pin {0} could not be exported")]
    Export(u32),
    #[error("Pin direction for pin {0} could not be set")]
    DirectionConfig(u32),
    #[error("Invalid operation {op} for {direction} pin {line}")]
    DirectionMismatch {
        line: u32,
        direction: Direction,
        op: &'static str,
    },
    #[error("Invalid state for pin {line}: {state}")]
    InvalidState { line: u32, state: LineState },
    #[error("Pin not found: {0}")]
    NotFoundPin(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResponseError for GpioError {
    fn status_code(&self) -> StatusCode {
        match self {
            GpioError::NotFoundPin(_) | GpioError::InvalidPin(_) => StatusCode::NOT_FOUND,
            GpioError::InvalidDirection(_)
            | GpioError::DirectionMismatch { .. }
            | GpioError::InvalidState { .. }
            | GpioError::InvalidValue(_) => StatusCode::BAD_REQUEST,
            GpioError::Export(_) | GpioError::DirectionConfig(_) | GpioError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
