use axum::http::StatusCode;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the aggregation core. Handlers map these onto HTTP
/// responses; the core itself never deals in status codes.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("unsupported currency code: {0}")]
    UnknownCurrency(String),
    #[error("invalid date range: {end} is before {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

impl From<CoreError> for (StatusCode, String) {
    fn from(error: CoreError) -> Self {
        (StatusCode::BAD_REQUEST, error.to_string())
    }
}
