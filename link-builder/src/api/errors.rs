use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::source::SourceError;
use crate::stats::StatsError;

#[derive(Error, Debug)]
pub enum LinkServiceError {
    #[error("too many PIDs in request: {count} (max {max})")]
    TooManyPids { count: usize, max: usize },
    #[error("failed to parse request: {0}")]
    RequestParsingError(String),
    #[error("campaign data unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),
    #[error("stats unavailable: {0}")]
    StatsUnavailable(#[from] StatsError),
}

impl IntoResponse for LinkServiceError {
    fn into_response(self) -> Response {
        match self {
            LinkServiceError::TooManyPids { .. } | LinkServiceError::RequestParsingError(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            LinkServiceError::SourceUnavailable(_) | LinkServiceError::StatsUnavailable(_) => {
                tracing::error!("{}", self);
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
        }
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let response = LinkServiceError::TooManyPids { count: 6, max: 5 }.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response =
            LinkServiceError::from(SourceError::MissingColumn("os".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
