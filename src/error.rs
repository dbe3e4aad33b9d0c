use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::ApiResponse;

pub type Result<T> = std::result::Result<T, DashboardError>;

/// Everything that can go wrong between the data files and a rendered view.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// Feature selector outside `events | sports | participants | countries`.
    #[error(
        "Invalid value for \"feature\": {0:?}. Must be one of [\"events\", \"sports\", \"participants\", \"countries\"]"
    )]
    InvalidFeature(String),

    #[error("Invalid season {0:?}. Must be \"summer\" or \"winter\"")]
    InvalidSeason(String),

    /// Hover or card label that is not `"{host} {year}"`.
    #[error("Invalid event label {0:?}, expected \"<host> <year>\"")]
    InvalidLabel(String),

    #[error("No event found for {host} {year}")]
    NotFound { host: String, year: i32 },

    #[error("{count} events found for {host} {year}, expected exactly one")]
    AmbiguousRecord {
        host: String,
        year: i32,
        count: usize,
    },

    #[error("No page at {0:?}")]
    PageNotFound(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Missing column {0:?} in event data")]
    MissingColumn(String),

    #[error("Invalid value {value:?} in column {column:?}")]
    InvalidValue { column: String, value: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// A blocking data read panicked or was cancelled.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl DashboardError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidFeature(_) | Self::InvalidSeason(_) | Self::InvalidLabel(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound { .. } | Self::PageNotFound(_) => StatusCode::NOT_FOUND,
            Self::AmbiguousRecord { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let body = ApiResponse {
            status: "error".to_string(),
            message: self.to_string(),
            data: None,
        };
        (status, Json(body)).into_response()
    }
}
