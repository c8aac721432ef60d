use ai_llm_service::error_handler::AiLlmError;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contextor::ContextorError;
use file_store::FileStoreError;
use rag_store::RagError;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to bind {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    /// Malformed body or path, rejected before any handler logic ran.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    // --- Lower layers ---
    #[error(transparent)]
    Llm(#[from] AiLlmError),

    #[error(transparent)]
    Vector(#[from] RagError),

    #[error(transparent)]
    Files(#[from] FileStoreError),

    #[error(transparent)]
    Chat(#[from] ContextorError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Rejected { status, .. } => *status,

            AppError::Files(FileStoreError::Validation(_))
            | AppError::Chat(ContextorError::Validation(_)) => StatusCode::BAD_REQUEST,

            AppError::Files(FileStoreError::NotFound(_)) => StatusCode::NOT_FOUND,

            AppError::Chat(ContextorError::BudgetExceeded { .. }) => StatusCode::PAYLOAD_TOO_LARGE,

            // startup errors and every upstream failure
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind { .. } => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::Rejected { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                "PAYLOAD_TOO_LARGE"
            }
            AppError::Rejected { .. }
            | AppError::Files(FileStoreError::Validation(_))
            | AppError::Chat(ContextorError::Validation(_)) => "VALIDATION_ERROR",
            AppError::Files(FileStoreError::NotFound(_)) => "NOT_FOUND",
            AppError::Chat(ContextorError::BudgetExceeded { .. }) => "BUDGET_EXCEEDED",
            AppError::Files(FileStoreError::Timeout { .. })
            | AppError::Chat(ContextorError::Timeout { .. }) => "UPSTREAM_TIMEOUT",
            _ => "UPSTREAM_ERROR",
        }
    }

    fn details(&self) -> Value {
        match self {
            AppError::Chat(ContextorError::BudgetExceeded { total, limit, kind }) => json!({
                "total_tokens": total,
                "limit": limit,
                "limit_kind": kind.to_string(),
            }),
            AppError::Files(FileStoreError::NotFound(id)) => json!({ "id": id }),
            AppError::Chat(ContextorError::Timeout { stage, after })
            | AppError::Files(FileStoreError::Timeout { op: stage, after }) => json!({
                "stage": stage,
                "after_ms": after.as_millis() as u64,
            }),
            _ => Value::Null,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    details: Value,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        error!(status = status.as_u16(), code, error = %self, "request failed");

        let body = ErrorBody {
            error: self.to_string(),
            code,
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        let status = match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        AppError::Rejected {
            status,
            message: err.body_text(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(err: PathRejection) -> Self {
        AppError::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: err.body_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contextor::BudgetLimit;
    use std::time::Duration;

    #[test]
    fn status_mapping_follows_error_kind() {
        let cases: Vec<(AppError, StatusCode, &str)> = vec![
            (
                FileStoreError::Validation("empty".into()).into(),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                ContextorError::Validation("empty".into()).into(),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (FileStoreError::NotFound(9).into(), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                ContextorError::BudgetExceeded {
                    total: 7000,
                    limit: 6000,
                    kind: BudgetLimit::RateLimit,
                }
                .into(),
                StatusCode::PAYLOAD_TOO_LARGE,
                "BUDGET_EXCEEDED",
            ),
            (
                ContextorError::Timeout {
                    stage: "completion",
                    after: Duration::from_secs(30),
                }
                .into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "UPSTREAM_TIMEOUT",
            ),
            (
                RagError::Qdrant("down".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "UPSTREAM_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status, "{err}");
            assert_eq!(err.error_code(), code, "{err}");
        }
    }

    #[test]
    fn budget_details_carry_the_numbers() {
        let err: AppError = ContextorError::BudgetExceeded {
            total: 9000,
            limit: 8192,
            kind: BudgetLimit::ContextWindow,
        }
        .into();
        let d = err.details();
        assert_eq!(d["total_tokens"], 9000);
        assert_eq!(d["limit"], 8192);
        assert_eq!(d["limit_kind"], "context window");
    }
}
