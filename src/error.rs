//! Application error type and its HTTP mapping
//!
//! Every data-access function returns [`AppError`]. Handlers propagate it with
//! `?` and axum turns it into a JSON body of the form
//! `{"error": "...", "code": "..."}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::model::FormStatus;

#[derive(Error, Debug)]
pub enum AppError {
    /// A required field was missing or blank. Raised before touching the store.
    #[error("{0}")]
    Validation(String),

    #[error("Missing or invalid identity")]
    Unauthorized,

    #[error("You are not the owner of this form")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Cannot change status of a {0} form")]
    InvalidTransition(FormStatus),

    #[error("Form is {0} and does not accept submissions")]
    NotAcceptingSubmissions(FormStatus),

    /// A stored document no longer matches its record type.
    #[error("Corrupt {table} document {key}: {source}")]
    Decode {
        table: &'static str,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] redb::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    /// Stable machine-readable code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::NotAcceptingSubmissions(_) => "not_accepting_submissions",
            AppError::Decode { .. } => "decode_error",
            AppError::Encode(_) => "encode_error",
            AppError::Store(_) => "store_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition(_) | AppError::NotAcceptingSubmissions(_) => {
                StatusCode::CONFLICT
            }
            AppError::Decode { .. } | AppError::Encode(_) | AppError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// redb splits its failures into one type per stage; fold them all into `Store`.
macro_rules! store_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AppError {
                fn from(err: $ty) -> Self {
                    AppError::Store(err.into())
                }
            }
        )*
    };
}

store_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the log; clients get a generic message.
        let message = if status.is_server_error() {
            error!(code = self.code(), "{self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(json!({
                "error": message,
                "code": self.code(),
            })),
        )
            .into_response()
    }
}
