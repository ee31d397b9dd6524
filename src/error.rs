use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use crate::response::{self, FieldError};
use crate::services::accounts::AccountError;
use crate::services::catalog::CatalogError;
use crate::services::ledger::LedgerError;

/// Единая ошибка HTTP-слоя; каждая ошибка сервисов сводится к ней.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // детали наружу не отдаём, только в лог
        match &self {
            AppError::Database(e) => error!(error = ?e, "database error"),
            AppError::Internal(msg) => error!(message = %msg, "internal error"),
            _ => {}
        }

        let message = self.public_message();
        let errors = match self {
            AppError::Validation(errors) => Some(errors),
            _ => None,
        };

        response::failure(status, message, errors)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, list)| {
                list.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {field}")),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(fields)
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(_) => AppError::NotFound(err.to_string()),
            LedgerError::Forbidden(_) => AppError::Forbidden(err.to_string()),
            LedgerError::Internal(e) => AppError::Database(e),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound => AppError::NotFound(err.to_string()),
            CatalogError::Database(e) => AppError::Database(e),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::EmailTaken => AppError::BadRequest(err.to_string()),
            AccountError::InvalidCredentials => AppError::Unauthorized(err.to_string()),
            AccountError::NotFound => AppError::NotFound(err.to_string()),
            AccountError::Database(e) => AppError::Database(e),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ledger::{Action, Resource};
    use validator::Validate;

    #[test]
    fn ledger_errors_map_to_http_statuses() {
        let cases = [
            (LedgerError::NotFound(Resource::Workshop), StatusCode::NOT_FOUND),
            (LedgerError::NotFound(Resource::Booking), StatusCode::NOT_FOUND),
            (LedgerError::Forbidden(Action::Cancel), StatusCode::FORBIDDEN),
            (LedgerError::PastEvent(Action::Book), StatusCode::BAD_REQUEST),
            (LedgerError::DuplicateBooking, StatusCode::BAD_REQUEST),
            (LedgerError::CapacityExceeded, StatusCode::BAD_REQUEST),
            (LedgerError::AlreadyCancelled, StatusCode::BAD_REQUEST),
            (LedgerError::AlreadyCompleted, StatusCode::BAD_REQUEST),
            (LedgerError::EventNotStarted, StatusCode::BAD_REQUEST),
            (LedgerError::Internal(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test]
    fn business_messages_pass_through() {
        let err = AppError::from(LedgerError::CapacityExceeded);
        assert_eq!(err.public_message(), "Workshop is fully booked");
    }

    #[test]
    fn storage_details_are_hidden() {
        let err = AppError::from(LedgerError::Internal(sqlx::Error::PoolTimedOut));
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn account_errors_map_to_http_statuses() {
        assert_eq!(AppError::from(AccountError::EmailTaken).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(AccountError::InvalidCredentials).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::from(AccountError::NotFound).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn catalog_errors_map_to_http_statuses() {
        assert_eq!(AppError::from(CatalogError::NotFound).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::from(CatalogError::HasBookings).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(CatalogError::CapacityBelowBookings(3)).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 3, message = "too short"))]
        name: String,
        #[validate(range(min = 1))]
        count: i32,
    }

    #[test]
    fn validation_errors_are_listed_per_field() {
        let errors = Probe { name: "a".into(), count: 0 }.validate().unwrap_err();
        match AppError::from(errors) {
            AppError::Validation(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].field, "count");
                assert_eq!(fields[0].message, "Invalid value for count");
                assert_eq!(fields[1].field, "name");
                assert_eq!(fields[1].message, "too short");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
