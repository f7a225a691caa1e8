use actix_web::{http::StatusCode, HttpResponse, ResponseError};

use crate::controllers::ErrorBody;

/// Error taxonomy for the binding lifecycle. The request-facing variants map
/// to 4xx responses; anything internal is collapsed to a 500 without leaking
/// details to the client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    DataUnavailable(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Configuration(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        match e {
            DieselError::NotFound => Error::NotFound("Binding not found.".to_string()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => Error::Conflict(
                "A binding for this room already exists for the device.".to_string(),
            ),
            other => Error::Internal(anyhow::anyhow!("database error: {}", other)),
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::DataUnavailable(_)
            | Error::Conflict(_)
            | Error::Configuration(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let reason = match self {
            Error::Internal(e) => {
                tracing::error!(
                    target = module_path!(),
                    error = e.to_string(),
                    "Internal error"
                );
                "Internal server error.".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorBody { reason })
    }
}
