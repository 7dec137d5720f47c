//! Response envelope and error responses.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::Error;
use crate::record::Citizen;

/// Body of every API response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// Whether the request succeeded.
    pub ok: bool,
    /// Human-readable outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Number of records in `data`, for listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// One record or a list of records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
    /// National ID of a deleted record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Record payload of an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// A single record.
    One(Box<Citizen>),
    /// A list of records.
    Many(Vec<Citizen>),
}

impl Envelope {
    /// A bare success.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            ok: true,
            message: None,
            count: None,
            data: None,
            key: None,
        }
    }

    /// A failure carrying a message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    /// A single record.
    #[must_use]
    pub fn record(citizen: Citizen) -> Self {
        Self {
            data: Some(Payload::One(Box::new(citizen))),
            ..Self::ok()
        }
    }

    /// A listing with its count.
    #[must_use]
    pub fn list(citizens: Vec<Citizen>) -> Self {
        Self {
            count: Some(citizens.len()),
            data: Some(Payload::Many(citizens)),
            ..Self::ok()
        }
    }

    /// Confirmation of a deletion.
    #[must_use]
    pub fn deleted(national_id: impl Into<String>) -> Self {
        Self {
            message: Some("Citizen deleted".to_string()),
            key: Some(national_id.into()),
            ..Self::ok()
        }
    }

    /// Attach a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Error returned by HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A crate error; status and message come from the error itself.
    Store(Error),
    /// A request the handler rejected before touching storage.
    BadRequest(String),
    /// A body, query string or path an extractor refused.
    Rejected {
        /// Status chosen by the extractor.
        status: StatusCode,
        /// Extractor message.
        message: String,
    },
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Store(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) => {
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } => *status,
        }
    }

    /// Message shown to the client. Storage failures never leak driver text.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Store(err) => err.client_message(),
            Self::BadRequest(message) | Self::Rejected { message, .. } => message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                Self::Store(err) => error!("Request failed: {err}"),
                other => error!("Request failed: {}", other.message()),
            }
        } else {
            debug!("Rejected request ({status}): {}", self.message());
        }

        (status, Json(Envelope::error(self.message()))).into_response()
    }
}
