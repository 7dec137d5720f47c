//! Request handlers for the citizen routes.
//!
//! Storage calls are synchronous, so every handler hands its store call to
//! the blocking pool and maps the outcome onto an [`Envelope`].

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::envelope::{ApiError, Envelope};
use super::{Addressing, AppState};
use crate::error::{Error, Result};
use crate::normalize;
use crate::storage::{CitizenStore, ListFilter, RecordKey};

const FIND_ONE_USAGE: &str = "Provide id OR nic/NDI_ID OR email to search";

/// Handler result: a status with an envelope, or an [`ApiError`].
pub type Reply = std::result::Result<(StatusCode, Json<Envelope>), ApiError>;

/// Path key segment, with extractor failures kept for the envelope.
pub type PathKey = std::result::Result<Path<String>, PathRejection>;

/// Query parameters accepted by the listing route.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring of any name field.
    pub name: Option<String>,
    /// National ID, wire spelling.
    pub nic: Option<String>,
    /// National ID, canonical spelling.
    #[serde(rename = "nationalId")]
    pub national_id: Option<String>,
    /// National ID, form spelling.
    #[serde(rename = "NDI_ID")]
    pub ndi_id: Option<String>,
    /// Exact email.
    pub email: Option<String>,
}

impl ListQuery {
    fn into_filter(self, newest_first: bool) -> ListFilter {
        ListFilter {
            national_id: non_blank(self.nic)
                .or_else(|| non_blank(self.national_id))
                .or_else(|| non_blank(self.ndi_id)),
            email: non_blank(self.email),
            name: non_blank(self.name),
            newest_first,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn ok(status: StatusCode, envelope: Envelope) -> Reply {
    Ok((status, Json(envelope)))
}

/// Run a store operation on the blocking pool.
async fn with_store<T, F>(state: &AppState, op: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce(&dyn CitizenStore) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| Error::internal(format!("storage task failed: {e}")))?
        .map_err(ApiError::from)
}

/// `GET /health`
pub async fn health() -> Json<Envelope> {
    Json(Envelope::ok())
}

/// Fallback for unknown routes.
pub async fn not_found() -> (StatusCode, Json<Envelope>) {
    (StatusCode::NOT_FOUND, Json(Envelope::error("Route not found")))
}

/// `GET /citizens`
pub async fn list_citizens(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Reply {
    let Query(query) = query?;
    let filter = query.into_filter(state.addressing == Addressing::NationalId);
    let citizens = with_store(&state, move |store| store.list(&filter)).await?;
    ok(StatusCode::OK, Envelope::list(citizens))
}

/// `POST /citizens`
pub async fn create_citizen(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Reply {
    let Json(body) = body?;
    let new = normalize::normalize(&body).into_new_citizen()?;
    let created = with_store(&state, move |store| store.create(new)).await?;
    ok(
        StatusCode::CREATED,
        Envelope::record(created).with_message("Citizen created"),
    )
}

/// `GET /citizens/:key`
pub async fn get_citizen(State(state): State<AppState>, key: PathKey) -> Reply {
    let key = state.addressing.key(key?.0)?;
    let citizen = with_store(&state, move |store| store.get(&key)).await?;
    ok(StatusCode::OK, Envelope::record(citizen))
}

/// `PUT /citizens/:key`
///
/// Only supplied, non-empty fields are applied; the national ID never
/// changes.
pub async fn update_citizen(
    State(state): State<AppState>,
    key: PathKey,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Reply {
    let key = state.addressing.key(key?.0)?;
    let Json(body) = body?;
    let patch = normalize::normalize(&body).into_patch();
    if patch.is_empty() {
        debug!("Update of {key} carries no applicable fields");
    }
    let updated = with_store(&state, move |store| store.update(&key, &patch)).await?;
    ok(
        StatusCode::OK,
        Envelope::record(updated).with_message("Citizen updated"),
    )
}

/// `DELETE /citizens/:key`
pub async fn delete_citizen(State(state): State<AppState>, key: PathKey) -> Reply {
    let key = state.addressing.key(key?.0)?;
    let deleted = with_store(&state, move |store| store.delete(&key)).await?;
    ok(StatusCode::OK, Envelope::deleted(deleted.national_id))
}

/// `POST /citizens/findOne`
///
/// Looks up by `id`, then `nic`/`NDI_ID`, then `email`; the first one
/// present decides.
pub async fn find_one(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Reply {
    let Json(body) = body?;

    let citizen = if let Some(id) = record_id(&body) {
        let key = RecordKey::parse_record_id(&id)?;
        with_store(&state, move |store| store.get(&key)).await?
    } else if let Some(national_id) = normalize::national_id(&body) {
        let key = RecordKey::NationalId(national_id);
        with_store(&state, move |store| store.get(&key)).await?
    } else if let Some(email) = normalize::email(&body) {
        let filter = ListFilter {
            email: Some(email),
            ..ListFilter::default()
        };
        with_store(&state, move |store| store.list(&filter))
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NotFound)?
    } else {
        return Err(ApiError::BadRequest(FIND_ONE_USAGE.to_string()));
    };

    ok(StatusCode::OK, Envelope::record(citizen))
}

/// The `id` field of a lookup body, as text. Blank strings and nulls count
/// as absent; any other non-numeric value is passed on to fail parsing.
fn record_id(body: &Value) -> Option<String> {
    match body.get("id")? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
