//! HTTP surface for citizen-registry.
//!
//! Two routers share the handlers in [`handlers`] and a single store:
//!
//! - `/api/citizens...` addresses records by national ID and lists newest
//!   first.
//! - `/citizens...` (optional, `server.legacy_routes`) addresses records by
//!   their storage id and lists in insertion order.
//!
//! `GET /health` is always mounted.

mod envelope;
pub mod handlers;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::storage::{CitizenStore, RecordKey};

pub use envelope::{ApiError, Envelope, Payload};

/// How path keys on a router are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// Path keys are national IDs.
    NationalId,
    /// Path keys are storage record ids.
    RecordId,
}

impl Addressing {
    /// Turn a path segment into a record key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedKey`] for a record-id router when the
    /// segment is not a valid id.
    pub fn key(self, raw: String) -> Result<RecordKey> {
        match self {
            Self::NationalId => Ok(RecordKey::NationalId(raw)),
            Self::RecordId => RecordKey::parse_record_id(&raw),
        }
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub(crate) store: Arc<dyn CitizenStore>,
    pub(crate) addressing: Addressing,
}

impl AppState {
    /// Bundle a store with an addressing mode.
    #[must_use]
    pub fn new(store: Arc<dyn CitizenStore>, addressing: Addressing) -> Self {
        Self { store, addressing }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store.name())
            .field("addressing", &self.addressing)
            .finish()
    }
}

fn citizen_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/citizens",
            get(handlers::list_citizens).post(handlers::create_citizen),
        )
        .route("/citizens/findOne", post(handlers::find_one))
        .route(
            "/citizens/:key",
            get(handlers::get_citizen)
                .put(handlers::update_citizen)
                .delete(handlers::delete_citizen),
        )
        .with_state(state)
}

/// Build the application router over a store.
pub fn router(store: Arc<dyn CitizenStore>, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .nest(
            "/api",
            citizen_routes(AppState::new(Arc::clone(&store), Addressing::NationalId)),
        );

    if config.legacy_routes {
        app = app.merge(citizen_routes(AppState::new(store, Addressing::RecordId)));
    }

    app.fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
}

/// Serve `app` on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish after the signal.
///
/// # Errors
///
/// Returns an error if the listener fails.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_national_id_addressing_takes_any_text() {
        assert_eq!(
            Addressing::NationalId.key("findme 1".to_string()).unwrap(),
            RecordKey::NationalId("findme 1".to_string())
        );
    }

    #[test]
    fn test_record_id_addressing_parses() {
        assert_eq!(
            Addressing::RecordId.key("12".to_string()).unwrap(),
            RecordKey::RecordId(12)
        );
        assert!(Addressing::RecordId.key("x".to_string()).is_err());
    }

    #[test]
    fn test_app_state_debug_names_backend() {
        let state = AppState::new(Arc::new(MemoryStore::new()), Addressing::RecordId);
        let debug = format!("{state:?}");
        assert!(debug.contains("memory"));
        assert!(debug.contains("RecordId"));
    }

    #[test]
    fn test_router_builds_with_and_without_legacy_routes() {
        let store: Arc<dyn CitizenStore> = Arc::new(MemoryStore::new());
        let mut config = ServerConfig::default();
        let _ = router(Arc::clone(&store), &config);

        config.legacy_routes = false;
        let _ = router(store, &config);
    }
}
