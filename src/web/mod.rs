//! JSON endpoints the browser front end drives.

pub mod download;
pub mod form;
pub mod history;
pub mod presets;
pub mod sessions;
pub mod settings;
pub mod storage;
pub mod trigger;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::app::AppState;

pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/storage/list",
            get(storage::list_configured).post(storage::list_with_credentials),
        )
        .route("/api/trigger/single", post(trigger::trigger_single))
        .route("/api/trigger/batch", post(trigger::trigger_batch))
        .route("/api/download", get(download::download))
        .route("/api/presets", get(presets::list_presets))
        .route("/api/sessions/single", post(sessions::start_single))
        .route("/api/sessions/batch", post(sessions::start_batch))
        .route("/api/sessions/{id}", get(sessions::get_session))
        .route("/api/sessions/{id}/retry", post(sessions::retry_session))
        .route(
            "/api/settings",
            get(settings::get_settings)
                .put(settings::save_settings)
                .delete(settings::clear_settings),
        )
        .route(
            "/api/history",
            get(history::list_history).delete(history::clear_history),
        )
        .route("/api/history/stats", get(history::history_stats))
        .route("/api/history/{id}", delete(history::delete_entry))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
