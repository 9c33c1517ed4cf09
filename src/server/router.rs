use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::db::store::OptOutStore;
use crate::server::handlers::{preferences_form, update_preferences};

#[derive(Clone)]
pub struct PrefsState {
    pub store: Arc<dyn OptOutStore>,
}

impl PrefsState {
    pub fn new(store: impl OptOutStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

pub fn prefs_router(state: PrefsState) -> Router {
    Router::new()
        .route("/preferences", get(preferences_form).post(update_preferences))
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
