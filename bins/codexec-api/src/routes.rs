// Router assembly for the Codexec API

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

/// Health and metrics are always served; the execution routes only when the
/// executor is enabled.
pub fn routes(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/status", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler));

    if state.engine.config().enabled {
        router = router
            .route("/code/call", post(handlers::call_code))
            .route("/code/execute", post(handlers::execute_code));
    }

    router.with_state(state)
}
