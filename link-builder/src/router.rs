use std::future::ready;

use axum::{
    http::{Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::api::endpoints::{generate_links, options, stats};
use crate::metrics_utils::{setup_metrics_recorder, track_metrics};
use crate::state::State;

// A few thousand PIDs plus the rest of the request fit well below this
const MAX_BODY_SIZE: usize = 1024 * 1024;

pub fn router(state: State) -> Router {
    let enable_metrics = state.enable_metrics;

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .allow_origin(AllowOrigin::mirror_request());

    let status_router = Router::new()
        .route("/_readiness", get(|| ready(StatusCode::OK)))
        .route("/_liveness", get(|| ready(StatusCode::OK)));

    let links_router = Router::new()
        .route("/links", post(generate_links))
        .route("/links/", post(generate_links))
        .route("/options", get(options))
        .route("/stats", get(stats));

    let router = Router::new()
        .merge(status_router)
        .merge(links_router)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    if enable_metrics {
        let recorder_handle = setup_metrics_recorder();
        router
            .route("/metrics", get(move || ready(recorder_handle.render())))
            .layer(axum::middleware::from_fn(track_metrics))
    } else {
        router
    }
}
