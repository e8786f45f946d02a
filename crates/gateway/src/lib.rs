pub mod config;
pub mod cors;
pub mod logging;
pub mod routes;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use cors::AllowedOrigins;
use state::AppState;

pub fn router(state: AppState, origins: &AllowedOrigins) -> Router {
    let predict = post(routes::predict).layer(DefaultBodyLimit::max(state.max_upload_bytes));

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/predict", predict)
        .with_state(state)
        .layer(origins.layer())
}
