use axum::{routing::get, Router};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod compliance;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;

pub fn app(pool: PgPool) -> Router {
    Router::new()
        .merge(routes::users::routes(pool.clone()))
        .merge(routes::patients::routes(pool.clone()))
        .merge(routes::caregivers::routes(pool.clone()))
        .merge(routes::assignments::routes(pool.clone()))
        .merge(routes::plans::routes(pool.clone()))
        .merge(routes::logs::routes(pool.clone()))
        .merge(routes::subscriptions::routes(pool.clone()))
        .merge(routes::documents::routes(pool.clone()))
        .merge(routes::notifications::routes(pool.clone()))
        .merge(routes::compliance::routes(pool))
        .route("/health", get(|| async { "✅ Backend up" }))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
