use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{IntoMakeService, get},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::DeploymentImpl;

pub mod announcements;
pub mod billing;
pub mod children;
pub mod contracts;
pub mod coupons;
pub mod daily_records;
pub mod employees;
pub mod events;
pub mod expenses;
pub mod feed;
pub mod forecast;
pub mod health;
pub mod invoices;
pub mod messages;
pub mod nutrition;
pub mod pipeline;
pub mod storage;
pub mod subscriptions;

const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

pub fn app(deployment: DeploymentImpl) -> Router {
    let base_routes = Router::new()
        .route("/health", get(health::health_check))
        .merge(children::router(&deployment))
        .merge(daily_records::router(&deployment))
        .merge(messages::router(&deployment))
        .merge(announcements::router(&deployment))
        .merge(feed::router(&deployment))
        .merge(invoices::router(&deployment))
        .merge(billing::router(&deployment))
        .merge(subscriptions::router(&deployment))
        .merge(coupons::router(&deployment))
        .merge(contracts::router(&deployment))
        .merge(expenses::router(&deployment))
        .merge(employees::router(&deployment))
        .merge(nutrition::router(&deployment))
        .merge(forecast::router(&deployment))
        .merge(pipeline::router(&deployment))
        .merge(events::router(&deployment))
        .merge(storage::router(&deployment))
        .with_state(deployment.clone());

    Router::new()
        .nest("/api", base_routes)
        .nest_service("/storage", ServeDir::new(deployment.storage().root()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

pub fn router(deployment: DeploymentImpl) -> IntoMakeService<Router> {
    app(deployment).into_make_service()
}
