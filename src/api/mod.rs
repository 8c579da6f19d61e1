pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{config::Settings, service::ServiceContext};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Auth routes
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/register", post(handlers::auth::register))

        // Public lookups
        .route("/organization/:code/fees/", get(handlers::organizations::fees))
        .route("/receipt/verify/:or_number", get(handlers::receipts::verify))

        .merge(portal_routes(app_state.clone()))
        .nest("/admin", admin_routes(app_state.clone()))

        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Everything behind a session: student and officer pages alike. Each
/// handler checks which profile it needs.
fn portal_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard/student/", get(handlers::dashboard::student_dashboard))
        .route("/dashboard/officer/", get(handlers::dashboard::officer_dashboard))
        .nest("/payment", payment_routes())
        .route("/profile/update/", post(handlers::profile::update))
        .route("/api/payment-status/", get(handlers::payments::payment_status))
        .route("/fees/", post(handlers::fees::create))
        .route("/fees/:id/update/", post(handlers::fees::update))
        .route("/fees/:id/deactivate/", post(handlers::fees::deactivate))
        .route("/students/", get(handlers::students::list))
        .route("/officers/", get(handlers::officers::list))
        .route("/officers/promote/", post(handlers::officers::promote))
        .route("/officers/:id/demote/", post(handlers::officers::demote))
        .route("/reports/collections/", get(handlers::reports::collections))
        .route("/activity-log/", get(handlers::reports::activity_log))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/generate-qr/", post(handlers::payments::generate_qr))
        .route("/process/:request_id/", post(handlers::payments::process))
        .route("/cancel/:request_id/", post(handlers::payments::cancel))
        .route("/void/:id/", post(handlers::payments::void))
        .route("/history/", get(handlers::payments::history))
        .route("/search/", get(handlers::payments::search))
        .route("/:id/", get(handlers::payments::detail))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/expire-requests/", post(handlers::admin::expire_requests))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_super_officer,
        ))
}
