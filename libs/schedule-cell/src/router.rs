use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn schedule_routes(state: Arc<AppConfig>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/{doctor_id}/availability", get(handlers::get_day_availability))
        .route("/{doctor_id}/rules", get(handlers::get_schedule_rules_public));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/{doctor_id}/rules", post(handlers::create_rule))
        .route("/{doctor_id}/rules/{rule_id}", put(handlers::update_rule))
        .route("/{doctor_id}/rules/{rule_id}", delete(handlers::delete_rule))
        .route("/{doctor_id}/exceptions", post(handlers::create_exception))
        .route("/{doctor_id}/exceptions", get(handlers::get_exceptions))
        .route("/{doctor_id}/exceptions/{exception_id}", delete(handlers::delete_exception))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
