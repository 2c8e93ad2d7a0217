use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn exam_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_exam))
        .route("/", get(handlers::list_exams))
        .route("/bulk-delete", post(handlers::bulk_delete_exams))
        .route("/{exam_id}", get(handlers::get_exam))
        .route("/{exam_id}", put(handlers::update_exam))
        .route("/{exam_id}", delete(handlers::delete_exam))
        .route("/{exam_id}/file", post(handlers::upload_exam_file))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
