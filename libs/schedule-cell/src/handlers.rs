use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateExceptionRequest, CreateRuleRequest, ScheduleError, UpdateRuleRequest};
use crate::services::{AvailabilityService, ScheduleService};

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

// Schedule configuration is restricted to the doctor themself and
// front-desk staff.
fn can_manage_schedule(user: &User, doctor_id: &str) -> bool {
    user.is_admin() || user.is_receptionist() || user.id == doctor_id
}

fn map_service_error(e: anyhow::Error) -> AppError {
    if let Some(validation) = e.downcast_ref::<ScheduleError>() {
        return AppError::Validation(validation.to_string());
    }
    let msg = e.to_string();
    if msg.contains("already exists") {
        AppError::Conflict(msg)
    } else if msg.contains("not found") {
        AppError::NotFound(msg)
    } else {
        AppError::Internal(msg)
    }
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn get_day_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = Uuid::parse_str(&doctor_id)
        .map_err(|_| AppError::BadRequest(format!("Invalid doctor id: {}", doctor_id)))?;

    let availability_service = AvailabilityService::new(&state);

    let availability = availability_service
        .check_day(doctor_id, query.date, None)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "doctor_id": availability.doctor_id,
        "date": availability.date,
        "blocked": availability.blocked,
        "reason": availability.reason,
        "slots": availability.slots,
        "total_slots": availability.slots.len()
    })))
}

#[axum::debug_handler]
pub async fn get_schedule_rules_public(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    let rules = schedule_service
        .get_rules(&doctor_id, None)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "rules": rules,
        "total": rules.len()
    })))
}

// ==============================================================================
// SCHEDULE RULE HANDLERS (PROTECTED)
// ==============================================================================

#[axum::debug_handler]
pub async fn create_rule(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateRuleRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !can_manage_schedule(&user, &doctor_id) {
        return Err(AppError::Auth("Not authorized to manage this doctor's schedule".to_string()));
    }

    let schedule_service = ScheduleService::new(&state);

    let rule = schedule_service
        .create_rule(&doctor_id, request, token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(rule)))
}

#[axum::debug_handler]
pub async fn update_rule(
    State(state): State<Arc<AppConfig>>,
    Path((doctor_id, rule_id)): Path<(String, String)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateRuleRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !can_manage_schedule(&user, &doctor_id) {
        return Err(AppError::Auth("Not authorized to manage this doctor's schedule".to_string()));
    }

    let schedule_service = ScheduleService::new(&state);

    let updated = schedule_service
        .update_rule(&rule_id, request, token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(updated)))
}

#[axum::debug_handler]
pub async fn delete_rule(
    State(state): State<Arc<AppConfig>>,
    Path((doctor_id, rule_id)): Path<(String, String)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !can_manage_schedule(&user, &doctor_id) {
        return Err(AppError::Auth("Not authorized to manage this doctor's schedule".to_string()));
    }

    let schedule_service = ScheduleService::new(&state);

    schedule_service
        .delete_rule(&rule_id, token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({ "success": true })))
}

// ==============================================================================
// SCHEDULE EXCEPTION HANDLERS (PROTECTED)
// ==============================================================================

#[axum::debug_handler]
pub async fn create_exception(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateExceptionRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !can_manage_schedule(&user, &doctor_id) {
        return Err(AppError::Auth("Not authorized to manage this doctor's schedule".to_string()));
    }

    let schedule_service = ScheduleService::new(&state);

    let exception = schedule_service
        .create_exception(&doctor_id, request, token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(exception)))
}

#[axum::debug_handler]
pub async fn get_exceptions(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !can_manage_schedule(&user, &doctor_id) {
        return Err(AppError::Auth("Not authorized to view this doctor's exceptions".to_string()));
    }

    let schedule_service = ScheduleService::new(&state);

    let exceptions = schedule_service
        .get_exceptions(&doctor_id, token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "exceptions": exceptions,
        "total": exceptions.len()
    })))
}

#[axum::debug_handler]
pub async fn delete_exception(
    State(state): State<Arc<AppConfig>>,
    Path((doctor_id, exception_id)): Path<(String, String)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !can_manage_schedule(&user, &doctor_id) {
        return Err(AppError::Auth("Not authorized to manage this doctor's schedule".to_string()));
    }

    let schedule_service = ScheduleService::new(&state);

    schedule_service
        .delete_exception(&exception_id, token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({ "success": true })))
}
