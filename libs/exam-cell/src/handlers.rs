use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{BulkDeleteRequest, CreateExamRequest, ExamFileUpload, UpdateExamRequest};
use crate::services::ExamService;

#[derive(Debug, Deserialize)]
pub struct ExamListQuery {
    pub patient_id: String,
}

// Clinical staff manage exam records; patients only read their own.
fn is_clinical_staff(user: &User) -> bool {
    user.is_admin() || user.is_doctor() || user.is_receptionist()
}

fn map_service_error(e: anyhow::Error) -> AppError {
    let msg = e.to_string();
    if msg.contains("not found") {
        AppError::NotFound(msg)
    } else if msg.contains("cannot be empty") || msg.contains("base64") {
        AppError::Validation(msg)
    } else {
        AppError::Internal(msg)
    }
}

#[axum::debug_handler]
pub async fn create_exam(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateExamRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !is_clinical_staff(&user) {
        return Err(AppError::Auth("Only clinical staff can create exam records".to_string()));
    }

    let exam_service = ExamService::new(&state);

    let exam = exam_service
        .create_exam(request, token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(exam)))
}

#[axum::debug_handler]
pub async fn get_exam(
    State(state): State<Arc<AppConfig>>,
    Path(exam_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let exam_service = ExamService::new(&state);

    let exam = exam_service
        .get_exam(&exam_id, token)
        .await
        .map_err(|_| AppError::NotFound("Exam not found".to_string()))?;

    if !is_clinical_staff(&user) && user.id != exam.patient_id.to_string() {
        return Err(AppError::Auth("Not authorized to view this exam".to_string()));
    }

    Ok(Json(json!(exam)))
}

#[axum::debug_handler]
pub async fn list_exams(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<ExamListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !is_clinical_staff(&user) && user.id != query.patient_id {
        return Err(AppError::Auth("Not authorized to list exams for this patient".to_string()));
    }

    let exam_service = ExamService::new(&state);

    let exams = exam_service
        .get_patient_exams(&query.patient_id, token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "patient_id": query.patient_id,
        "exams": exams,
        "total": exams.len()
    })))
}

#[axum::debug_handler]
pub async fn update_exam(
    State(state): State<Arc<AppConfig>>,
    Path(exam_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateExamRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !is_clinical_staff(&user) {
        return Err(AppError::Auth("Only clinical staff can update exam records".to_string()));
    }

    let exam_service = ExamService::new(&state);

    let exam = exam_service
        .update_exam(&exam_id, request, token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(exam)))
}

#[axum::debug_handler]
pub async fn delete_exam(
    State(state): State<Arc<AppConfig>>,
    Path(exam_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !is_clinical_staff(&user) {
        return Err(AppError::Auth("Only clinical staff can delete exam records".to_string()));
    }

    let exam_service = ExamService::new(&state);

    exam_service
        .delete_exam(&exam_id, token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({ "success": true })))
}

#[axum::debug_handler]
pub async fn upload_exam_file(
    State(state): State<Arc<AppConfig>>,
    Path(exam_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(upload): Json<ExamFileUpload>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !is_clinical_staff(&user) {
        return Err(AppError::Auth("Only clinical staff can upload exam files".to_string()));
    }

    let exam_service = ExamService::new(&state);

    let exam = exam_service
        .upload_exam_file(&exam_id, upload, token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(exam)))
}

#[axum::debug_handler]
pub async fn bulk_delete_exams(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BulkDeleteRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !is_clinical_staff(&user) {
        return Err(AppError::Auth("Only clinical staff can delete exam records".to_string()));
    }

    let exam_service = ExamService::new(&state);

    let result = exam_service
        .bulk_delete(&request.exam_ids, token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(result)))
}
