use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::Utc;
use reqwest::Method;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::BackendClient;

use crate::models::{
    BulkDeleteResult, CreateExamRequest, Exam, ExamFileUpload, UpdateExamRequest,
};

/// CRUD over exam records plus the blob-storage file variant. All real
/// consistency logic lives in the backend; these are sequential request
/// wrappers.
pub struct ExamService {
    backend: BackendClient,
}

impl ExamService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            backend: BackendClient::new(config),
        }
    }

    pub async fn create_exam(
        &self,
        request: CreateExamRequest,
        auth_token: &str,
    ) -> Result<Exam> {
        debug!("Creating exam for patient: {}", request.patient_id);

        if request.title.is_empty() {
            return Err(anyhow!("Exam title cannot be empty"));
        }

        let exam_data = json!({
            "patient_id": request.patient_id,
            "title": request.title,
            "exam_type": request.exam_type,
            "notes": request.notes,
            "performed_at": request.performed_at,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.backend.request_with_headers(
            Method::POST,
            "/rest/v1/exams",
            Some(auth_token),
            Some(exam_data),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create exam"));
        }

        let exam: Exam = serde_json::from_value(result[0].clone())?;
        debug!("Exam created with ID: {}", exam.id);

        Ok(exam)
    }

    pub async fn get_exam(&self, exam_id: &str, auth_token: &str) -> Result<Exam> {
        let path = format!("/rest/v1/exams?id=eq.{}", exam_id);
        let result: Vec<Value> = self.backend.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Exam not found"));
        }

        let exam: Exam = serde_json::from_value(result[0].clone())?;
        Ok(exam)
    }

    pub async fn get_patient_exams(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Exam>> {
        debug!("Fetching exams for patient: {}", patient_id);

        let path = format!(
            "/rest/v1/exams?patient_id=eq.{}&order=created_at.desc",
            patient_id
        );
        let result: Vec<Value> = self.backend.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let exams: Vec<Exam> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Exam>, _>>()?;

        Ok(exams)
    }

    pub async fn update_exam(
        &self,
        exam_id: &str,
        request: UpdateExamRequest,
        auth_token: &str,
    ) -> Result<Exam> {
        debug!("Updating exam: {}", exam_id);

        let mut update_data = serde_json::Map::new();

        if let Some(title) = request.title {
            if title.is_empty() {
                return Err(anyhow!("Exam title cannot be empty"));
            }
            update_data.insert("title".to_string(), json!(title));
        }
        if let Some(exam_type) = request.exam_type {
            update_data.insert("exam_type".to_string(), json!(exam_type));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        if let Some(performed_at) = request.performed_at {
            update_data.insert("performed_at".to_string(), json!(performed_at));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/exams?id=eq.{}", exam_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.backend.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to update exam"));
        }

        let exam: Exam = serde_json::from_value(result[0].clone())?;
        Ok(exam)
    }

    pub async fn delete_exam(&self, exam_id: &str, auth_token: &str) -> Result<()> {
        debug!("Deleting exam: {}", exam_id);

        let path = format!("/rest/v1/exams?id=eq.{}", exam_id);
        let _: Vec<Value> = self.backend.request(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(())
    }

    /// Upload an exam file to blob storage and record its public URL on
    /// the exam row.
    pub async fn upload_exam_file(
        &self,
        exam_id: &str,
        upload: ExamFileUpload,
        auth_token: &str,
    ) -> Result<Exam> {
        debug!("Uploading file for exam: {}", exam_id);

        let exam = self.get_exam(exam_id, auth_token).await?;

        // Accept both raw base64 and data-URL payloads.
        let base64_data = if upload.file_data.contains(";base64,") {
            upload.file_data.split(";base64,").nth(1).unwrap_or(&upload.file_data)
        } else {
            &upload.file_data
        };

        let file_data = BASE64
            .decode(base64_data)
            .map_err(|e| anyhow!("Failed to decode base64 data: {}", e))?;

        let file_id = Uuid::new_v4().to_string();
        let file_ext = if upload.file_type.contains('/') {
            upload.file_type.split('/').next_back().unwrap_or("bin")
        } else {
            upload.file_type.as_str()
        };

        let filename = format!("{}/{}.{}", exam.patient_id, file_id, file_ext);
        let storage_path = format!("/storage/v1/object/exam-files/{}", filename);

        let _: Value = self.backend.request(
            Method::POST,
            &storage_path,
            Some(auth_token),
            Some(json!({
                "data": file_data,
                "contentType": upload.file_type
            })),
        ).await?;

        let public_path = format!("/storage/v1/object/public/exam-files/{}", filename);
        let public_url = self.backend.get_public_url(&public_path);
        debug!("Exam file stored at: {}", public_url);

        let path = format!("/rest/v1/exams?id=eq.{}", exam_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.backend.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({
                "file_url": public_url,
                "updated_at": Utc::now().to_rfc3339()
            })),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to record exam file URL"));
        }

        let updated: Exam = serde_json::from_value(result[0].clone())?;
        Ok(updated)
    }

    /// Delete a batch of exams one by one. The first failure aborts the
    /// run; already-deleted rows stay deleted.
    pub async fn bulk_delete(
        &self,
        exam_ids: &[Uuid],
        auth_token: &str,
    ) -> Result<BulkDeleteResult> {
        debug!("Bulk deleting {} exams", exam_ids.len());

        let mut deleted = 0;
        for exam_id in exam_ids {
            self.delete_exam(&exam_id.to_string(), auth_token).await?;
            deleted += 1;
        }

        Ok(BulkDeleteResult {
            deleted,
            requested: exam_ids.len(),
        })
    }
}
