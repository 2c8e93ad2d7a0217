use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A medical exam record. The file itself lives in the backend's blob
/// storage; only the public URL is kept on the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub exam_type: String,
    pub file_url: Option<String>,
    pub notes: Option<String>,
    pub performed_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExamRequest {
    pub patient_id: Uuid,
    pub title: String,
    pub exam_type: String,
    pub notes: Option<String>,
    pub performed_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateExamRequest {
    pub title: Option<String>,
    pub exam_type: Option<String>,
    pub notes: Option<String>,
    pub performed_at: Option<NaiveDate>,
}

/// Base64-encoded exam file destined for blob storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamFileUpload {
    pub file_data: String,
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDeleteRequest {
    pub exam_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDeleteResult {
    pub deleted: usize,
    pub requested: usize,
}
