// libs/exam-cell/tests/integration_test.rs

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use exam_cell::router::exam_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, TestUser};

fn test_config(backend_url: &str) -> AppConfig {
    AppConfig {
        backend_url: backend_url.to_string(),
        backend_anon_key: "test-anon-key".to_string(),
        jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
    }
}

async fn create_test_app(config: AppConfig) -> Router {
    exam_routes(Arc::new(config))
}

fn exam_row(id: &Uuid, patient_id: &Uuid, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "patient_id": patient_id,
        "title": title,
        "exam_type": "blood_panel",
        "file_url": null,
        "notes": null,
        "performed_at": "2024-06-01",
        "created_at": Utc::now().to_rfc3339(),
        "updated_at": Utc::now().to_rfc3339()
    })
}

#[tokio::test]
async fn exam_creation_requires_authentication() {
    let mock_server = MockServer::start().await;

    let app = create_test_app(test_config(&mock_server.uri())).await;

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({
                "patient_id": Uuid::new_v4(),
                "title": "Chest X-ray",
                "exam_type": "imaging"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn doctor_can_create_exam_through_router() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4();

    let config = test_config(&mock_server.uri());
    let doctor = TestUser::doctor("doc@example.com");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));

    Mock::given(method("POST"))
        .and(path("/rest/v1/exams"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            exam_row(&Uuid::new_v4(), &patient_id, "Chest X-ray")
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::from(
            json!({
                "patient_id": patient_id,
                "title": "Chest X-ray",
                "exam_type": "imaging"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json_response["title"], "Chest X-ray");
    assert_eq!(json_response["patient_id"], patient_id.to_string());
}

#[tokio::test]
async fn patient_cannot_create_exam_through_router() {
    let mock_server = MockServer::start().await;

    let config = test_config(&mock_server.uri());
    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));

    let app = create_test_app(config).await;

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::from(
            json!({
                "patient_id": Uuid::new_v4(),
                "title": "Chest X-ray",
                "exam_type": "imaging"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bulk_delete_routes_to_bulk_handler() {
    let mock_server = MockServer::start().await;

    let config = test_config(&mock_server.uri());
    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(24));

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/exams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;

    // "bulk-delete" must not be captured by the /{exam_id} routes.
    let request = Request::builder()
        .method("POST")
        .uri("/bulk-delete")
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::from(
            json!({ "exam_ids": [Uuid::new_v4(), Uuid::new_v4()] }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json_response["deleted"], 2);
    assert_eq!(json_response["requested"], 2);
}

#[tokio::test]
async fn patient_can_fetch_own_exam_through_router() {
    let mock_server = MockServer::start().await;
    let exam_id = Uuid::new_v4();

    let config = test_config(&mock_server.uri());
    let patient = TestUser::patient("patient@example.com");
    let patient_id = Uuid::parse_str(&patient.id).unwrap();
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/exams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            exam_row(&exam_id, &patient_id, "Lipid panel")
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;

    let request = Request::builder()
        .method("GET")
        .uri(&format!("/{}", exam_id))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json_response["id"], exam_id.to_string());
}
