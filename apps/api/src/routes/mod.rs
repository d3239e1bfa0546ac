pub mod diagnostics;
pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::screening::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        // Scoring API
        .route(
            "/api/scoring/process-batch",
            post(handlers::handle_process_batch),
        )
        .route(
            "/api/scoring/status/:task_id",
            get(handlers::handle_task_status),
        )
        .route(
            "/api/scoring/results/:task_id",
            get(handlers::handle_task_results),
        )
        .route("/api/scoring/list-tasks", get(handlers::handle_list_tasks))
        .route("/api/scoring/tasks", delete(handlers::handle_clear_tasks))
        // Diagnostics
        .route("/api/test/llm", get(diagnostics::handle_llm_check))
        .route(
            "/api/test/extract-pdf",
            post(diagnostics::handle_extract_pdf),
        )
        .route(
            "/api/test/parse-resume",
            post(diagnostics::handle_parse_resume),
        )
        .route(
            "/api/test/parse-resume-file",
            post(diagnostics::handle_parse_resume_file),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use bytes::Bytes;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::llm_client::LlmClient;
    use crate::rate_limit;
    use crate::screening::extractor::{ExtractionError, TextExtractor};
    use crate::screening::orchestrator::Orchestrator;
    use crate::screening::parser::{ParseError, ResumeParser};
    use crate::screening::registry::{InMemoryTaskStore, TaskStore};
    use crate::screening::scorer::{BatchScorer, CandidateScorer, ScoreCard, ScoreError};
    use crate::screening::task::{Task, TaskStatus};

    const BOUNDARY: &str = "screener-test-boundary";

    struct EchoExtractor;

    #[async_trait]
    impl TextExtractor for EchoExtractor {
        async fn extract(&self, _filename: &str, bytes: Bytes) -> Result<String, ExtractionError> {
            Ok(String::from_utf8_lossy(&bytes).to_string())
        }
    }

    struct StaticParser;

    #[async_trait]
    impl ResumeParser for StaticParser {
        async fn parse(&self, _resume_text: &str) -> Result<Value, ParseError> {
            Ok(json!({"name": "Jane Doe", "skills": ["Rust"]}))
        }
    }

    struct StaticScorer;

    #[async_trait]
    impl CandidateScorer for StaticScorer {
        async fn score(&self, _jd: &str, _resume: &Value) -> Result<ScoreCard, ScoreError> {
            ScoreCard::from_value(json!({"match_score": 77, "overall_fit": "high"}))
        }
    }

    fn app() -> (Router, Arc<dyn TaskStore>) {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let extractor: Arc<dyn TextExtractor> = Arc::new(EchoExtractor);
        let parser: Arc<dyn ResumeParser> = Arc::new(StaticParser);
        let scorer = Arc::new(BatchScorer::new(
            Arc::new(StaticScorer),
            Duration::from_secs(15),
        ));
        let state = AppState {
            orchestrator: Orchestrator::new(store.clone(), extractor.clone(), parser.clone(), scorer),
            extractor,
            parser,
            llm: LlmClient::new("test-key".to_string()).unwrap(),
            root_limiter: rate_limit::per_minute(10),
        };
        (build_router(state), store)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn single_file_body(filename: &str, content: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
        )
    }

    fn multipart_post(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn multipart_body(job_description: Option<&str>, files: &[(&str, &str)]) -> String {
        let mut body = String::new();
        if let Some(jd) = job_description {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"job_description\"\r\n\r\n{jd}\r\n"
            ));
        }
        for (filename, content) in files {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn batch_request(body: String) -> Request<Body> {
        multipart_post("/api/scoring/process-batch", body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn fake_pdf() -> String {
        format!("%PDF-1.4 Jane Doe. Senior Rust engineer. {}", "Distributed systems. ".repeat(6))
    }

    #[tokio::test]
    async fn test_health_ok() {
        let (app, _) = app();
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_status_unknown_task_is_404() {
        let (app, _) = app();
        let uri = format!("/api/scoring/status/{}", Uuid::new_v4());
        let response = app.oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_status_malformed_id_is_404() {
        let (app, _) = app();
        let response = app
            .oneshot(get("/api/scoring/status/not-a-task"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_results_before_completion_is_400_with_status() {
        let (app, store) = app();
        let mut task = Task::new(Uuid::new_v4(), 2, "0.5 minutes".to_string());
        task.advance(TaskStatus::ExtractingText).unwrap();
        task.advance(TaskStatus::ParsingResumes).unwrap();
        task.advance(TaskStatus::ScoringCandidates).unwrap();
        let id = task.id;
        store.create(task).await.unwrap();

        let response = app
            .oneshot(get(&format!("/api/scoring/results/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "RESULTS_NOT_READY");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("scoring_candidates"));
    }

    #[tokio::test]
    async fn test_status_reports_stage_and_counts() {
        let (app, store) = app();
        let mut task = Task::new(Uuid::new_v4(), 3, "0.8 minutes".to_string());
        task.advance(TaskStatus::ExtractingText).unwrap();
        let id = task.id;
        store.create(task).await.unwrap();

        let response = app
            .oneshot(get(&format!("/api/scoring/status/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "extracting_text");
        assert_eq!(body["total_files"], 3);
        assert_eq!(body["processed"], 0);
        assert!(body["error"].is_null());
    }

    #[tokio::test]
    async fn test_process_batch_registers_task() {
        let (app, store) = app();
        let body = multipart_body(Some("Senior Rust engineer"), &[("jane.pdf", &fake_pdf())]);

        let response = app.oneshot(batch_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "processing_started");
        assert_eq!(body["total_resumes"], 1);
        assert_eq!(body["processing_rate"], "4 resumes per minute");

        let id: Uuid = body["task_id"].as_str().unwrap().parse().unwrap();
        assert!(store.get(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_process_batch_without_files_is_400() {
        let (app, _) = app();
        let response = app
            .oneshot(batch_request(multipart_body(Some("Rust engineer"), &[])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_process_batch_without_job_description_is_400() {
        let (app, _) = app();
        let response = app
            .oneshot(batch_request(multipart_body(None, &[("jane.pdf", &fake_pdf())])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_process_batch_with_only_invalid_files_is_400() {
        let (app, store) = app();
        let body = multipart_body(Some("Rust engineer"), &[("notes.txt", "just some notes")]);
        let response = app.oneshot(batch_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_and_clear_tasks() {
        let (app, store) = app();
        let task = Task::new(Uuid::new_v4(), 1, "0.2 minutes".to_string());
        let id = task.id;
        store.create(task).await.unwrap();

        let response = app
            .clone()
            .oneshot(get("/api/scoring/list-tasks"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["tasks"][id.to_string()]["status"], "processing");

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/scoring/tasks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await["cleared"], 1);
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_parse_resume_diagnostic() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/test/parse-resume")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"resume_text": "Jane Doe, Rust engineer"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["parsed"]["name"], "Jane Doe");
    }

    #[tokio::test]
    async fn test_parse_resume_diagnostic_accepts_form() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/test/parse-resume")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("resume_text=Jane+Doe%2C+Rust+engineer"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["parsed"]["name"], "Jane Doe");
    }

    #[tokio::test]
    async fn test_parse_resume_diagnostic_rejects_missing_text() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/test/parse-resume")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text": "wrong field"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_extract_pdf_diagnostic() {
        let (app, _) = app();
        let response = app
            .oneshot(multipart_post(
                "/api/test/extract-pdf",
                single_file_body("jane.pdf", &fake_pdf()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["filename"], "jane.pdf");
        assert_eq!(body["success"], true);
        assert!(body["extracted_text"]
            .as_str()
            .unwrap()
            .contains("Senior Rust engineer"));
    }

    #[tokio::test]
    async fn test_extract_pdf_diagnostic_requires_file_field() {
        let (app, _) = app();
        let response = app
            .oneshot(multipart_post(
                "/api/test/extract-pdf",
                multipart_body(Some("not a file"), &[]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_parse_resume_file_diagnostic() {
        let (app, _) = app();
        let content = fake_pdf();
        let response = app
            .oneshot(multipart_post(
                "/api/test/parse-resume-file",
                single_file_body("jane.pdf", &content),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["filename"], "jane.pdf");
        assert_eq!(
            body["extracted_text_length"],
            content.trim().chars().count()
        );
        assert_eq!(body["parsed_data"]["name"], "Jane Doe");
    }

    #[tokio::test]
    async fn test_parse_resume_file_rejects_non_pdf() {
        let (app, _) = app();
        let response = app
            .oneshot(multipart_post(
                "/api/test/parse-resume-file",
                single_file_body("notes.txt", &"plain text notes ".repeat(10)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_json(response).await["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("notes.txt: "));
    }

    #[tokio::test]
    async fn test_root_is_rate_limited_per_client() {
        let (app, _) = app();
        for _ in 0..10 {
            let response = app.clone().oneshot(get("/")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_json(response).await["error"]["code"], "RATE_LIMITED");

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
