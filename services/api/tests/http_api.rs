//! End-to-end tests of the HTTP surface against in-memory adapters.

use api_lib::adapters::MemoryNoteStore;
use api_lib::config::Config;
use api_lib::web::{build_router, AppState, USER_ID_HEADER};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use study_notes_core::domain::ContentKind;
use study_notes_core::ports::{
    ContentGenerationService, PortError, PortResult, TextExtractionService, RATE_LIMITED_MESSAGE,
};
use tower::ServiceExt;
use uuid::Uuid;

const FLASHCARDS: &str = "### Flashcard 1\n**Q:** What is ATP?  \n**A:** The energy currency of the cell.\n\n---\n\n### Flashcard 2\n**Q:** Where is DNA stored?  \n**A:** In the nucleus.\n\n---\n";

const QUIZ: &str = "### Question 1\nWhat is the powerhouse of the cell?\n\nA) Nucleus  \nB) Mitochondria  \nC) Ribosome  \nD) Golgi apparatus\n\n**Correct Answer:** B  \n**Explanation:** Mitochondria produce ATP.\n\n---\n\n### Question 2\nWhich gas do plants absorb?\n\nA) Oxygen  \nB) Nitrogen  \nC) Carbon dioxide  \nD) Helium\n\n**Correct Answer:** C  \n**Explanation:** Plants take in CO2.\n";

/// Canned study material; text containing "rate-limit" fails like an exhausted provider.
struct CannedGenerator;

#[async_trait]
impl ContentGenerationService for CannedGenerator {
    async fn generate(&self, kind: ContentKind, text: &str) -> PortResult<String> {
        if text.contains("rate-limit") {
            return Err(PortError::RateLimited(RATE_LIMITED_MESSAGE.to_string()));
        }
        Ok(match kind {
            ContentKind::Summary => format!("### Summary\n{}", text),
            ContentKind::Bullets => "### Key Points\n- Cells".to_string(),
            ContentKind::Flashcards => FLASHCARDS.to_string(),
            ContentKind::Quiz => QUIZ.to_string(),
        })
    }
}

struct CannedExtractor;

#[async_trait]
impl TextExtractionService for CannedExtractor {
    async fn extract_pdf_text(&self, _pdf_data: &[u8]) -> PortResult<String> {
        Ok("  Cell   biology   basics  ".to_string())
    }
}

fn app() -> (Router, Arc<AppState>) {
    let config = Config {
        pacing_delay: Duration::ZERO,
        ..Config::default()
    };
    let state = Arc::new(AppState::new(
        config,
        Arc::new(MemoryNoteStore::new()),
        Arc::new(CannedGenerator),
        Arc::new(CannedExtractor),
    ));
    let router = build_router(state.clone()).expect("router builds");
    (router, state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.expect("request is served");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body is readable");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

fn json_request(method: Method, uri: &str, user_id: Uuid, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, user_id.to_string())
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, user_id: Uuid) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(USER_ID_HEADER, user_id.to_string())
        .body(Body::empty())
        .unwrap()
}

async fn create_note(app: &Router, user_id: Uuid, text: &str) -> Value {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/notes",
            user_id,
            json!({ "inputText": text, "inputType": "text" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    serde_json::from_str::<Value>(&body).unwrap()["note"].clone()
}

#[tokio::test]
async fn health_is_public_and_notes_require_identity() {
    let (app, _) = app();

    let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, health).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let anonymous = Request::builder().uri("/notes").body(Body::empty()).unwrap();
    let (status, _) = send(&app, anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/notes")
        .header(USER_ID_HEADER, "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notes_are_created_with_default_title_and_listed_per_user() {
    let (app, _) = app();
    let user_id = Uuid::new_v4();

    let note = create_note(&app, user_id, "Cells are the unit of life.").await;
    assert!(note["title"].as_str().unwrap().starts_with("Note "));
    assert_eq!(note["status"], "pending");
    assert_eq!(note["inputType"], "text");

    let (status, body) = send(&app, get("/notes", user_id)).await;
    assert_eq!(status, StatusCode::OK);
    let listed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(listed["notes"].as_array().unwrap().len(), 1);
    assert_eq!(listed["success"], true);

    let (_, body) = send(&app, get("/notes", Uuid::new_v4())).await;
    let other: Value = serde_json::from_str(&body).unwrap();
    assert!(other["notes"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn note_creation_validates_input() {
    let (app, _) = app();
    let user_id = Uuid::new_v4();

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/notes", user_id, json!({ "inputText": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("inputType"));

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/notes",
            user_id,
            json!({ "inputText": "a".repeat(50_001), "inputType": "text" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        "Text is too long. Maximum 50,000 characters allowed. Your text contains 50,001 characters."
    );
}

#[tokio::test]
async fn text_of_exactly_the_limit_is_accepted_everywhere() {
    let (app, state) = app();
    let user_id = Uuid::new_v4();
    let text = "a".repeat(50_000);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/ai/generate",
            user_id,
            json!({ "text": text, "type": "bullets" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let note = create_note(&app, user_id, &text).await;
    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            &format!("/notes/{}/generate", note["id"].as_str().unwrap()),
            user_id,
            json!({ "text": text }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    state.tasks.close();
    state.tasks.wait().await;
    let (_, body) = send(&app, get("/history", user_id)).await;
    let history: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(history["notes"][0]["status"], "completed");
}

#[tokio::test]
async fn single_shot_generation_maps_errors() {
    let (app, _) = app();
    let user_id = Uuid::new_v4();

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/ai/generate", user_id, json!({ "text": "cells" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Missing text or type parameter");

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/ai/generate",
            user_id,
            json!({ "text": "cells", "type": "essay" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid type parameter");

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/ai/generate",
            user_id,
            json!({ "text": "please rate-limit me", "type": "summary" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, RATE_LIMITED_MESSAGE);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/ai/generate",
            user_id,
            json!({ "text": "cells", "type": "SUMMARY" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let parsed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["result"], "### Summary\ncells");
}

#[tokio::test]
async fn full_generation_flow_persists_and_parses_study_material() {
    let (app, state) = app();
    let user_id = Uuid::new_v4();
    let note = create_note(&app, user_id, "Mitochondria make ATP.").await;
    let note_id = note["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            &format!("/notes/{}/generate", note_id),
            user_id,
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let board: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(board["isGenerating"], false);
    assert_eq!(board["results"][0]["kind"], "summary");
    assert_eq!(board["results"][0]["status"], "ready");
    assert_eq!(board["results"][0]["text"], "### Summary\nMitochondria make ATP.");

    state.tasks.close();
    state.tasks.wait().await;

    let (_, body) = send(&app, get("/generation", user_id)).await;
    let board: Value = serde_json::from_str(&body).unwrap();
    for result in board["results"].as_array().unwrap() {
        assert_eq!(result["status"], "ready");
    }

    let (_, body) = send(&app, get("/history", user_id)).await;
    let history: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(history["notes"][0]["status"], "completed");
    assert_eq!(history["notes"][0]["outputType"], "all");

    let (status, body) = send(&app, get(&format!("/notes/{}/study", note_id), user_id)).await;
    assert_eq!(status, StatusCode::OK);
    let study: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(study["flashcards"].as_array().unwrap().len(), 2);
    assert_eq!(study["flashcards"][0]["question"], "What is ATP?");
    assert_eq!(study["quiz"].as_array().unwrap().len(), 2);
    assert_eq!(study["quiz"][0]["correctAnswer"], 1);
    assert_eq!(study["outputs"]["bullets"], "### Key Points\n- Cells");

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            &format!("/notes/{}/quiz/score", note_id),
            user_id,
            json!({ "answers": [1, 0] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let score: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(score["correct"], 1);
    assert_eq!(score["total"], 2);
    assert_eq!(score["percentage"], 50);
    assert_eq!(score["message"], "Keep studying!");
}

#[tokio::test]
async fn reset_clears_the_board() {
    let (app, _) = app();
    let user_id = Uuid::new_v4();

    let (_, body) = send(&app, get("/generation", user_id)).await;
    let before: Value = serde_json::from_str(&body).unwrap();

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/generation/reset", user_id, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let after: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        after["epoch"].as_u64().unwrap(),
        before["epoch"].as_u64().unwrap() + 1
    );
    assert_eq!(after["results"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn notes_of_other_users_are_not_found() {
    let (app, _) = app();
    let note = create_note(&app, Uuid::new_v4(), "private").await;

    let (status, _) = send(
        &app,
        get(&format!("/notes/{}/study", note["id"].as_str().unwrap()), Uuid::new_v4()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn multipart_upload(user_id: Uuid, content_type: &str) -> Request<Body> {
    let body = format!(
        "--BOUNDARY\r\n\
         Content-Disposition: form-data; name=\"pdf\"; filename=\"cells.pdf\"\r\n\
         Content-Type: {}\r\n\r\n\
         %PDF-1.4 not really\r\n\
         --BOUNDARY--\r\n",
        content_type
    );
    Request::builder()
        .method(Method::POST)
        .uri("/parse-pdf")
        .header(USER_ID_HEADER, user_id.to_string())
        .header(CONTENT_TYPE, "multipart/form-data; boundary=BOUNDARY")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn pdf_upload_is_validated_and_cleaned() {
    let (app, _) = app();
    let user_id = Uuid::new_v4();

    let (status, body) = send(&app, multipart_upload(user_id, "text/plain")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "File must be a PDF");

    let (status, body) = send(&app, multipart_upload(user_id, "application/pdf")).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let parsed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["text"], "Cell biology basics");
    assert_eq!(parsed["success"], true);
}
