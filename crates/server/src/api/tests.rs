use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use docqa_core::config::{LimitsConfig, ServerConfig};
use docqa_llm::answer::MISSING_KEY_MESSAGE;
use docqa_llm::providers::openai::OpenAiProvider;
use docqa_llm::DocumentAnswerer;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::router::build_router;
use crate::state::AppState;
use crate::uploads::{spawn_sweeper, UploadStore};

const THREE_PAGES: &[u8] = include_bytes!("../../../ingest/tests/fixtures/three-pages.pdf");
const BOUNDARY: &str = "docqa-test-boundary";
const MAX_UPLOAD_BYTES: usize = 64 * 1024;

// ── Harness ──────────────────────────────────────────────────────

fn server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        cors_origin: "*".into(),
    }
}

fn app_with(dir: &Path, answerer: DocumentAnswerer, limits: LimitsConfig) -> Router {
    let state = Arc::new(AppState {
        answerer,
        uploads: UploadStore::resolve(dir).unwrap(),
        limits,
    });
    build_router(state, &server_config(), MAX_UPLOAD_BYTES).unwrap()
}

/// App with no API key configured.
fn app(dir: &Path) -> Router {
    app_with(dir, DocumentAnswerer::new(None, 0.5, 30_000), LimitsConfig::default())
}

async fn app_with_llm(dir: &Path, server: &MockServer) -> Router {
    let provider =
        OpenAiProvider::new("test-key".into(), "test-model".into(), server.uri(), None).unwrap();
    app_with(
        dir,
        DocumentAnswerer::new(Some(Box::new(provider)), 0.5, 30_000),
        LimitsConfig::default(),
    )
}

struct Part<'a> {
    name: &'a str,
    filename: Option<&'a str>,
    data: &'a [u8],
}

/// A `file` part with the given filename.
fn file<'a>(filename: &'a str, data: &'a [u8]) -> Part<'a> {
    Part {
        name: "file",
        filename: Some(filename),
        data,
    }
}

fn part<'a>(name: &'a str, filename: Option<&'a str>, data: &'a [u8]) -> Part<'a> {
    Part { name, filename, data }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for p in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match p.filename {
            Some(f) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                p.name, f
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", p.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(p.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::post("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn ask_request(body: &str) -> Request<Body> {
    Request::post("/ask")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn stored_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ── GET / and /health ────────────────────────────────────────────

#[tokio::test]
async fn index_serves_html_page() {
    let tmp = tempfile::tempdir().unwrap();
    let res = app(tmp.path())
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let content_type = res.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("Document QA"));
}

#[tokio::test]
async fn health_reports_llm_configuration() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(
        app(tmp.path()),
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["llm_configured"], false);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

// ── POST /upload ─────────────────────────────────────────────────

#[tokio::test]
async fn upload_text_returns_exact_content() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(
        app(tmp.path()),
        upload_request(&[file("test.txt", b"The quick brown fox.")]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "message": "File uploaded successfully",
            "filename": "test.txt",
            "content": "The quick brown fox.",
        })
    );
    assert_eq!(stored_files(tmp.path()), vec!["test.txt"]);
}

#[tokio::test]
async fn upload_pdf_keeps_every_page_newline_terminated() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(
        app(tmp.path()),
        upload_request(&[file("Three Pages.PDF", THREE_PAGES)]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "Three_Pages.PDF");
    let content = body["content"].as_str().unwrap();
    assert!(content.ends_with('\n'));
    let hello = content.find("Hello").unwrap();
    let world = content.find("World").unwrap();
    assert!(hello < world);
    // The empty middle page still contributes its newline.
    assert!(content[hello..world].matches('\n').count() >= 2);
}

#[tokio::test]
async fn upload_skips_unrelated_form_fields() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(
        app(tmp.path()),
        upload_request(&[
            part("note", None, b"ignored"),
            file("a.txt", b"alpha"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "alpha");
}

#[tokio::test]
async fn upload_content_is_capped() {
    let tmp = tempfile::tempdir().unwrap();
    let limits = LimitsConfig {
        upload_content_max_chars: 5,
        ..LimitsConfig::default()
    };
    let app = app_with(tmp.path(), DocumentAnswerer::new(None, 0.5, 30_000), limits);
    let (status, body) = send(app, upload_request(&[file("u.txt", "ééééééé".as_bytes())])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "ééééé");
}

#[tokio::test]
async fn uploads_survive_an_aggressive_sweeper() {
    let tmp = tempfile::tempdir().unwrap();
    let uploads = UploadStore::resolve(tmp.path()).unwrap();
    let sweeper = spawn_sweeper(uploads.clone(), Duration::ZERO, Duration::from_millis(1));
    let state = Arc::new(AppState {
        answerer: DocumentAnswerer::new(None, 0.5, 30_000),
        uploads,
        limits: LimitsConfig::default(),
    });
    let app = build_router(state, &server_config(), MAX_UPLOAD_BYTES).unwrap();

    for _ in 0..20 {
        let (status, body) = send(
            app.clone(),
            upload_request(&[file("three.pdf", THREE_PAGES)]),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(body["content"].as_str().unwrap().contains("World"));
    }
    sweeper.abort();
}

#[tokio::test]
async fn upload_sanitizes_path_components() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(
        app(tmp.path()),
        upload_request(&[file("../../evil.txt", b"x")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "evil.txt");
    assert_eq!(stored_files(tmp.path()), vec!["evil.txt"]);
}

#[tokio::test]
async fn upload_without_file_field_is_rejected_before_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(
        app(tmp.path()),
        upload_request(&[part("other", Some("a.txt"), b"data")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file part");
    assert!(stored_files(tmp.path()).is_empty());
}

#[tokio::test]
async fn upload_field_without_filename_is_not_a_file() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(app(tmp.path()), upload_request(&[part("file", None, b"data")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file part");
}

#[tokio::test]
async fn upload_with_empty_filename_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(app(tmp.path()), upload_request(&[file("", b"data")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No selected file");
    assert!(stored_files(tmp.path()).is_empty());
}

#[tokio::test]
async fn upload_with_unsupported_extension_is_rejected_before_disk() {
    let tmp = tempfile::tempdir().unwrap();
    for name in ["setup.exe", "README", "notes.md"] {
        let (status, body) = send(app(tmp.path()), upload_request(&[file(name, b"MZ")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{name}");
        assert_eq!(body["error"], "Invalid file type");
    }
    assert!(stored_files(tmp.path()).is_empty());
}

#[tokio::test]
async fn non_multipart_upload_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let req = Request::post("/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(app(tmp.path()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file part");
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let tmp = tempfile::tempdir().unwrap();
    let big = vec![b'a'; MAX_UPLOAD_BYTES + 1];
    let res = app(tmp.path())
        .oneshot(upload_request(&[file("big.txt", &big)]))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(stored_files(tmp.path()).is_empty());
}

#[tokio::test]
async fn invalid_utf8_text_is_422() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(
        app(tmp.path()),
        upload_request(&[file("latin1.txt", &[0x63, 0x61, 0x66, 0xE9])]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("UTF-8"));
}

#[tokio::test]
async fn pdf_without_header_is_422() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(
        app(tmp.path()),
        upload_request(&[file("fake.pdf", b"just some text")]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Invalid PDF format. The file header is missing.");
}

#[tokio::test]
async fn corrupt_pdf_is_422_and_server_keeps_serving() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path());
    let (status, _) = send(
        app.clone(),
        upload_request(&[file("broken.pdf", b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog")]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(app, upload_request(&[file("ok.txt", b"still alive")])).await;
    assert_eq!(status, StatusCode::OK);
}

// ── POST /ask ────────────────────────────────────────────────────

#[tokio::test]
async fn ask_with_missing_fields_is_400() {
    let tmp = tempfile::tempdir().unwrap();
    for body in [
        r#"{"context": "The quick brown fox."}"#,
        r#"{"question": "What is the fox?"}"#,
        r#"{"question": "", "context": "ctx"}"#,
        r#"{"question": "q?", "context": ""}"#,
        r#"{"question": 42, "context": "ctx"}"#,
        "not json",
        "{}",
    ] {
        let (status, json) = send(app(tmp.path()), ask_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json["error"], "Missing question or document context");
    }
}

#[tokio::test]
async fn ask_without_key_answers_in_band() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(
        app(tmp.path()),
        ask_request(r#"{"question": "What is the fox?", "context": "The quick brown fox."}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "answer": MISSING_KEY_MESSAGE }));
}

#[tokio::test]
async fn ask_returns_provider_answer() {
    let tmp = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "It is quick and brown." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = send(
        app_with_llm(tmp.path(), &server).await,
        ask_request(r#"{"question": "What is the fox?", "context": "The quick brown fox."}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "answer": "It is quick and brown." }));
}

#[tokio::test]
async fn ask_maps_upstream_failure_to_502() {
    let tmp = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let (status, body) = send(
        app_with_llm(tmp.path(), &server).await,
        ask_request(r#"{"question": "q?", "context": "ctx"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Error communicating with LLM: "));
    assert!(error.contains("503"));
}

#[tokio::test]
async fn ask_maps_malformed_response_to_502() {
    let tmp = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let (status, _) = send(
        app_with_llm(tmp.path(), &server).await,
        ask_request(r#"{"question": "q?", "context": "ctx"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
