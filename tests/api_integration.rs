//! Integration tests for the REST surface.
//!
//! Each test spins up an Axum server on a random port backed by in-process
//! fakes and talks to it over real HTTP.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;

use payslip_router::server::api_routes;

use common::{
    RecordingMailer, Reply, ScriptedOracle, TEST_MAX_UPLOAD, TestService, sample_pdf, template, test_service,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Start an Axum server on a random port, return (port, service).
async fn start_server() -> (u16, TestService) {
    let oracle = ScriptedOracle::new([(1, Reply::Text("Aname")), (2, Reply::Text("Stranger"))]);
    let t = test_service(oracle, Arc::new(RecordingMailer::default()));
    let app = api_routes(Arc::clone(&t.service), Arc::new(template()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (port, t)
}

async fn post_preview(port: u16, body: Vec<u8>) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/api/process/preview"))
        .header("content-type", "application/pdf")
        .body(body)
        .send()
        .await
        .unwrap()
}

async fn post_send(port: u16, process_id: &Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/api/process/send"))
        .json(&serde_json::json!({ "process_id": process_id }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_reports_healthy() {
    timeout(TEST_TIMEOUT, async {
        let (port, _t) = start_server().await;
        let resp = reqwest::get(format!("http://127.0.0.1:{port}/api/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["status"], "healthy");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn preview_then_send_round_trip() {
    timeout(TEST_TIMEOUT, async {
        let (port, t) = start_server().await;

        let resp = post_preview(port, sample_pdf(2)).await;
        assert_eq!(resp.status(), 200);
        let preview: Value = resp.json().await.unwrap();
        assert_eq!(preview["success"], true);
        assert_eq!(preview["company"]["company_name"], "Acme");

        let pages = preview["preview"].as_array().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0]["page_number"], 1);
        assert_eq!(pages[0]["matched"], true);
        assert_eq!(pages[0]["matched_contact"], "a@x.com");
        assert_eq!(pages[1]["matched"], false);
        assert_eq!(pages[1]["extracted_text"], "Stranger");

        let process_id = preview["process_id"].clone();
        let resp = post_send(port, &process_id).await;
        assert_eq!(resp.status(), 200);
        let sent: Value = resp.json().await.unwrap();
        assert_eq!(sent["success"], true);
        assert_eq!(sent["sent_count"], 1);
        let results = sent["email_results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["recipient_name"], "Aname");
        assert_eq!(results[0]["sent"], true);
        assert_eq!(t.mailer.sent().len(), 1);

        // Consumed: a second send is a 404.
        let resp = post_send(port, &process_id).await;
        assert_eq!(resp.status(), 404);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["success"], false);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn preview_rejects_non_pdf() {
    timeout(TEST_TIMEOUT, async {
        let (port, t) = start_server().await;

        let resp = post_preview(port, b"just some text".to_vec()).await;
        assert_eq!(resp.status(), 400);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("not a PDF"));
        assert!(t.store.is_empty().await);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn oversize_upload_gets_json_error() {
    timeout(TEST_TIMEOUT, async {
        let (port, t) = start_server().await;

        let mut body = b"%PDF-".to_vec();
        body.resize(TEST_MAX_UPLOAD + 1, 0);
        let resp = post_preview(port, body).await;
        assert_eq!(resp.status(), 400);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["success"], false);
        let error = json["error"].as_str().unwrap();
        assert!(error.contains("Invalid upload"), "{error}");
        assert!(error.contains("limit"), "{error}");
        assert!(t.store.is_empty().await);
        assert_eq!(t.oracle.calls.load(Ordering::SeqCst), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn send_unknown_process_is_404() {
    timeout(TEST_TIMEOUT, async {
        let (port, _t) = start_server().await;
        let resp = post_send(port, &Value::String(uuid::Uuid::new_v4().to_string())).await;
        assert_eq!(resp.status(), 404);
    })
    .await
    .expect("test timed out");
}
