//! Integration tests for the form service.
//!
//! Each fixture spawns two servers on ephemeral ports: a mock of the remote
//! document management service and the form service pointed at it.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::{CategoryTable, SearchFilter, SearchPayload};
use crate::remote::{DocumentApi, HttpDocumentApi};
use crate::{create_router, AppState};

/// Requests seen by the mock remote service.
#[derive(Default)]
struct Recorded {
    tag_terms: Vec<(Option<String>, String)>,
    searches: Vec<(Option<String>, Value)>,
    uploads: Vec<(String, String, Value)>,
    otp_requests: Vec<Value>,
}

#[derive(Clone)]
struct MockRemote {
    recorded: Arc<Mutex<Recorded>>,
    search_reply: Arc<Mutex<(StatusCode, String)>>,
    search_delay: Arc<Mutex<Duration>>,
}

impl MockRemote {
    fn new() -> Self {
        Self {
            recorded: Arc::default(),
            search_reply: Arc::new(Mutex::new((
                StatusCode::OK,
                json!({
                    "status": true,
                    "data": [
                        { "document_id": 1, "file_url": "https://cdn.example/a/xray.png", "major_head": "Personal" },
                        { "document_id": 2, "file_url": "https://cdn.example/a/report.pdf", "major_head": "Personal" }
                    ],
                    "recordsFiltered": 2,
                    "recordsTotal": 40
                })
                .to_string(),
            ))),
            search_delay: Arc::default(),
        }
    }

    async fn reply_search(&self, status: StatusCode, body: impl ToString) {
        *self.search_reply.lock().await = (status, body.to_string());
    }
}

fn token_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get("token")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

async fn mock_tags(
    State(mock): State<MockRemote>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let term = body["term"].as_str().unwrap_or_default().to_string();
    mock.recorded
        .lock()
        .await
        .tag_terms
        .push((token_of(&headers), term.clone()));

    let labels: Vec<Value> = ["Invoice", "Insurance", "X-Ray"]
        .iter()
        .enumerate()
        .filter(|(_, l)| l.to_lowercase().contains(&term.to_lowercase()))
        .map(|(i, l)| json!({ "id": i, "label": l }))
        .collect();
    Json(json!({ "status": true, "data": labels }))
}

async fn mock_search(
    State(mock): State<MockRemote>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    mock.recorded
        .lock()
        .await
        .searches
        .push((token_of(&headers), body));
    let delay = *mock.search_delay.lock().await;
    tokio::time::sleep(delay).await;
    let (status, body) = mock.search_reply.lock().await.clone();
    (status, [("content-type", "application/json")], body)
}

async fn mock_save(State(mock): State<MockRemote>, mut multipart: Multipart) -> Json<Value> {
    let mut file_name = String::new();
    let mut content_type = String::new();
    let mut data = Value::Null;
    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name() {
            Some("file") => {
                file_name = field.file_name().unwrap_or_default().to_string();
                content_type = field.content_type().unwrap_or_default().to_string();
            }
            Some("data") => {
                data = serde_json::from_str(&field.text().await.unwrap()).unwrap();
            }
            _ => {}
        }
    }
    mock.recorded
        .lock()
        .await
        .uploads
        .push((file_name, content_type, data));
    Json(json!({ "status": true, "message": "Document saved." }))
}

async fn mock_generate_otp(State(mock): State<MockRemote>, Json(body): Json<Value>) -> Json<Value> {
    mock.recorded.lock().await.otp_requests.push(body);
    Json(json!({ "status": true, "data": "OTP sent" }))
}

async fn mock_validate_otp(Json(body): Json<Value>) -> Json<Value> {
    if body["otp"] == "123456" {
        Json(json!({ "status": true, "data": { "token": "tok-abc", "user_id": 42 } }))
    } else {
        Json(json!({ "status": false, "message": "Invalid OTP entered" }))
    }
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_remote(mock: MockRemote) -> String {
    let app = Router::new()
        .route("/documentTags", post(mock_tags))
        .route("/searchDocumentEntry", post(mock_search))
        .route("/saveDocumentEntry", post(mock_save))
        .route("/generateOTP", post(mock_generate_otp))
        .route("/validateOTP", post(mock_validate_otp))
        .with_state(mock);
    spawn(app).await
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    remote: MockRemote,
}

impl TestFixture {
    async fn new() -> Self {
        Self::build(None, true).await
    }

    async fn build(psk: Option<String>, logged_in: bool) -> Self {
        let remote = MockRemote::new();
        let remote_url = spawn_remote(remote.clone()).await;

        let config = Config {
            api_psk: psk.clone(),
            remote_url: remote_url.clone(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            request_timeout: Duration::from_secs(5),
            debounce: Duration::from_millis(150),
            categories_path: None,
            token: logged_in.then(|| "tok-seeded".to_string()),
            user_id: logged_in.then(|| "7".to_string()),
        };

        let api = Arc::new(HttpDocumentApi::new(remote_url, config.request_timeout).unwrap());
        let state = AppState::new(api, CategoryTable::default(), config);
        let base_url = spawn(create_router(state)).await;

        // Wait for servers to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            remote,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> (StatusCode, Value) {
        let resp = request.send().await.unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.json().await.unwrap())
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(self.client.put(self.url(path)).json(&body)).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(self.client.post(self.url(path)).json(&body)).await
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.send(self.client.get(self.url(path))).await
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::build(Some("form-key".to_string()), true).await;

    let resp = Client::new()
        .get(fixture.url("/api/search"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_psk() {
    let fixture = TestFixture::build(Some("form-key".to_string()), true).await;

    let resp = Client::new()
        .get(fixture.url("/api/search"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = Client::new()
        .get(fixture.url("/api/search"))
        .header("authorization", "Bearer form-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_auth_valid_psk() {
    let fixture = TestFixture::build(Some("form-key".to_string()), true).await;

    let (status, body) = fixture.get("/api/search").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_otp_login_then_search() {
    let fixture = TestFixture::build(None, false).await;

    let (_, body) = fixture.post("/api/search", json!({})).await;
    assert_eq!(
        body["data"]["message"]["text"],
        "Authentication required. Please log in to search documents."
    );
    assert!(fixture.remote.recorded.lock().await.searches.is_empty());

    let (_, body) = fixture
        .post("/api/session/otp", json!({ "mobileNumber": "9876543210" }))
        .await;
    assert_eq!(body["data"]["step"], "validate");
    assert_eq!(body["data"]["message"]["text"], "OTP sent to your mobile number.");

    let (_, body) = fixture
        .post("/api/session/verify", json!({ "otp": "000000" }))
        .await;
    assert_eq!(body["data"]["authenticated"], false);
    assert_eq!(body["data"]["message"]["text"], "Invalid OTP entered");

    let (_, body) = fixture
        .post("/api/session/verify", json!({ "otp": "123456" }))
        .await;
    assert_eq!(body["data"]["authenticated"], true);
    assert_eq!(body["data"]["userId"], "42");

    let (_, body) = fixture.post("/api/search", json!({})).await;
    assert_eq!(body["data"]["message"]["text"], "Found 2 documents.");

    let recorded = fixture.remote.recorded.lock().await;
    assert_eq!(recorded.otp_requests[0]["mobile_number"], "9876543210");
    let (token, payload) = &recorded.searches[0];
    assert_eq!(token.as_deref(), Some("tok-abc"));
    assert_eq!(payload["uploaded_by"], "42");
}

#[tokio::test]
async fn test_search_end_to_end_payload() {
    let fixture = TestFixture::new().await;

    fixture
        .put("/api/search/category", json!({ "category": "Personal" }))
        .await;
    let (status, body) = fixture
        .put("/api/search/sub-category", json!({ "subCategory": "Medical" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["criteria"]["subCategory"], "Medical");

    fixture
        .put(
            "/api/search/dates",
            json!({ "fromDate": "2024-01-01", "toDate": "2024-01-31" }),
        )
        .await;
    fixture
        .post("/api/search/tags/commit", json!({ "tag": "X-Ray " }))
        .await;

    let (status, body) = fixture.post("/api/search", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["message"]["kind"], "success");

    let image = &body["data"]["results"][0];
    assert_eq!(image["document_id"], 1);
    assert_eq!(image["fileName"], "xray.png");
    assert_eq!(image["contentType"], "image/png");
    assert_eq!(image["previewKind"], "image");
    let pdf = &body["data"]["results"][1];
    assert_eq!(pdf["fileName"], "report.pdf");
    assert_eq!(pdf["contentType"], "application/pdf");
    assert_eq!(pdf["previewKind"], "pdf");

    let recorded = fixture.remote.recorded.lock().await;
    let (token, payload) = &recorded.searches[0];
    assert_eq!(token.as_deref(), Some("tok-seeded"));
    assert_eq!(
        payload,
        &json!({
            "major_head": "Personal",
            "minor_head": "Medical",
            "from_date": "01-01-2024",
            "to_date": "31-01-2024",
            "tags": [{ "tag_name": "x-ray" }],
            "uploaded_by": "7",
            "start": 0,
            "length": 10,
            "filterId": "",
            "search": { "value": "" }
        })
    );
}

#[tokio::test]
async fn test_search_server_failure() {
    let fixture = TestFixture::new().await;
    fixture
        .remote
        .reply_search(
            StatusCode::OK,
            json!({ "status": false, "message": "no access" }),
        )
        .await;

    let (_, body) = fixture.post("/api/search", json!({})).await;

    assert_eq!(body["data"]["results"], json!([]));
    assert_eq!(body["data"]["message"]["text"], "no access");
    assert_eq!(body["data"]["message"]["kind"], "error");
}

#[tokio::test]
async fn test_search_count_sent_as_text() {
    let fixture = TestFixture::new().await;
    fixture
        .remote
        .reply_search(
            StatusCode::OK,
            json!({
                "status": true,
                "data": [{ "document_id": 9, "file_url": "https://cdn.example/a/id.pdf" }],
                "recordsFiltered": "31"
            }),
        )
        .await;

    let (_, body) = fixture.post("/api/search", json!({})).await;

    assert_eq!(body["data"]["message"]["text"], "Found 31 documents.");
    assert_eq!(body["data"]["results"][0]["fileName"], "id.pdf");
}

#[tokio::test]
async fn test_search_form_usable_while_search_runs() {
    let fixture = TestFixture::new().await;
    *fixture.remote.search_delay.lock().await = Duration::from_millis(800);

    let client = fixture.client.clone();
    let url = fixture.url("/api/search");
    let first = tokio::spawn(async move {
        client
            .post(url)
            .json(&json!({}))
            .send()
            .await
            .unwrap()
            .json::<Value>()
            .await
            .unwrap()
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    let (_, body) = tokio::time::timeout(Duration::from_millis(300), fixture.get("/api/search"))
        .await
        .expect("search view waits for the remote search");
    assert_eq!(body["data"]["loading"], true);

    let (_, body) = tokio::time::timeout(
        Duration::from_millis(300),
        fixture.post("/api/search/tags/commit", json!({ "tag": "scan" })),
    )
    .await
    .expect("tag input waits for the remote search");
    assert_eq!(body["data"]["selected"], json!(["scan"]));

    let (_, body) = fixture.post("/api/search", json!({})).await;
    assert_eq!(body["data"]["loading"], true);

    let body = first.await.unwrap();
    assert_eq!(body["data"]["loading"], false);
    assert_eq!(body["data"]["message"]["text"], "Found 2 documents.");
    assert_eq!(fixture.remote.recorded.lock().await.searches.len(), 1);
}

#[tokio::test]
async fn test_search_malformed_response() {
    let fixture = TestFixture::new().await;
    fixture
        .remote
        .reply_search(StatusCode::OK, "<html>gateway</html>")
        .await;

    let (_, body) = fixture.post("/api/search", json!({})).await;

    assert_eq!(body["data"]["results"], json!([]));
    assert_eq!(
        body["data"]["message"]["text"],
        "Failed to search documents. Please try again."
    );
}

#[tokio::test]
async fn test_clear_search() {
    let fixture = TestFixture::new().await;
    fixture
        .put("/api/search/category", json!({ "category": "Professional" }))
        .await;
    fixture
        .post("/api/search/tags/commit", json!({ "tag": "invoice" }))
        .await;
    fixture.post("/api/search", json!({})).await;

    let (_, body) = fixture
        .send(fixture.client.delete(fixture.url("/api/search")))
        .await;

    let data = &body["data"];
    assert_eq!(data["criteria"]["category"], Value::Null);
    assert_eq!(data["tags"]["selected"], json!([]));
    assert_eq!(data["results"], json!([]));
    assert_eq!(data["message"], Value::Null);
}

#[tokio::test]
async fn test_validation_errors() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .put("/api/search/sub-category", json!({ "subCategory": "Medical" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = fixture
        .put("/api/search/category", json!({ "category": "Hobby" }))
        .await;
    assert_eq!(status, 400);

    let (status, _) = fixture
        .put("/api/search/dates", json!({ "fromDate": "31/01/2024" }))
        .await;
    assert_eq!(status, 400);

    let (status, body) = fixture
        .post("/api/archive/tags/commit", json!({ "tag": "x" }))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_tag_suggestions_debounced() {
    let fixture = TestFixture::new().await;

    for text in ["i", "in", "ins"] {
        fixture
            .post("/api/search/tags/input", json!({ "text": text }))
            .await;
    }
    tokio::time::sleep(Duration::from_millis(400)).await;

    let (_, body) = fixture.get("/api/search").await;
    assert_eq!(body["data"]["tags"]["suggestions"], json!(["insurance"]));
    assert_eq!(body["data"]["tags"]["loading"], false);

    let recorded = fixture.remote.recorded.lock().await;
    assert_eq!(
        recorded.tag_terms,
        vec![(Some("tok-seeded".to_string()), "ins".to_string())]
    );
}

#[tokio::test]
async fn test_tag_keys_and_removal() {
    let fixture = TestFixture::new().await;

    fixture
        .post("/api/upload/tags/input", json!({ "text": "x-" }))
        .await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let (_, body) = fixture
        .post("/api/upload/tags/key", json!({ "key": "Enter" }))
        .await;
    assert_eq!(body["data"]["preventDefault"], true);
    assert_eq!(body["data"]["tags"]["selected"], json!(["x-ray"]));
    assert_eq!(body["data"]["tags"]["input"], "");

    fixture
        .post("/api/upload/tags/commit", json!({ "tag": "scan" }))
        .await;
    let (_, body) = fixture
        .post("/api/upload/tags/key", json!({ "key": "Backspace" }))
        .await;
    assert_eq!(body["data"]["preventDefault"], false);
    assert_eq!(body["data"]["tags"]["selected"], json!(["x-ray"]));

    let (_, body) = fixture
        .send(fixture.client.delete(fixture.url("/api/upload/tags/x-ray")))
        .await;
    assert_eq!(body["data"]["selected"], json!([]));

    // The search form keeps its own selection.
    let (_, body) = fixture.get("/api/search").await;
    assert_eq!(body["data"]["tags"]["selected"], json!([]));
}

#[tokio::test]
async fn test_upload_flow() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .put(
            "/api/upload/fields",
            json!({
                "documentDate": "2024-02-10",
                "category": "Professional",
                "subCategory": "Accounts",
                "remarks": "Q1 invoice"
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["subCategory"], "Accounts");

    fixture
        .post("/api/upload/tags/commit", json!({ "tag": "Invoice" }))
        .await;

    let rejected = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"hello".to_vec())
            .file_name("notes.txt")
            .mime_str("text/plain")
            .unwrap(),
    );
    let (status, body) = fixture
        .send(
            fixture
                .client
                .post(fixture.url("/api/upload/file"))
                .multipart(rejected),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["message"], "Only Image and PDF files are allowed.");

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"%PDF-1.4".to_vec())
            .file_name("invoice.pdf")
            .mime_str("application/pdf")
            .unwrap(),
    );
    let (status, body) = fixture
        .send(
            fixture
                .client
                .post(fixture.url("/api/upload/file"))
                .multipart(form),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["file"]["name"], "invoice.pdf");
    assert_eq!(body["data"]["file"]["size"], 8);

    let (_, body) = fixture.post("/api/upload", json!({})).await;
    assert_eq!(
        body["data"]["message"]["text"],
        "Successfully uploaded file: invoice.pdf. Document saved."
    );
    assert_eq!(body["data"]["file"], Value::Null);
    assert_eq!(body["data"]["tags"]["selected"], json!([]));

    let recorded = fixture.remote.recorded.lock().await;
    let (name, content_type, data) = &recorded.uploads[0];
    assert_eq!(name, "invoice.pdf");
    assert_eq!(content_type, "application/pdf");
    assert_eq!(
        data,
        &json!({
            "major_head": "Professional",
            "minor_head": "Accounts",
            "document_date": "10-02-2024",
            "document_remarks": "Q1 invoice",
            "tags": [{ "tag_name": "invoice" }],
            "user_id": "7"
        })
    );
}

#[tokio::test]
async fn test_upload_missing_fields() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture.post("/api/upload", json!({})).await;
    assert_eq!(
        body["data"]["message"]["text"],
        "Please fill all required fields and select a file."
    );
    assert!(fixture.remote.recorded.lock().await.uploads.is_empty());
}

#[tokio::test]
async fn test_logout_resets_forms() {
    let fixture = TestFixture::new().await;
    fixture
        .post("/api/search/tags/commit", json!({ "tag": "invoice" }))
        .await;

    let (_, body) = fixture
        .send(fixture.client.delete(fixture.url("/api/session")))
        .await;
    assert_eq!(body["data"]["authenticated"], false);

    let (_, body) = fixture.get("/api/search").await;
    assert_eq!(body["data"]["tags"]["selected"], json!([]));

    let (_, body) = fixture.post("/api/search", json!({})).await;
    assert_eq!(
        body["data"]["message"]["text"],
        "Authentication required. Please log in to search documents."
    );
}

#[tokio::test]
async fn test_categories_endpoint() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/categories").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["Personal"][0], "Medical");
    assert!(body["data"]["Professional"].is_array());
}

fn empty_payload() -> SearchPayload {
    SearchPayload {
        major_head: String::new(),
        minor_head: String::new(),
        from_date: String::new(),
        to_date: String::new(),
        tags: vec![],
        uploaded_by: "7".to_string(),
        start: 0,
        length: 10,
        filter_id: String::new(),
        search: SearchFilter::default(),
    }
}

#[tokio::test]
async fn test_http_api_error_mapping() {
    let remote = MockRemote::new();
    let remote_url = spawn_remote(remote.clone()).await;
    let api = HttpDocumentApi::new(remote_url, Duration::from_secs(5)).unwrap();

    remote
        .reply_search(StatusCode::FORBIDDEN, json!({ "message": "token expired" }))
        .await;
    let response = api.search_documents(&empty_payload(), "tok").await.unwrap();
    assert!(!response.ok);
    assert_eq!(response.message.as_deref(), Some("token expired"));

    remote
        .reply_search(StatusCode::INTERNAL_SERVER_ERROR, "oops")
        .await;
    let err = api.search_documents(&empty_payload(), "tok").await.unwrap_err();
    assert!(matches!(err, AppError::Remote { status: 500, .. }));

    remote
        .reply_search(StatusCode::OK, json!({ "status": true }))
        .await;
    let err = api.search_documents(&empty_payload(), "tok").await.unwrap_err();
    assert!(matches!(err, AppError::MalformedResponse(_)));

    let labels = api.document_tags("inv", "tok").await.unwrap();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].label, "Invoice");
}

#[tokio::test]
async fn test_http_api_network_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = HttpDocumentApi::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap();
    let err = api.search_documents(&empty_payload(), "tok").await.unwrap_err();
    assert!(err.is_transport());
}
