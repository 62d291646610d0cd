use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use aimg_client::{ClientError, ConsoleApi, CredentialSink, Transport};
use aimg_core::backend_config::BackendConfig;
use aimg_core::request::{
    build, GenerationForm, GenerationMode, GenerationRequest, Seed, SourceImage,
};
use aimg_core::session::Credentials;
use assert_matches::assert_matches;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Mock backend
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Recorded {
    auth_headers: Vec<Option<String>>,
    json_bodies: Vec<Value>,
    multipart_fields: Vec<(String, String)>,
}

type Shared = Arc<Mutex<Recorded>>;

fn record_auth(state: &Shared, headers: &HeaderMap) {
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.lock().unwrap().auth_headers.push(header);
}

async fn login(Json(body): Json<Value>) -> impl IntoResponse {
    if body["password"] == "secret" {
        (
            StatusCode::OK,
            Json(json!({"token": "tok-1", "username": body["username"]})),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid username or password"})),
        )
    }
}

async fn status(State(state): State<Shared>, headers: HeaderMap) -> impl IntoResponse {
    record_auth(&state, &headers);
    Json(json!({
        "servers": [{"name": "gpu-1", "healthy": true, "busy": false}],
        "models": ["sdxl"],
        "loras": ["detail"],
        "samplers": ["euler"],
        "schedulers": ["karras"],
        "workflows": ["anime"],
        "default_sampler": "euler",
        "default_scheduler": "karras"
    }))
}

async fn expired() -> impl IntoResponse {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "Token expired"})))
}

async fn text_to_image(State(state): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    let prompt = body["prompt"].clone();
    state.lock().unwrap().json_bodies.push(body);
    Json(json!({
        "success": true,
        "images": ["/outputs/a.png", "/outputs/b.png"],
        "prompt": prompt,
        "seed": 1234,
        "width": 512,
        "height": 512,
        "lora_count": 0
    }))
}

async fn image_to_image(State(state): State<Shared>, mut multipart: Multipart) -> impl IntoResponse {
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let value = if name == "image" {
            format!("{} bytes", field.bytes().await.map(|b| b.len()).unwrap_or(0))
        } else {
            field.text().await.unwrap_or_default()
        };
        state.lock().unwrap().multipart_fields.push((name, value));
    }
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"success": false, "error": "No healthy servers"})),
    )
}

async fn broken() -> impl IntoResponse {
    (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>")
}

async fn config_get() -> impl IntoResponse {
    Json(json!({
        "servers": [{"address": "http://gpu-1:8188", "weight": 5, "enabled": true}],
        "auto_save": true,
        "auto_zip": false,
        "default_workflow": "anime",
        "db_directory": "output"
    }))
}

async fn config_post(State(state): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    state.lock().unwrap().json_bodies.push(body);
    Json(json!({"success": true, "message": "Configuration saved"}))
}

async fn workflows() -> impl IntoResponse {
    Json(json!({
        "zeta": {"name": "Zeta", "description": "", "version": "1"},
        "anime": {"name": "Anime", "description": "cel", "version": 2}
    }))
}

async fn workflow_get(Path(prefix): Path<String>) -> impl IntoResponse {
    if prefix == "anime" {
        (StatusCode::OK, Json(json!({"prefix": "anime", "name": "Anime"})))
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"error": "Workflow not found"})))
    }
}

async fn workflow_delete(Path(prefix): Path<String>) -> impl IntoResponse {
    Json(json!({"success": true, "message": format!("Deleted {prefix}")}))
}

async fn image_bytes() -> impl IntoResponse {
    vec![0x89u8, b'P', b'N', b'G']
}

async fn spawn_backend(state: Shared) -> SocketAddr {
    let app = Router::new()
        .route("/api/login", post(login))
        .route("/api/status", get(status))
        .route("/api/expired", get(expired))
        .route("/api/aimg", post(text_to_image))
        .route("/api/img2img", post(image_to_image))
        .route("/api/broken", get(broken))
        .route("/api/config", get(config_get).post(config_post))
        .route("/api/workflows", get(workflows))
        .route("/api/workflow/{prefix}", get(workflow_get).delete(workflow_delete))
        .route("/outputs/a.png", get(image_bytes))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

struct FixedToken {
    token: Mutex<Option<String>>,
    invalidations: AtomicUsize,
}

impl FixedToken {
    fn new(token: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            token: Mutex::new(token.map(str::to_string)),
            invalidations: AtomicUsize::new(0),
        })
    }
}

impl CredentialSink for FixedToken {
    fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        *self.token.lock().unwrap() = None;
    }
}

async fn setup(token: Option<&str>) -> (ConsoleApi, Arc<FixedToken>, Shared) {
    let state = Shared::default();
    let addr = spawn_backend(state.clone()).await;
    let creds = FixedToken::new(token);
    let transport = Transport::with_client(
        reqwest::Client::new(),
        format!("http://{addr}"),
        creds.clone(),
    );
    (ConsoleApi::new(transport), creds, state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_accepts_and_rejects_without_invalidating() {
    let (api, creds, _) = setup(None).await;

    let ok = api.login(&Credentials::new("alice", "secret")).await.unwrap();
    assert!(ok.accepted);
    assert_eq!(ok.response.token.as_deref(), Some("tok-1"));

    let denied = api.login(&Credentials::new("alice", "wrong")).await.unwrap();
    assert!(!denied.accepted);
    assert_eq!(
        denied.response.error.as_deref(),
        Some("Invalid username or password")
    );
    assert_eq!(creds.invalidations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn status_sends_bearer_token() {
    let (api, _, state) = setup(Some("tok-9")).await;

    let status = api.status().await.unwrap().expect("not expired");
    assert_eq!(status.models, vec!["sdxl"]);
    assert_eq!(status.default_sampler.as_deref(), Some("euler"));
    assert_eq!(
        state.lock().unwrap().auth_headers,
        vec![Some("Bearer tok-9".to_string())]
    );
}

#[tokio::test]
async fn unauthorized_invalidates_and_returns_none() {
    let (api, creds, _) = setup(Some("stale")).await;

    let reply = api
        .transport()
        .send(reqwest::Method::GET, "/api/expired", aimg_client::Body::Empty)
        .await
        .unwrap();

    assert!(reply.is_none());
    assert_eq!(creds.invalidations.load(Ordering::SeqCst), 1);
    assert_eq!(creds.token(), None);
}

#[tokio::test]
async fn text_to_image_posts_json() {
    let (api, _, state) = setup(Some("tok")).await;
    let form = GenerationForm {
        prompt: "a cat".into(),
        ..GenerationForm::default()
    };
    let request = build(GenerationMode::Text2Image, &form).unwrap();

    let result = api.generate(&request).await.unwrap().expect("not expired");
    assert!(result.success);
    assert_eq!(result.images.len(), 2);
    assert_eq!(result.seed, Some(Seed::Fixed(1234)));

    let body = state.lock().unwrap().json_bodies[0].clone();
    assert_eq!(body["prompt"], "a cat");
    assert_eq!(body["width"], 512);
    assert_eq!(body["seed"], -1);
    assert_eq!(body["lora"], json!([]));
}

#[tokio::test]
async fn image_to_image_sends_multipart_and_passes_failure_through() {
    let (api, _, state) = setup(Some("tok")).await;
    let form = GenerationForm {
        prompt: "a dog".into(),
        image: Some(SourceImage::new("in.png", vec![1, 2, 3, 4, 5])),
        ..GenerationForm::default()
    };
    let request = build(GenerationMode::Image2Image, &form).unwrap();
    assert_matches!(request, GenerationRequest::Image2Image { .. });

    let result = api.generate(&request).await.unwrap().expect("not expired");
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("No healthy servers"));

    let fields = state.lock().unwrap().multipart_fields.clone();
    let get = |name: &str| {
        fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    };
    assert_eq!(get("image").as_deref(), Some("5 bytes"));
    assert_eq!(get("prompt").as_deref(), Some("a dog"));
    assert_eq!(get("denoise").as_deref(), Some("0.7"));
    assert_eq!(get("lora").as_deref(), Some("[]"));
    assert_eq!(get("model"), None);
}

#[tokio::test]
async fn non_json_response_is_an_error() {
    let (api, _, _) = setup(Some("tok")).await;
    let err = api
        .transport()
        .send(reqwest::Method::GET, "/api/broken", aimg_client::Body::Empty)
        .await
        .unwrap_err();
    assert_matches!(err, ClientError::NonJson { status: 502, .. });
}

#[tokio::test]
async fn config_round_trip_keeps_unknown_fields() {
    let (api, _, state) = setup(Some("tok")).await;

    let mut config: BackendConfig = api.get_config().await.unwrap().expect("not expired");
    config.auto_zip = true;
    let ack = api.save_config(&config).await.unwrap().expect("not expired");
    assert!(ack.success);

    let sent = state.lock().unwrap().json_bodies[0].clone();
    assert_eq!(sent["db_directory"], "output");
    assert_eq!(sent["auto_zip"], true);
    assert_eq!(sent["servers"][0]["weight"], 5);
}

#[tokio::test]
async fn workflow_endpoints() {
    let (api, _, _) = setup(Some("tok")).await;

    let index = api.list_workflows().await.unwrap().expect("not expired");
    assert_eq!(index.keys().collect::<Vec<_>>(), vec!["anime", "zeta"]);
    assert_eq!(index["anime"].version, "2");

    let workflow = api.get_workflow("anime").await.unwrap().expect("not expired");
    assert_eq!(workflow["prefix"], "anime");

    let missing = api.get_workflow("nope").await.unwrap_err();
    assert_matches!(missing, ClientError::Backend { status: 404, .. });

    let ack = api.delete_workflow("anime").await.unwrap().expect("not expired");
    assert_eq!(ack.reason(), Some("Deleted anime"));
}

#[tokio::test]
async fn fetch_image_downloads_bytes() {
    let (api, _, _) = setup(Some("tok")).await;
    let bytes = api.fetch_image("/outputs/a.png").await.unwrap();
    assert_eq!(bytes, vec![0x89, b'P', b'N', b'G']);

    let err = api.fetch_image("/outputs/missing.png").await.unwrap_err();
    assert_matches!(err, ClientError::Backend { status: 404, .. });
}
