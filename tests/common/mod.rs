//! In-process mock of the Conductor Quantum API for integration tests.

#![allow(dead_code)]

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use conductorquantum::ClientConfig;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const TOKEN: &str = "test-token";

/// Model that answers after two seconds.
pub const SLOW_MODEL: &str = "slow-model";
/// Model whose lookup fails with a plain-text 500.
pub const BROKEN_MODEL: &str = "broken-model";
/// Model whose lookup returns 200 with a body that is not JSON.
pub const GARBLED_MODEL: &str = "garbled-model";
/// Model whose lookup returns an HTML 404.
pub const HTML_MISSING_MODEL: &str = "html-missing-model";
/// Model that rejects every input with a 422.
pub const STRICT_MODEL: &str = "strict-model";

/// One multipart upload received by the execute endpoint.
#[derive(Debug, Clone)]
pub struct Upload {
    pub model: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
    pub plot: Option<String>,
    pub dark_mode: Option<String>,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub requests: usize,
    pub last_authorization: Option<String>,
    pub last_headers: Vec<(String, String)>,
    pub last_uri: Option<String>,
    pub uploads: Vec<Upload>,
    results: Vec<Value>,
}

type Shared = Arc<Mutex<MockState>>;

// ============================================================================
// Server lifecycle
// ============================================================================

pub struct MockServer {
    pub base_url: String,
    state: Shared,
    // Owns the server when started for blocking clients.
    runtime: Option<tokio::runtime::Runtime>,
}

impl MockServer {
    /// Start on the current runtime, for async tests.
    pub async fn start() -> Self {
        let (base_url, state) = serve().await;
        Self {
            base_url,
            state,
            runtime: None,
        }
    }

    /// Start on a private runtime, for blocking tests.
    pub fn start_blocking() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("runtime");
        let (base_url, state) = runtime.block_on(serve());
        Self {
            base_url,
            state,
            runtime: Some(runtime),
        }
    }

    /// Client configuration pointing at this server with a valid token.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(TOKEN).with_base_url(&self.base_url)
    }

    pub fn requests(&self) -> usize {
        self.state.lock().unwrap().requests
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.lock().unwrap().last_authorization.clone()
    }

    pub fn last_header(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .last_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    pub fn last_uri(&self) -> Option<String> {
        self.state.lock().unwrap().last_uri.clone()
    }

    /// Store a result directly, as if a model had been executed.
    pub fn insert_result(&self, model: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let result = json!({
            "id": id,
            "model": model,
            "output": output_for(model).unwrap_or_else(|| json!({})),
            "created_at": "2024-11-02T10:15:00Z",
            "input_file_name": "seeded.npy",
            "input_file_size": 128,
        });
        self.state.lock().unwrap().results.push(result);
        id
    }
}

async fn serve() -> (String, Shared) {
    let state: Shared = Arc::default();
    let app = Router::new()
        .route("/v0/models", get(list_models).post(execute))
        .route("/v0/models/:id", get(model_info))
        .route("/v0/model-results", get(list_results))
        .route("/v0/model-results/:id", get(result_info).delete(delete_result))
        .route("/v0/model-results/:id/download", get(download))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    (format!("http://{addr}/v0"), state)
}

// ============================================================================
// Fixtures
// ============================================================================

fn catalogue() -> Vec<Value> {
    vec![
        json!({
            "id": "coulomb-blockade-classifier-v2",
            "name": "Coulomb blockade classifier",
            "description": "Classifies charge stability diagrams",
            "released": true,
            "number_of_runs": 120,
            "input_shape_requirements": {"ndim": 2},
        }),
        json!({
            "id": "pinch-off-parameter-extractor-v0",
            "name": "Pinch-off parameter extractor",
            "description": "Extracts pinch-off indices from a 1D sweep",
            "released": true,
            "number_of_runs": 37,
            "input_shape_requirements": {"ndim": 1},
        }),
        json!({
            "id": "coulomb-blockade-peak-detector-v1",
            "name": "Coulomb blockade peak detector",
            "description": "Finds Coulomb peaks in a 1D sweep",
            "released": false,
            "number_of_runs": 5,
            "input_shape_requirements": {"ndim": 1},
            "category": "coulomb-blockade",
        }),
    ]
}

fn output_for(model: &str) -> Option<Value> {
    match model {
        "coulomb-blockade-classifier-v2" => {
            Some(json!({"classification": "blockade", "score": 0.93}))
        }
        "pinch-off-parameter-extractor-v0" => Some(json!({
            "cut_off_index": 3,
            "transition_index": 10,
            "saturation_index": 20,
        })),
        "coulomb-blockade-peak-detector-v1" => Some(json!({"peak_indices": [4, 17, 33]})),
        SLOW_MODEL => Some(json!({})),
        _ => None,
    }
}

fn not_found(detail: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
}

fn validation_error(field: &str, msg: &str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "detail": [{"loc": ["body", field], "msg": msg, "type": "value_error"}]
        })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct Page {
    skip: Option<usize>,
    limit: Option<usize>,
}

impl Page {
    fn apply(&self, items: Vec<Value>) -> Vec<Value> {
        items
            .into_iter()
            .skip(self.skip.unwrap_or(0))
            .take(self.limit.unwrap_or(100))
            .collect()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn authenticate(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    {
        let mut s = state.lock().unwrap();
        s.requests += 1;
        s.last_authorization = authorization.clone();
        s.last_headers = request
            .headers()
            .iter()
            .filter_map(|(n, v)| Some((n.to_string(), v.to_str().ok()?.to_string())))
            .collect();
        s.last_uri = Some(request.uri().to_string());
    }

    if authorization.as_deref() != Some(format!("Bearer {TOKEN}").as_str()) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"detail": "Not authenticated"})),
        )
            .into_response();
    }
    next.run(request).await
}

async fn list_models(Query(page): Query<Page>) -> Json<Vec<Value>> {
    Json(page.apply(catalogue()))
}

async fn model_info(Path(id): Path<String>) -> Response {
    match id.as_str() {
        BROKEN_MODEL => (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response(),
        GARBLED_MODEL => (StatusCode::OK, "{not json").into_response(),
        HTML_MISSING_MODEL => (StatusCode::NOT_FOUND, "<h1>Not Found</h1>").into_response(),
        _ => match catalogue().into_iter().find(|m| m["id"] == id.as_str()) {
            Some(model) => Json(model).into_response(),
            None => not_found("Model not found"),
        },
    }
}

async fn execute(State(state): State<Shared>, mut multipart: Multipart) -> Response {
    let mut model = None;
    let mut plot = None;
    let mut dark_mode = None;
    let mut file = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "model" => model = field.text().await.ok(),
            "plot" => plot = field.text().await.ok(),
            "dark_mode" => dark_mode = field.text().await.ok(),
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
                file = Some((file_name, content_type, data));
            }
            _ => {}
        }
    }

    let Some(model) = model else {
        return validation_error("model", "Field required");
    };
    let Some((file_name, content_type, data)) = file else {
        return validation_error("file", "Field required");
    };
    if model == STRICT_MODEL {
        return validation_error("file", "Input array must be 2D");
    }
    if model == SLOW_MODEL {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    let Some(output) = output_for(&model) else {
        return not_found("Model not found");
    };

    let result = json!({
        "id": Uuid::new_v4().to_string(),
        "model": model,
        "output": output,
        "created_at": "2024-11-02T10:15:00Z",
        "input_file_name": file_name.clone().unwrap_or_default(),
        "input_file_size": data.len(),
    });

    let mut s = state.lock().unwrap();
    s.uploads.push(Upload {
        model,
        file_name,
        content_type,
        data,
        plot,
        dark_mode,
    });
    s.results.push(result.clone());
    Json(result).into_response()
}

async fn list_results(State(state): State<Shared>, Query(page): Query<Page>) -> Json<Vec<Value>> {
    let results = state.lock().unwrap().results.clone();
    let masked = results
        .into_iter()
        .map(|r| {
            json!({
                "id": r["id"],
                "model": r["model"],
                "created_at": r["created_at"],
                "output": r["output"],
            })
        })
        .collect();
    Json(page.apply(masked))
}

fn find_result(state: &Shared, id: &str) -> Option<Value> {
    state
        .lock()
        .unwrap()
        .results
        .iter()
        .find(|r| r["id"] == id)
        .cloned()
}

async fn result_info(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    match find_result(&state, &id) {
        Some(result) => Json(result).into_response(),
        None => not_found("Result not found"),
    }
}

async fn delete_result(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut s = state.lock().unwrap();
    let before = s.results.len();
    s.results.retain(|r| r["id"] != id.as_str());
    if s.results.len() == before {
        return not_found("Result not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn download(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let Some(result) = find_result(&state, &id) else {
        return not_found("Result not found");
    };
    let input_name = result["input_file_name"].as_str().unwrap_or("input.npy");
    let output = serde_json::to_vec(&result["output"]).unwrap();
    // Large enough to arrive in several chunks.
    let input = vec![0x5a; 200 * 1024];
    let archive = build_zip(&[("result.json", output.as_slice()), (input_name, input.as_slice())]);
    ([(header::CONTENT_TYPE, "application/zip")], archive).into_response()
}

// ============================================================================
// ZIP writer (stored entries)
// ============================================================================

pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

pub fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut directory = Vec::new();

    for (name, content) in files {
        let offset = out.len() as u32;
        let crc = crc32(content);
        let size = content.len() as u32;

        out.extend_from_slice(b"PK\x03\x04");
        out.extend_from_slice(&[20, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(content);

        directory.extend_from_slice(b"PK\x01\x02");
        directory.extend_from_slice(&[20, 0, 20, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        directory.extend_from_slice(&crc.to_le_bytes());
        directory.extend_from_slice(&size.to_le_bytes());
        directory.extend_from_slice(&size.to_le_bytes());
        directory.extend_from_slice(&(name.len() as u16).to_le_bytes());
        directory.extend_from_slice(&[0; 12]);
        directory.extend_from_slice(&offset.to_le_bytes());
        directory.extend_from_slice(name.as_bytes());
    }

    let directory_offset = out.len() as u32;
    out.extend_from_slice(&directory);
    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&(files.len() as u16).to_le_bytes());
    out.extend_from_slice(&(files.len() as u16).to_le_bytes());
    out.extend_from_slice(&(directory.len() as u32).to_le_bytes());
    out.extend_from_slice(&directory_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

/// Whether `dir` holds no entries.
pub fn dir_is_empty(dir: &std::path::Path) -> bool {
    std::fs::read_dir(dir).expect("read dir").next().is_none()
}
