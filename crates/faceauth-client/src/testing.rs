//! In-process stand-in for the face-authentication backend.
//!
//! Mirrors the backend's routes and reply shapes, records every request it
//! receives, and lets tests decide which faces match.

use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// What the backend saw in one request.
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    pub path: String,
    pub user_id: Option<String>,
    pub full_name: Option<String>,
    pub image_filename: Option<String>,
    pub image_content_type: Option<String>,
    pub image_bytes: usize,
}

#[derive(Default)]
struct BackendState {
    users: Mutex<BTreeMap<String, String>>,
    rejected: Mutex<HashSet<String>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl BackendState {
    fn record(&self, request: RecordedRequest) {
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(request);
        }
    }
}

pub struct MockBackend {
    state: Arc<BackendState>,
    base_url: String,
}

impl MockBackend {
    /// Binds to an ephemeral localhost port and serves until the runtime stops.
    pub async fn spawn() -> Self {
        let state = Arc::new(BackendState::default());
        let app = Router::new()
            .route("/api/enroll", post(enroll))
            .route("/api/verify", post(verify))
            .route("/api/users", get(users))
            .route("/api/delete", delete(delete_user))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            state,
            base_url: format!("http://{addr}"),
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    pub fn enroll_user(&self, user_id: &str, full_name: &str) {
        if let Ok(mut guard) = self.state.users.lock() {
            guard.insert(user_id.to_string(), full_name.to_string());
        }
    }

    /// Makes every verification for `user_id` come back as a mismatch.
    pub fn reject_face(&self, user_id: &str) {
        if let Ok(mut guard) = self.state.rejected.lock() {
            guard.insert(user_id.to_string());
        }
    }

    pub fn users(&self) -> Vec<String> {
        self.state
            .users
            .lock()
            .map(|users| users.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

type Reply = (StatusCode, Json<Value>);

async fn read_form(path: &str, mut multipart: Multipart) -> Result<RecordedRequest, Reply> {
    let mut request = RecordedRequest {
        path: path.to_string(),
        ..RecordedRequest::default()
    };
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("bad multipart body: {err}") })),
        )
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                request.image_filename = field.file_name().map(str::to_string);
                request.image_content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|err| {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "error": format!("bad image part: {err}") })),
                    )
                })?;
                request.image_bytes = bytes.len();
            }
            "user_id" => request.user_id = field.text().await.ok(),
            "full_name" => request.full_name = field.text().await.ok(),
            _ => {}
        }
    }
    Ok(request)
}

async fn enroll(State(state): State<Arc<BackendState>>, multipart: Multipart) -> Reply {
    let request = match read_form("/api/enroll", multipart).await {
        Ok(request) => request,
        Err(reply) => return reply,
    };
    state.record(request.clone());

    let (Some(user_id), Some(full_name)) = (
        request.user_id.filter(|v| !v.is_empty()),
        request.full_name.filter(|v| !v.is_empty()),
    ) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing user_id or full_name" })),
        );
    };
    if request.image_bytes == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No image uploaded" })),
        );
    }

    if let Ok(mut guard) = state.users.lock() {
        guard.insert(user_id.clone(), full_name);
    }
    (
        StatusCode::OK,
        Json(json!({ "message": format!("Enrolled {user_id}") })),
    )
}

async fn verify(State(state): State<Arc<BackendState>>, multipart: Multipart) -> Reply {
    let request = match read_form("/api/verify", multipart).await {
        Ok(request) => request,
        Err(reply) => return reply,
    };
    state.record(request.clone());

    let Some(user_id) = request.user_id.filter(|v| !v.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "User ID missing" })),
        );
    };
    let known = state
        .users
        .lock()
        .map(|users| users.contains_key(&user_id))
        .unwrap_or(false);
    if !known {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "User not found" })),
        );
    }
    if request.image_bytes == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No image uploaded" })),
        );
    }

    let rejected = state
        .rejected
        .lock()
        .map(|rejected| rejected.contains(&user_id))
        .unwrap_or(false);
    if rejected {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "status": "failed", "message": "Face mismatch" })),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({ "status": "success", "message": "Face verified" })),
        )
    }
}

async fn users(State(state): State<Arc<BackendState>>) -> Reply {
    state.record(RecordedRequest {
        path: "/api/users".into(),
        ..RecordedRequest::default()
    });
    let users: Vec<String> = state
        .users
        .lock()
        .map(|users| users.keys().cloned().collect())
        .unwrap_or_default();
    (StatusCode::OK, Json(json!({ "users": users })))
}

#[derive(Debug, Deserialize)]
struct DeleteParams {
    user_id: Option<String>,
}

async fn delete_user(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<DeleteParams>,
) -> Reply {
    state.record(RecordedRequest {
        path: "/api/delete".into(),
        user_id: params.user_id.clone(),
        ..RecordedRequest::default()
    });
    let removed = match (&params.user_id, state.users.lock()) {
        (Some(user_id), Ok(mut users)) => users.remove(user_id).is_some(),
        _ => false,
    };
    match params.user_id {
        Some(user_id) if removed => (
            StatusCode::OK,
            Json(json!({ "message": format!("User '{user_id}' deleted") })),
        ),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "User not found" })),
        ),
    }
}
