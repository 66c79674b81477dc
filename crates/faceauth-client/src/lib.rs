//! HTTP access to the face-authentication backend.

use std::time::Duration;

use async_trait::async_trait;
use faceauth_types::{
    config::ApiConfig,
    frame::CapturedFrame,
    operation::{EnrollmentRequest, OperationKind, OperationResult, VerificationRequest},
    FaceAuthError, Result,
};
use reqwest::multipart::{Form, Part};
use tracing::{debug, info, warn};

mod admin;
mod response;
#[cfg(any(test, feature = "test-backend"))]
pub mod testing;

pub use admin::{AdminClient, UserDirectory};
pub use response::{interpret_reply, ReplyBody};

pub const ENROLL_PATH: &str = "/api/enroll";
pub const VERIFY_PATH: &str = "/api/verify";
pub const USERS_PATH: &str = "/api/users";
pub const DELETE_PATH: &str = "/api/delete";

/// Sends captured frames to the backend. Never retries on its own.
#[async_trait]
pub trait SubmissionClient: Send + Sync {
    async fn enroll(&self, request: EnrollmentRequest) -> Result<OperationResult>;
    async fn verify(&self, request: VerificationRequest) -> Result<OperationResult>;
}

#[derive(Clone)]
pub struct HttpSubmissionClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSubmissionClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            http: build_http(config)?,
            base_url: normalize_base(&config.base_url)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn submit(&self, kind: OperationKind, path: &str, form: Form) -> Result<OperationResult> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Submitting {} request to {}", kind, url);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                warn!("{} request to {} got no response: {}", kind, url, err);
                network_error("Unable to reach the face authentication service.")
            })?;

        let status = response.status().as_u16();
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => {
                warn!("Failed to read {} response body: {}", kind, err);
                Vec::new()
            }
        };

        let result = interpret_reply(kind, status, &body);
        match &result {
            Ok(ok) => info!("{} accepted ({}): {}", kind, status, ok.message),
            Err(err) => warn!("{} rejected: {}", kind, err),
        }
        result
    }
}

#[async_trait]
impl SubmissionClient for HttpSubmissionClient {
    async fn enroll(&self, request: EnrollmentRequest) -> Result<OperationResult> {
        let image = image_part(&request.user_id, request.frame)?;
        let form = Form::new()
            .text("user_id", request.user_id)
            .text("full_name", request.full_name)
            .part("image", image);
        self.submit(OperationKind::Enroll, ENROLL_PATH, form).await
    }

    async fn verify(&self, request: VerificationRequest) -> Result<OperationResult> {
        let image = image_part(&request.user_id, request.frame)?;
        let form = Form::new()
            .text("user_id", request.user_id)
            .part("image", image);
        self.submit(OperationKind::Verify, VERIFY_PATH, form).await
    }
}

fn image_part(user_id: &str, frame: CapturedFrame) -> Result<Part> {
    let mime = frame.mime.clone();
    Part::bytes(frame.payload)
        .file_name(format!("{user_id}.jpg"))
        .mime_str(&mime)
        .map_err(|err| FaceAuthError::Capture(format!("invalid image mime type {mime}: {err}")))
}

pub(crate) fn build_http(config: &ApiConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .build()
        .map_err(|err| FaceAuthError::Configuration(format!("http client setup failed: {err}")))
}

pub(crate) fn normalize_base(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(FaceAuthError::Configuration(
            "api.base_url must not be empty".into(),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn network_error(message: impl Into<String>) -> FaceAuthError {
    FaceAuthError::Network(message.into())
}
