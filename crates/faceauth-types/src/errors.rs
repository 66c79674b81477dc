use thiserror::Error;

pub type Result<T, E = FaceAuthError> = std::result::Result<T, E>;

/// Unified error type covering every failure the capture pipeline can surface.
#[derive(Debug, Error)]
pub enum FaceAuthError {
    #[error("device error: {0}")]
    Device(String),
    #[error("capture error: {0}")]
    Capture(String),
    #[error("camera closed")]
    SessionClosed,
    #[error("network error: {0}")]
    Network(String),
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("busy: {0} already in progress")]
    Busy(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FaceAuthError {
    /// Text shown to the user. Category prefixes stay in the log output only.
    pub fn user_message(&self) -> String {
        match self {
            FaceAuthError::Device(_) => "Failed to access camera.".to_string(),
            FaceAuthError::Capture(message)
            | FaceAuthError::Network(message)
            | FaceAuthError::Validation(message)
            | FaceAuthError::Configuration(message)
            | FaceAuthError::Ops(message) => message.clone(),
            FaceAuthError::Api { message, .. } => message.clone(),
            FaceAuthError::SessionClosed => "camera closed".to_string(),
            FaceAuthError::Busy(operation) => format!("{operation} already in progress"),
            FaceAuthError::Other(err) => err.to_string(),
        }
    }

    /// Recoverable failures return the flow to idle without re-acquiring the camera.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FaceAuthError::Device(_) | FaceAuthError::SessionClosed)
    }
}
