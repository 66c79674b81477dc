use faceauth_types::{
    operation::{OperationKind, OperationResult},
    FaceAuthError, Result,
};
use serde::Deserialize;

/// Fields the backend may put in a JSON reply. Anything else is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ReplyBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ReplyBody {
    /// Lenient parse: a missing or non-JSON body yields no fields.
    pub fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    fn non_empty(field: &Option<String>) -> Option<String> {
        field
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }

    /// Failure text. Enroll replies put it in `error`, verify replies in `message`.
    fn failure_text(&self, kind: OperationKind) -> Option<String> {
        match kind {
            OperationKind::Enroll => {
                Self::non_empty(&self.error).or_else(|| Self::non_empty(&self.message))
            }
            OperationKind::Verify => {
                Self::non_empty(&self.message).or_else(|| Self::non_empty(&self.error))
            }
        }
    }
}

/// Maps an HTTP status and body onto an operation result.
pub fn interpret_reply(kind: OperationKind, status: u16, body: &[u8]) -> Result<OperationResult> {
    let reply = ReplyBody::parse(body);
    if (200..300).contains(&status) {
        let message = ReplyBody::non_empty(&reply.message)
            .unwrap_or_else(|| format!("{} succeeded", capitalize(kind.as_str())));
        Ok(OperationResult::success(message, status))
    } else {
        let message = reply
            .failure_text(kind)
            .unwrap_or_else(|| format!("{} failed with status {status}", capitalize(kind.as_str())));
        Err(FaceAuthError::Api { status, message })
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
