//! Operational helpers: logging setup and the status history.

use std::{collections::VecDeque, sync::Arc};

use chrono::{DateTime, Utc};
use faceauth_types::{
    config::OpsConfig, operation::OperationKind, status::StatusState, FaceAuthError, Result,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| FaceAuthError::Ops(format!("failed to create log filter: {err}")))?;

    let directives = filter.to_string();
    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| FaceAuthError::Ops(format!("tracing init error: {err}")))?;
    info!("Tracing initialised with filter '{}'", directives);
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusRecord {
    pub operation: Option<OperationKind>,
    pub status: StatusState,
    pub recorded_at: DateTime<Utc>,
}

/// Bounded in-memory history of every status shown to the user.
#[derive(Clone)]
pub struct StatusLog {
    capacity: usize,
    records: Arc<Mutex<VecDeque<StatusRecord>>>,
}

impl StatusLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
        }
    }

    pub fn from_config(config: &OpsConfig) -> Self {
        Self::new(config.status_history)
    }

    /// Appends a status. Returns the oldest record when the log was full.
    pub async fn record(
        &self,
        operation: Option<OperationKind>,
        status: StatusState,
    ) -> Option<StatusRecord> {
        let mut records = self.records.lock().await;
        let evicted = if records.len() == self.capacity {
            records.pop_front()
        } else {
            None
        };
        if let Some(old) = &evicted {
            debug!("Status log full, dropping entry from {}", old.recorded_at);
        }
        records.push_back(StatusRecord {
            operation,
            status,
            recorded_at: Utc::now(),
        });
        evicted
    }

    pub async fn latest(&self) -> Option<StatusRecord> {
        self.records.lock().await.back().cloned()
    }

    pub async fn snapshot(&self) -> Vec<StatusRecord> {
        self.records.lock().await.iter().cloned().collect()
    }
}
