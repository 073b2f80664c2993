use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::db::AttendanceRecord;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("endpoint answered HTTP {status}")]
    Rejected { status: u16 },

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Something that mirrors attendance records to another service.
#[async_trait]
pub trait RemoteMirror: Send + Sync {
    /// Sends one record. `Ok` carries the 2xx status the service answered with.
    async fn send(&self, record: &AttendanceRecord) -> Result<u16, RemoteError>;
}

#[derive(Serialize)]
struct AttendancePayload<'a> {
    student_id: &'a str,
    qr_data: &'a str,
}

/// JSON client for the attendance web service.
#[derive(Clone)]
pub struct AttendanceApiClient {
    endpoint: String,
    client: reqwest::Client,
}

impl AttendanceApiClient {
    /// `timeout` bounds the whole request so a dead server cannot stall the
    /// scanner for longer than that.
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteMirror for AttendanceApiClient {
    async fn send(&self, record: &AttendanceRecord) -> Result<u16, RemoteError> {
        let payload = AttendancePayload {
            student_id: &record.student_id,
            qr_data: &record.qr_data,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    RemoteError::Timeout
                } else {
                    RemoteError::Transport(err)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(RemoteError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
