//! Record sink: local persistence plus best-effort remote mirroring.
//!
//! Both writes are attempted for every record, in that order, and neither
//! outcome influences the other. Failures end up in the log and in the
//! returned [`StoreOutcome`]; nothing is retried or queued.

mod local;
mod remote;

use std::sync::Arc;

use anyhow::Result;

use crate::db::AttendanceRecord;

pub use local::LocalStore;
pub use remote::{AttendanceApiClient, RemoteError, RemoteMirror};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOutcome {
    Saved { id: i64 },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    Delivered { status: u16 },
    Rejected { status: u16 },
    TransportFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOutcome {
    pub local: LocalOutcome,
    pub remote: RemoteOutcome,
}

impl StoreOutcome {
    pub fn fully_stored(&self) -> bool {
        matches!(self.local, LocalOutcome::Saved { .. })
            && matches!(self.remote, RemoteOutcome::Delivered { .. })
    }
}

#[derive(Clone)]
pub struct RecordSink {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteMirror>,
}

impl RecordSink {
    pub fn new(local: Arc<dyn LocalStore>, remote: Arc<dyn RemoteMirror>) -> Self {
        Self { local, remote }
    }

    pub async fn store(&self, record: AttendanceRecord) -> StoreOutcome {
        let local = match self.local.append(&record).await {
            Ok(id) => {
                log_info!("Saved attendance for {} locally (id={id})", record.student_id);
                LocalOutcome::Saved { id }
            }
            Err(err) => {
                log_error!(
                    "Failed to save attendance for {} locally: {err:#}",
                    record.student_id
                );
                LocalOutcome::Failed {
                    reason: format!("{err:#}"),
                }
            }
        };

        let remote = match self.remote.send(&record).await {
            Ok(status) => {
                log_info!("Sent attendance for {} to web API", record.student_id);
                RemoteOutcome::Delivered { status }
            }
            Err(RemoteError::Rejected { status }) => {
                log_warn!(
                    "Web API rejected attendance for {}: HTTP {status}",
                    record.student_id
                );
                RemoteOutcome::Rejected { status }
            }
            Err(err) => {
                log_warn!(
                    "Failed to send attendance for {} to web API: {err}",
                    record.student_id
                );
                RemoteOutcome::TransportFailed {
                    reason: err.to_string(),
                }
            }
        };

        StoreOutcome { local, remote }
    }

    /// Closes the local store.
    pub fn close(&self) -> Result<()> {
        self.local.close()
    }
}
