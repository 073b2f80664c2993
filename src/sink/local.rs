use anyhow::Result;
use async_trait::async_trait;

use crate::db::{AttendanceRecord, Database};

/// Append-only local attendance log.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Inserts and commits `record`, returning the assigned id.
    async fn append(&self, record: &AttendanceRecord) -> Result<i64>;

    /// Releases the underlying storage. Called once, when scanning stops.
    fn close(&self) -> Result<()>;
}

#[async_trait]
impl LocalStore for Database {
    async fn append(&self, record: &AttendanceRecord) -> Result<i64> {
        self.insert_attendance(record).await
    }

    fn close(&self) -> Result<()> {
        Database::close(self)
    }
}
