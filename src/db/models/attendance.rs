//! Attendance data model.
//!
//! One row per accepted scan. The scanner has no payload parsing, so the
//! decoded QR text is used both as the student id and as the raw data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Option<i64>,
    pub student_id: String,
    pub qr_data: String,
    pub timestamp: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Builds an unsaved record for a freshly accepted code.
    pub fn from_scan(code: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            student_id: code.to_string(),
            qr_data: code.to_string(),
            timestamp,
        }
    }
}

/// Dashboard counters over the whole attendance table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    pub total_scans: u64,
    pub unique_students: u64,
    pub today_scans: u64,
}
