pub mod attendance;

pub use attendance::{AttendanceRecord, AttendanceSummary};
