//! Command implementations behind the CLI.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use log::{error, info};

use crate::db::{AttendanceRecord, Database};
use crate::scanner::{CooldownGate, QrDetector, ScanLoop, ScanReport, ScannerController};
use crate::settings::Settings;
use crate::sink::{AttendanceApiClient, RecordSink};

/// Scans the configured camera until it fails or the user quits.
pub async fn scan(settings: &Settings) -> Result<ScanReport> {
    let db = Database::new(settings.db_path.clone())?;
    let client = AttendanceApiClient::new(settings.api_url.clone(), settings.request_timeout())?;
    info!("Mirroring scans to {}", client.endpoint());

    let source = open_camera(settings).inspect_err(|_| {
        if let Err(err) = db.close() {
            error!("Failed to close local store: {err:#}");
        }
    })?;

    let scan_loop = ScanLoop::new(
        source,
        Arc::new(QrDetector),
        CooldownGate::new(settings.cooldown()),
        RecordSink::new(Arc::new(db), Arc::new(client)),
    );

    let mut controller = ScannerController::new();
    controller.start(scan_loop)?;
    controller.stop_on_user_exit()?;
    controller.wait().await
}

#[cfg(target_os = "linux")]
fn open_camera(settings: &Settings) -> Result<Box<dyn crate::scanner::FrameSource>> {
    Ok(Box::new(crate::scanner::V4l2Camera::open(&settings.camera)?))
}

#[cfg(not(target_os = "linux"))]
fn open_camera(_settings: &Settings) -> Result<Box<dyn crate::scanner::FrameSource>> {
    anyhow::bail!("camera capture is only supported on Linux (V4L2)")
}

/// Runs the attendance web service until Ctrl+C.
pub async fn serve(settings: &Settings) -> Result<()> {
    let db = Database::new(settings.db_path.clone())?;
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {err}");
        }
        info!("Shutdown requested");
    };
    let result = crate::server::serve(&settings.server.bind, db.clone(), shutdown).await;
    db.close()?;
    result
}

/// Prints stored records, newest first.
pub async fn list(settings: &Settings, student: Option<&str>) -> Result<()> {
    let db = Database::new(settings.db_path.clone())?;
    let records = match student {
        Some(student_id) => db.list_attendance_for_student(student_id).await?,
        None => db.list_attendance().await?,
    };

    if records.is_empty() {
        println!("No records found");
    }
    for (index, record) in records.iter().enumerate() {
        println!("{}", format_row(index + 1, record));
    }
    db.close()
}

/// Prints total scans, unique students and today's scans.
pub async fn summary(settings: &Settings) -> Result<()> {
    let db = Database::new(settings.db_path.clone())?;
    let summary = db.attendance_summary(Local::now()).await?;
    println!("Total scans:     {}", summary.total_scans);
    println!("Unique students: {}", summary.unique_students);
    println!("Today's scans:   {}", summary.today_scans);
    db.close()
}

/// Writes the current settings to `path` as a starting point for editing.
pub fn init_config(settings: &Settings, path: &Path) -> Result<()> {
    settings
        .save(path)
        .with_context(|| format!("could not create {}", path.display()))?;
    println!("Wrote settings to {}", path.display());
    Ok(())
}

const MAX_QR_DATA_CHARS: usize = 40;

fn format_row(position: usize, record: &AttendanceRecord) -> String {
    let qr_data = if record.qr_data.is_empty() {
        "N/A".to_string()
    } else if record.qr_data.chars().count() > MAX_QR_DATA_CHARS {
        let head: String = record.qr_data.chars().take(MAX_QR_DATA_CHARS).collect();
        format!("{head}...")
    } else {
        record.qr_data.clone()
    };

    format!(
        "{position:>4}  {:<16}  {:<43}  {}",
        record.student_id,
        qr_data,
        record
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn long_qr_data_is_truncated() {
        let mut record = AttendanceRecord::from_scan("S1", Utc::now());
        record.qr_data = "x".repeat(60);
        let row = format_row(1, &record);
        assert!(row.contains(&format!("{}...", "x".repeat(40))));
        assert!(!row.contains(&"x".repeat(41)));
    }

    #[test]
    fn empty_qr_data_shows_placeholder() {
        let mut record = AttendanceRecord::from_scan("S1", Utc::now());
        record.qr_data.clear();
        assert!(format_row(3, &record).contains("N/A"));
    }

    #[tokio::test]
    async fn list_and_summary_read_the_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            db_path: dir.path().join("attendance.db"),
            ..Settings::default()
        };
        {
            let db = Database::new(settings.db_path.clone()).unwrap();
            db.insert_attendance(&AttendanceRecord::from_scan("S1", Utc::now()))
                .await
                .unwrap();
            db.close().unwrap();
        }

        list(&settings, None).await.unwrap();
        list(&settings, Some("S1")).await.unwrap();
        summary(&settings).await.unwrap();
    }
}
