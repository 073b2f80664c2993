use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{
    helpers::{parse_datetime, to_u64},
    models::{AttendanceRecord, AttendanceSummary},
    Database,
};

type RawRow = (i64, String, Option<String>, Option<String>);

impl Database {
    /// Inserts and commits one record, returning its row id.
    pub async fn insert_attendance(&self, record: &AttendanceRecord) -> Result<i64> {
        let record = record.clone();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open attendance transaction")?;
            tx.execute(
                "INSERT INTO attendance (student_id, qr_data, timestamp) VALUES (?1, ?2, ?3)",
                params![
                    record.student_id,
                    record.qr_data,
                    record.timestamp.to_rfc3339(),
                ],
            )
            .context("failed to insert attendance record")?;
            let id = tx.last_insert_rowid();
            tx.commit().context("failed to commit attendance record")?;
            Ok(id)
        })
        .await
    }

    pub async fn get_attendance(&self, id: i64) -> Result<Option<AttendanceRecord>> {
        self.execute(move |conn| {
            let raw: Option<RawRow> = conn
                .query_row(
                    "SELECT id, student_id, qr_data, timestamp FROM attendance WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .optional()?;
            raw.map(into_record).transpose()
        })
        .await
    }

    /// All records, newest first.
    pub async fn list_attendance(&self) -> Result<Vec<AttendanceRecord>> {
        self.execute(|conn| {
            query_records(
                conn,
                "SELECT id, student_id, qr_data, timestamp
                 FROM attendance
                 ORDER BY timestamp DESC, id DESC",
                None,
            )
        })
        .await
    }

    pub async fn list_attendance_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttendanceRecord>> {
        let student_id = student_id.to_string();
        self.execute(move |conn| {
            query_records(
                conn,
                "SELECT id, student_id, qr_data, timestamp
                 FROM attendance
                 WHERE student_id = ?1
                 ORDER BY timestamp DESC, id DESC",
                Some(&student_id),
            )
        })
        .await
    }

    /// Totals for the dashboard. A scan counts towards today when it falls on
    /// the calendar day of `now`, read in `now`'s time zone.
    pub async fn attendance_summary<Tz>(&self, now: DateTime<Tz>) -> Result<AttendanceSummary>
    where
        Tz: TimeZone + Send + 'static,
        Tz::Offset: Send,
    {
        let zone = now.timezone();
        let today = now.date_naive();
        self.execute(move |conn| {
            let (total, unique): (i64, i64) = conn
                .query_row(
                    "SELECT COUNT(*), COUNT(DISTINCT student_id) FROM attendance",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .context("failed to compute attendance summary")?;

            let mut stmt =
                conn.prepare("SELECT timestamp FROM attendance WHERE timestamp IS NOT NULL")?;
            let mut today_scans = 0u64;
            for raw in stmt.query_map([], |row| row.get::<_, String>(0))? {
                let timestamp = parse_datetime(&raw?, "timestamp")?;
                if timestamp.with_timezone(&zone).date_naive() == today {
                    today_scans += 1;
                }
            }

            Ok(AttendanceSummary {
                total_scans: to_u64(total, "total_scans")?,
                unique_students: to_u64(unique, "unique_students")?,
                today_scans,
            })
        })
        .await
    }
}

fn query_records(
    conn: &Connection,
    sql: &str,
    student_id: Option<&str>,
) -> Result<Vec<AttendanceRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<RawRow> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    };

    let raw_rows = match student_id {
        Some(id) => stmt.query_map(params![id], map_row)?,
        None => stmt.query_map([], map_row)?,
    };

    let mut records = Vec::new();
    for raw in raw_rows {
        records.push(into_record(raw?)?);
    }
    Ok(records)
}

fn into_record((id, student_id, qr_data, timestamp): RawRow) -> Result<AttendanceRecord> {
    let timestamp = timestamp
        .with_context(|| format!("attendance row {id} has no timestamp"))?;
    Ok(AttendanceRecord {
        id: Some(id),
        student_id,
        qr_data: qr_data.unwrap_or_default(),
        timestamp: parse_datetime(&timestamp, "timestamp")
            .with_context(|| format!("attendance row {id}"))?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};

    use super::*;

    fn record_at(code: &str, secs: i64) -> AttendanceRecord {
        AttendanceRecord::from_scan(code, Utc.timestamp_opt(1_714_550_400 + secs, 0).unwrap())
    }

    #[tokio::test]
    async fn round_trip_through_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.db");
        let record = AttendanceRecord::from_scan("S123", Utc::now());

        let id = {
            let db = Database::new(path.clone()).unwrap();
            let id = db.insert_attendance(&record).await.unwrap();
            db.close().unwrap();
            id
        };

        let db = Database::new(path).unwrap();
        let stored = db.get_attendance(id).await.unwrap().expect("row exists");
        assert_eq!(stored.student_id, "S123");
        assert_eq!(stored.qr_data, "S123");
        assert_eq!(stored.timestamp, record.timestamp);

        let raw: String = db
            .execute(move |conn| {
                Ok(conn.query_row(
                    "SELECT timestamp FROM attendance WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&raw).is_ok());
    }

    #[tokio::test]
    async fn lists_newest_first_and_filters_by_student() {
        let db = Database::in_memory().unwrap();
        db.insert_attendance(&record_at("A1", 0)).await.unwrap();
        db.insert_attendance(&record_at("B2", 10)).await.unwrap();
        db.insert_attendance(&record_at("A1", 20)).await.unwrap();

        let all = db.list_attendance().await.unwrap();
        let students: Vec<_> = all.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(students, ["A1", "B2", "A1"]);
        assert!(all[0].timestamp > all[2].timestamp);

        let a1 = db.list_attendance_for_student("A1").await.unwrap();
        assert_eq!(a1.len(), 2);
        assert!(a1.iter().all(|r| r.student_id == "A1"));

        assert!(db.list_attendance_for_student("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_rows_using_column_default_timestamp() {
        let db = Database::in_memory().unwrap();
        db.execute(|conn| {
            conn.execute("INSERT INTO attendance (student_id) VALUES ('LEGACY')", [])?;
            Ok(())
        })
        .await
        .unwrap();

        let rows = db.list_attendance().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].qr_data, "");
    }

    #[tokio::test]
    async fn summary_counts_totals_unique_and_today() {
        let db = Database::in_memory().unwrap();
        let now = record_at("A1", 0).timestamp;
        db.insert_attendance(&record_at("A1", 0)).await.unwrap();
        db.insert_attendance(&record_at("A1", 60)).await.unwrap();
        db.insert_attendance(&record_at("B2", 120)).await.unwrap();
        db.insert_attendance(&record_at("C3", -86_400)).await.unwrap();

        let summary = db.attendance_summary(now).await.unwrap();
        assert_eq!(
            summary,
            AttendanceSummary {
                total_scans: 4,
                unique_students: 3,
                today_scans: 3,
            }
        );
    }

    #[tokio::test]
    async fn summary_of_empty_table_is_zero() {
        let db = Database::in_memory().unwrap();
        let summary = db
            .attendance_summary(Utc::now())
            .await
            .unwrap();
        assert_eq!(summary.total_scans, 0);
        assert_eq!(summary.today_scans, 0);
    }

    #[tokio::test]
    async fn today_follows_the_viewer_time_zone() {
        let db = Database::in_memory().unwrap();
        // 2024-05-01 22:30 UTC is already 2024-05-02 in UTC+8.
        let evening_utc = Utc.with_ymd_and_hms(2024, 5, 1, 22, 30, 0).unwrap();
        let morning_utc = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
        db.insert_attendance(&AttendanceRecord::from_scan("A1", evening_utc))
            .await
            .unwrap();
        db.insert_attendance(&AttendanceRecord::from_scan("B2", morning_utc))
            .await
            .unwrap();

        let utc_plus_8 = FixedOffset::east_opt(8 * 3600).unwrap();
        let now_plus_8 = utc_plus_8.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        assert_eq!(db.attendance_summary(now_plus_8).await.unwrap().today_scans, 2);

        let now_utc = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        assert_eq!(db.attendance_summary(now_utc).await.unwrap().today_scans, 1);
    }
}
