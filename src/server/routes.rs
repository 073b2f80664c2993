use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Local, Utc};
use log::error;
use serde::Deserialize;
use serde_json::json;

use crate::db::AttendanceRecord;

use super::ServerState;

#[derive(Deserialize)]
pub struct NewAttendance {
    pub student_id: String,
    pub qr_data: Option<String>,
}

fn internal_error(err: anyhow::Error) -> Response {
    error!("attendance API error: {err:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": format!("{err:#}") })),
    )
        .into_response()
}

pub async fn list_attendance(State(st): State<ServerState>) -> Response {
    match st.db.list_attendance().await {
        Ok(rows) => Json(json!({ "data": rows })).into_response(),
        Err(err) => internal_error(err),
    }
}

pub async fn student_attendance(
    State(st): State<ServerState>,
    Path(student_id): Path<String>,
) -> Response {
    match st.db.list_attendance_for_student(&student_id).await {
        Ok(rows) => Json(json!({ "data": rows })).into_response(),
        Err(err) => internal_error(err),
    }
}

/// Stores a scan sent by a scanner. The timestamp is assigned here.
pub async fn create_attendance(
    State(st): State<ServerState>,
    Json(body): Json<NewAttendance>,
) -> Response {
    if body.student_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "student_id is required" })),
        )
            .into_response();
    }

    let record = AttendanceRecord {
        id: None,
        student_id: body.student_id,
        qr_data: body.qr_data.unwrap_or_default(),
        timestamp: Utc::now(),
    };

    match st.db.insert_attendance(&record).await {
        Ok(id) => Json(json!({ "id": id })).into_response(),
        Err(err) => internal_error(err),
    }
}

pub async fn attendance_summary(State(st): State<ServerState>) -> Response {
    match st.db.attendance_summary(Local::now()).await {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => internal_error(err),
    }
}
