//! Attendance ledger endpoints plus the reconciler's HTTP surface
//! (confirmation and the absentee report).

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    db::{AttendanceRecord, ConfirmOutcome},
    error::AppError,
    reconcile::{self, AbsenceReport},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct MarkAttendanceRequest {
    pub email: String,
    pub course: String,
}

/// Both fields optional to mirror the free-form confirmation payload; presence
/// is validated by hand so the missing-field error stays a 400, not a
/// deserialization failure.
#[derive(Debug, Deserialize)]
pub struct ConfirmAttendanceRequest {
    pub email: Option<String>,
    pub course: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmAttendanceResponse {
    pub success: bool,
    pub message: String,
}

pub async fn mark_attendance(
    State(state): State<AppState>,
    Json(req): Json<MarkAttendanceRequest>,
) -> Result<Json<Value>, AppError> {
    let student = state
        .db
        .get_student_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

    // Deliberately no dedup: each call inserts a fresh pending row.
    let record = AttendanceRecord {
        id: Uuid::new_v4().to_string(),
        user_id: student.id,
        course: req.course,
        confirmed: false,
        created_at: None,
    };
    state.db.create_attendance(&record).await?;

    Ok(Json(json!({ "message": "Attendance recorded successfully" })))
}

pub async fn get_attendance_by_course(
    State(state): State<AppState>,
    Path(course): Path<String>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    let records = state.db.list_attendance_by_course(&course).await?;
    Ok(Json(records))
}

pub async fn get_all_attendances(
    State(state): State<AppState>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    let records = state.db.list_attendance().await?;
    Ok(Json(records))
}

pub async fn confirm_attendance(
    State(state): State<AppState>,
    Json(req): Json<ConfirmAttendanceRequest>,
) -> Result<Json<ConfirmAttendanceResponse>, AppError> {
    let email = req.email.filter(|e| !e.is_empty());
    let course = req.course.filter(|c| !c.is_empty());
    let (email, course) = match (email, course) {
        (Some(email), Some(course)) => (email, course),
        _ => return Err(AppError::MissingFields),
    };

    let outcome = reconcile::confirm(&state.db, &email, &course).await?;
    let message = match outcome {
        ConfirmOutcome::Created => "Attendance created and confirmed successfully",
        ConfirmOutcome::ConfirmedNow => "Attendance confirmed successfully",
        ConfirmOutcome::AlreadyConfirmed => "Attendance already confirmed",
    };

    Ok(Json(ConfirmAttendanceResponse {
        success: true,
        message: message.to_string(),
    }))
}

pub async fn get_absentees(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    match reconcile::compute_absences(&state.db).await? {
        AbsenceReport::NoSessions => Ok(Json(json!({
            "message": "No course sessions have been held yet"
        }))),
        AbsenceReport::Absentees(absentees) => Ok(Json(json!(absentees))),
    }
}
