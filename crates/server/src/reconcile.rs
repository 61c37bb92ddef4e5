//! Attendance reconciliation: idempotent confirmation and the derived absence
//! tally. Absence is never stored; it is recomputed from the session count and
//! the confirmed rows on every call.

use serde::Serialize;

use crate::{
    db::{ConfirmOutcome, Database},
    error::AppError,
};

#[derive(Debug, Clone, Serialize)]
pub struct Absentee {
    pub user_id: String,
    pub email: String,
    pub absences: i64,
}

#[derive(Debug)]
pub enum AbsenceReport {
    /// No session has ever been opened, so absence is undefined.
    NoSessions,
    Absentees(Vec<Absentee>),
}

/// Confirm attendance for (email, course).
///
/// Any user matching the email is accepted, teachers included; the direct
/// marking endpoint requires role=student but this flow never has.
pub async fn confirm(
    db: &Database,
    email: &str,
    course: &str,
) -> Result<ConfirmOutcome, AppError> {
    let user = db
        .get_user_by_email(email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let outcome = db.confirm_attendance(&user.id, course).await?;
    tracing::debug!(email, course, ?outcome, "attendance confirmation resolved");
    Ok(outcome)
}

/// Per-student absence tally: `total sessions - confirmed rows`, reported only
/// when positive. Both counts are global across courses, matching how sessions
/// are counted.
pub async fn compute_absences(db: &Database) -> Result<AbsenceReport, AppError> {
    let total_sessions = db.count_qrcodes().await?;
    if total_sessions == 0 {
        return Ok(AbsenceReport::NoSessions);
    }

    let mut absentees = Vec::new();
    for student in db.list_students().await? {
        let confirmed = db.count_confirmed_for_user(&student.id).await?;
        let absences = total_sessions - confirmed;
        if absences > 0 {
            absentees.push(Absentee {
                user_id: student.id,
                email: student.email,
                absences,
            });
        }
    }

    Ok(AbsenceReport::Absentees(absentees))
}
