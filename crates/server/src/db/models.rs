use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User role, stored as lowercase TEXT in the users table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Default for Role {
    fn default() -> Self {
        Role::Student
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: Option<String>,
}

/// One course session, identified by the QR code value a teacher generated for it.
#[derive(Debug, Clone, FromRow)]
pub struct QrCode {
    pub id: String,
    pub course: String,
    pub qr_value: String,
    pub user_id: String,
    pub created_at: Option<String>,
}

/// QR code row joined with the email of the teacher who generated it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QrCodeWithTeacher {
    pub id: String,
    pub course: String,
    pub qr_value: String,
    pub user_id: String,
    pub teacher_email: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub user_id: String,
    pub course: String,
    pub confirmed: bool,
    pub created_at: Option<String>,
}

/// How a confirmation request resolved. All three are success outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// No record existed; a confirmed one was created.
    Created,
    /// A pending record existed and was upgraded to confirmed.
    ConfirmedNow,
    /// A confirmed record already existed; nothing was written.
    AlreadyConfirmed,
}
