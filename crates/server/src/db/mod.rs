use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;

mod models;

pub use models::*;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(path: &str) -> Result<Self> {
        // Ensure the directory exists
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", path);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;

        Ok(Self { pool })
    }

    /// In-memory database for tests. A single connection, so every query sees
    /// the same store.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'student',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS qrcodes (
                id TEXT PRIMARY KEY,
                course TEXT NOT NULL,
                qr_value TEXT UNIQUE NOT NULL,
                user_id TEXT NOT NULL REFERENCES users(id),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // No UNIQUE(user_id, course) here: the direct marking endpoint is allowed
        // to insert duplicate pending rows for the same pair.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS attendances (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                course TEXT NOT NULL,
                confirmed INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    // User operations
    pub async fn create_user(&self, user: &User) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO users (id, email, password_hash, role) VALUES (?, ?, ?, ?)")
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, role, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn get_student_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, role, created_at FROM users WHERE email = ? AND role = 'student'",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn list_students(&self) -> Result<Vec<User>, sqlx::Error> {
        let students = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, role, created_at FROM users WHERE role = 'student'",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(students)
    }

    // QR code (session) operations
    pub async fn create_qrcode(&self, qr: &QrCode) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO qrcodes (id, course, qr_value, user_id) VALUES (?, ?, ?, ?)")
            .bind(&qr.id)
            .bind(&qr.course)
            .bind(&qr.qr_value)
            .bind(&qr.user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_qrcode_by_value(&self, qr_value: &str) -> Result<Option<QrCode>, sqlx::Error> {
        let qr = sqlx::query_as::<_, QrCode>(
            "SELECT id, course, qr_value, user_id, created_at FROM qrcodes WHERE qr_value = ?",
        )
        .bind(qr_value)
        .fetch_optional(&self.pool)
        .await?;
        Ok(qr)
    }

    pub async fn list_qrcodes(&self) -> Result<Vec<QrCodeWithTeacher>, sqlx::Error> {
        let qrcodes = sqlx::query_as::<_, QrCodeWithTeacher>(
            r#"
            SELECT q.id, q.course, q.qr_value, q.user_id, u.email AS teacher_email, q.created_at
            FROM qrcodes q
            LEFT JOIN users u ON u.id = q.user_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(qrcodes)
    }

    /// Total number of sessions ever opened. This is the absence denominator.
    pub async fn count_qrcodes(&self) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM qrcodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // Attendance operations
    pub async fn create_attendance(&self, record: &AttendanceRecord) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO attendances (id, user_id, course, confirmed) VALUES (?, ?, ?, ?)")
            .bind(&record.id)
            .bind(&record.user_id)
            .bind(&record.course)
            .bind(record.confirmed)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_attendance_by_course(
        &self,
        course: &str,
    ) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        let records = sqlx::query_as::<_, AttendanceRecord>(
            "SELECT id, user_id, course, confirmed, created_at FROM attendances WHERE course = ?",
        )
        .bind(course)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn list_attendance(&self) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        let records = sqlx::query_as::<_, AttendanceRecord>(
            "SELECT id, user_id, course, confirmed, created_at FROM attendances",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn count_confirmed_for_user(&self, user_id: &str) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attendances WHERE user_id = ? AND confirmed = 1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Atomically confirm attendance for (user, course).
    ///
    /// Runs in one transaction: if a confirmed row already exists nothing is
    /// written, otherwise upgrade an existing pending row, otherwise insert a
    /// confirmed row guarded by NOT EXISTS so two interleaved confirms for a
    /// fresh pair can never both insert.
    pub async fn confirm_attendance(
        &self,
        user_id: &str,
        course: &str,
    ) -> Result<ConfirmOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let confirmed = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attendances WHERE user_id = ? AND course = ? AND confirmed = 1",
        )
        .bind(user_id)
        .bind(course)
        .fetch_one(&mut *tx)
        .await?;

        if confirmed > 0 {
            tx.commit().await?;
            return Ok(ConfirmOutcome::AlreadyConfirmed);
        }

        let upgraded = sqlx::query(
            "UPDATE attendances SET confirmed = 1 WHERE user_id = ? AND course = ? AND confirmed = 0",
        )
        .bind(user_id)
        .bind(course)
        .execute(&mut *tx)
        .await?;

        if upgraded.rows_affected() > 0 {
            tx.commit().await?;
            return Ok(ConfirmOutcome::ConfirmedNow);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO attendances (id, user_id, course, confirmed)
            SELECT ?, ?, ?, 1
            WHERE NOT EXISTS (
                SELECT 1 FROM attendances WHERE user_id = ? AND course = ?
            )
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(course)
        .bind(user_id)
        .bind(course)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if inserted.rows_affected() > 0 {
            Ok(ConfirmOutcome::Created)
        } else {
            Ok(ConfirmOutcome::AlreadyConfirmed)
        }
    }
}
