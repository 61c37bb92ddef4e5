//! Session registry endpoints: teachers open course sessions identified by a
//! unique QR code value.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{QrCode, QrCodeWithTeacher, Role},
    error::AppError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct GenerateQrRequest {
    pub email: String,
    pub course: String,
    pub qr_value: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateQrResponse {
    pub message: String,
    pub qr_id: String,
    pub user_id: String,
}

pub async fn generate_qr(
    State(state): State<AppState>,
    Json(req): Json<GenerateQrRequest>,
) -> Result<Json<GenerateQrResponse>, AppError> {
    let user = state
        .db
        .get_user_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.role != Role::Teacher {
        return Err(AppError::Forbidden(
            "Only teachers can generate QR codes".to_string(),
        ));
    }

    if state.db.get_qrcode_by_value(&req.qr_value).await?.is_some() {
        return Err(AppError::DuplicateToken);
    }

    let qr = QrCode {
        id: Uuid::new_v4().to_string(),
        course: req.course,
        qr_value: req.qr_value,
        user_id: user.id,
        created_at: None,
    };
    state.db.create_qrcode(&qr).await?;
    tracing::info!(course = %qr.course, teacher = %req.email, "session opened");

    Ok(Json(GenerateQrResponse {
        message: "QR Code saved successfully".to_string(),
        qr_id: qr.id,
        user_id: qr.user_id,
    }))
}

pub async fn list_qrcodes(
    State(state): State<AppState>,
) -> Result<Json<Vec<QrCodeWithTeacher>>, AppError> {
    let qrcodes = state.db.list_qrcodes().await?;
    Ok(Json(qrcodes))
}
