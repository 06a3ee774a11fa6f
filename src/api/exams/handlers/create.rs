use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStaff;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::exam::{ExamAuthoringResponse, ExamPayload};

use super::super::helpers;

pub(in crate::api::exams) async fn create_exam(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(mut payload): Json<ExamPayload>,
) -> Result<(StatusCode, Json<ExamAuthoringResponse>), ApiError> {
    let requested_creator = payload.created_by.take().filter(|id| !id.trim().is_empty());
    let content = helpers::validate_content(payload)?;

    helpers::ensure_subject_exists(&state, &content.subject_id).await?;

    let created_by = match requested_creator {
        Some(creator_id) if user.role == UserRole::Admin => {
            repositories::users::find_by_id(state.db(), creator_id.trim())
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch creator"))?
                .ok_or_else(|| ApiError::BadRequest("Invalid creator ID".to_string()))?
                .id
        }
        _ => user.id.clone(),
    };

    helpers::ensure_title_free(&state, &content.title, None).await?;

    let exam = repositories::exams::create(
        state.db(),
        repositories::exams::CreateExam {
            id: &Uuid::new_v4().to_string(),
            title: &content.title,
            instructions: &content.instructions,
            duration_minutes: content.duration_minutes,
            surveillance: content.surveillance,
            questions: content.questions,
            created_by: &created_by,
            subject_id: &content.subject_id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            helpers::duplicate_title()
        } else if crate::db::is_foreign_key_violation(&e) {
            ApiError::BadRequest("Invalid subject ID".to_string())
        } else {
            ApiError::internal(e, "Failed to create exam")
        }
    })?;

    tracing::info!(
        user_id = %user.id,
        exam_id = %exam.id,
        subject_id = %exam.subject_id,
        questions = exam.questions.0.len(),
        "Exam created"
    );

    Ok((StatusCode::CREATED, Json(ExamAuthoringResponse::from_db(exam))))
}
