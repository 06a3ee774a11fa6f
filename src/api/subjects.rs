use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentStaff, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Subject, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::subject::{EnrollmentRequest, SubjectCreate, SubjectResponse, SubjectUpdate};
use crate::schemas::MessageResponse;

#[derive(Debug, Deserialize)]
pub(crate) struct SubjectListQuery {
    #[serde(default, alias = "facultyId")]
    faculty_id: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subjects).post(create_subject))
        .route("/:subject_id", get(get_subject).put(update_subject).delete(delete_subject))
        .route("/:subject_id/enrollments", post(enroll_student))
        .route("/:subject_id/enrollments/:student_id", delete(unenroll_student))
}

pub(crate) async fn build_subject_response(
    state: &AppState,
    subject: Subject,
) -> Result<SubjectResponse, ApiError> {
    let faculty = match subject.assigned_faculty_id.as_deref() {
        Some(faculty_id) => repositories::users::find_by_id(state.db(), faculty_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load assigned faculty"))?,
        None => None,
    };
    let enrolled_count = repositories::enrollments::count_by_subject(state.db(), &subject.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count enrollments"))?;

    Ok(SubjectResponse::from_db(subject, faculty, enrolled_count))
}

/// Resolves a faculty reference (user id or institutional id) to a teacher account.
async fn resolve_faculty(state: &AppState, reference: &str) -> Result<User, ApiError> {
    repositories::users::find_by_reference(state.db(), reference.trim())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load faculty"))?
        .filter(|user| user.role == UserRole::Teacher)
        .ok_or_else(|| ApiError::BadRequest("Assigned faculty must be an existing teacher".to_string()))
}

async fn fetch_subject(state: &AppState, subject_id: &str) -> Result<Subject, ApiError> {
    repositories::subjects::find_by_id(state.db(), subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch subject"))?
        .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))
}

fn duplicate_code() -> ApiError {
    ApiError::Conflict("Subject code already exists".to_string())
}

async fn list_subjects(
    Query(params): Query<SubjectListQuery>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    let faculty_id = match params.faculty_id.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(reference) => {
            let faculty = repositories::users::find_by_reference(state.db(), reference)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to load faculty"))?;
            match faculty {
                Some(faculty) => Some(faculty.id),
                None => return Ok(Json(Vec::new())),
            }
        }
        None => None,
    };

    let subjects = repositories::subjects::list(state.db(), faculty_id.as_deref())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list subjects"))?;

    let mut response = Vec::with_capacity(subjects.len());
    for subject in subjects {
        response.push(build_subject_response(&state, subject).await?);
    }
    Ok(Json(response))
}

async fn create_subject(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SubjectCreate>,
) -> Result<(StatusCode, Json<SubjectResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let subject_code = payload.subject_code.trim().to_string();
    let taken = repositories::subjects::code_taken(state.db(), &subject_code, None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check subject code"))?;
    if taken {
        return Err(duplicate_code());
    }

    let faculty = match payload.assigned_faculty.as_deref().filter(|v| !v.trim().is_empty()) {
        Some(reference) => Some(resolve_faculty(&state, reference).await?),
        None => None,
    };

    let subject = repositories::subjects::create(
        state.db(),
        repositories::subjects::CreateSubject {
            id: &Uuid::new_v4().to_string(),
            subject_name: payload.subject_name.trim(),
            subject_code: &subject_code,
            course_level: payload.course_level,
            prerequisite: payload.prerequisite.as_deref().map(str::trim).filter(|v| !v.is_empty()),
            assigned_faculty_id: faculty.as_ref().map(|user| user.id.as_str()),
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            duplicate_code()
        } else {
            ApiError::internal(e, "Failed to create subject")
        }
    })?;

    tracing::info!(
        admin_id = %admin.id,
        subject_id = %subject.id,
        subject_code = %subject.subject_code,
        "Subject created"
    );

    Ok((StatusCode::CREATED, Json(SubjectResponse::from_db(subject, faculty, 0))))
}

async fn get_subject(
    Path(subject_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubjectResponse>, ApiError> {
    let subject = fetch_subject(&state, &subject_id).await?;
    let students = repositories::enrollments::list_students(state.db(), &subject.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrolled students"))?;

    let response = build_subject_response(&state, subject).await?.with_students(students);
    Ok(Json(response))
}

async fn update_subject(
    Path(subject_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SubjectUpdate>,
) -> Result<Json<SubjectResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    fetch_subject(&state, &subject_id).await?;

    let subject_code = payload.subject_code.as_deref().map(|code| code.trim().to_string());
    if let Some(code) = subject_code.as_deref() {
        let taken = repositories::subjects::code_taken(state.db(), code, Some(&subject_id))
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check subject code"))?;
        if taken {
            return Err(duplicate_code());
        }
    }

    let assigned_faculty_id = match payload.assigned_faculty.as_deref().filter(|v| !v.trim().is_empty())
    {
        Some(reference) => Some(resolve_faculty(&state, reference).await?.id),
        None => None,
    };

    let subject = repositories::subjects::update(
        state.db(),
        &subject_id,
        repositories::subjects::UpdateSubject {
            subject_name: payload.subject_name.map(|name| name.trim().to_string()),
            subject_code,
            course_level: payload.course_level,
            prerequisite: payload.prerequisite,
            assigned_faculty_id,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            duplicate_code()
        } else {
            ApiError::internal(e, "Failed to update subject")
        }
    })?
    .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;

    tracing::info!(admin_id = %admin.id, subject_id = %subject.id, "Subject updated");
    Ok(Json(build_subject_response(&state, subject).await?))
}

async fn delete_subject(
    Path(subject_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    fetch_subject(&state, &subject_id).await?;

    let exam_count = repositories::subjects::count_exams(state.db(), &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count subject exams"))?;
    if exam_count > 0 {
        return Err(ApiError::Conflict("Subject has exams and cannot be deleted".to_string()));
    }

    repositories::subjects::delete_by_id(state.db(), &subject_id).await.map_err(|e| {
        if crate::db::is_foreign_key_violation(&e) {
            ApiError::Conflict("Subject has exams and cannot be deleted".to_string())
        } else {
            ApiError::internal(e, "Failed to delete subject")
        }
    })?;

    tracing::info!(admin_id = %admin.id, subject_id = %subject_id, "Subject deleted");
    Ok(Json(MessageResponse::new("Subject deleted successfully")))
}

async fn enroll_student(
    Path(subject_id): Path<String>,
    CurrentStaff(staff): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<EnrollmentRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let subject = fetch_subject(&state, &subject_id).await?;
    let student = repositories::users::find_by_reference(state.db(), payload.student_id.trim())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))?
        .filter(|user| user.role == UserRole::Student)
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    let enrolled =
        repositories::enrollments::enroll(state.db(), &subject.id, &student.id, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to enroll student"))?;
    if !enrolled {
        return Err(ApiError::Conflict("Student is already enrolled in this subject".to_string()));
    }

    tracing::info!(
        staff_id = %staff.id,
        subject_id = %subject.id,
        student_id = %student.id,
        "Student enrolled"
    );
    Ok((StatusCode::CREATED, Json(MessageResponse::new("Student enrolled successfully"))))
}

async fn unenroll_student(
    Path((subject_id, student_ref)): Path<(String, String)>,
    CurrentStaff(staff): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let subject = fetch_subject(&state, &subject_id).await?;
    let student = repositories::users::find_by_reference(state.db(), &student_ref)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))?
        .ok_or_else(|| ApiError::NotFound("Student is not enrolled in this subject".to_string()))?;

    let removed = repositories::enrollments::unenroll(state.db(), &subject.id, &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to unenroll student"))?;
    if !removed {
        return Err(ApiError::NotFound("Student is not enrolled in this subject".to_string()));
    }

    tracing::info!(
        staff_id = %staff.id,
        subject_id = %subject.id,
        student_id = %student.id,
        "Student unenrolled"
    );
    Ok(Json(MessageResponse::new("Student removed from subject")))
}
