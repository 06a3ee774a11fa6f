use axum::http::{Method, StatusCode};
use serde_json::json;
use time::Duration;
use tower::ServiceExt;

use crate::api::errors::ApiError;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Exam, User};
use crate::db::types::{AttemptStatus, ExamStatus};
use crate::repositories;
use crate::test_support::{self, TestContext};

struct Fixture {
    teacher: User,
    student: User,
    exam: Exam,
}

async fn published_exam(ctx: &TestContext, digits: (&str, &str), title: &str) -> Fixture {
    let teacher = test_support::insert_teacher(ctx.state.db(), digits.0).await;
    let student = test_support::insert_student(ctx.state.db(), digits.1).await;
    let subject =
        test_support::insert_subject(ctx.state.db(), &format!("RS{}", digits.0), Some(&teacher.id))
            .await;
    test_support::enroll(ctx.state.db(), &subject.id, &student.id).await;
    let exam = test_support::insert_exam(
        ctx.state.db(),
        title,
        &subject.id,
        &teacher.id,
        test_support::two_choice_questions(),
        ExamStatus::Published,
    )
    .await;
    Fixture { teacher, student, exam }
}

async fn start_attempt(ctx: &TestContext, exam: &Exam, token: &str) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/{}/attempts", exam.id),
            Some(token),
            None,
        ))
        .await
        .expect("start attempt");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn submission_is_graded_and_recorded_once() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let fixture = published_exam(&ctx, ("910001", "910002"), "Graded once").await;
    let token = test_support::bearer_token(&fixture.student, ctx.state.settings());
    start_attempt(&ctx, &fixture.exam, &token).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/results",
            Some(&token),
            Some(json!({"examId": fixture.exam.id, "answers": {"q1": 1, "q2": "1", "extra": "x"}})),
        ))
        .await
        .expect("submit");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["score"], 50);
    assert_eq!(body["correct_answers"], 1);
    assert_eq!(body["total_questions"], 2);
    assert_eq!(body["answers"]["q1"], "1");
    assert_eq!(body["answers"]["extra"], "x");
    let result_id = body["id"].as_str().expect("result id").to_string();

    let attempt = repositories::attempts::find_by_exam_and_student(
        ctx.state.db(),
        &fixture.exam.id,
        &fixture.student.id,
    )
    .await
    .expect("load attempt")
    .expect("attempt exists");
    assert_eq!(attempt.status, AttemptStatus::Submitted);
    assert!(attempt.submitted_at.is_some());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/results",
            Some(&token),
            Some(json!({"exam_id": fixture.exam.id, "answers": {"q1": "0", "q2": "1"}})),
        ))
        .await
        .expect("resubmit");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        test_support::read_json(response).await["detail"],
        "Result already recorded for this exam"
    );

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/results/{result_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("own result");
    assert_eq!(response.status(), StatusCode::OK);

    let teacher_token = test_support::bearer_token(&fixture.teacher, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/results?exam_id={}", fixture.exam.id),
            Some(&teacher_token),
            None,
        ))
        .await
        .expect("staff list");
    let body = test_support::read_json(response).await;
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["items"][0]["id"], result_id.as_str());
}

#[tokio::test]
async fn perfect_answers_score_full_marks() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let fixture = published_exam(&ctx, ("910003", "910004"), "Perfect").await;
    let token = test_support::bearer_token(&fixture.student, ctx.state.settings());
    start_attempt(&ctx, &fixture.exam, &token).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/results",
            Some(&token),
            Some(json!({"exam_id": fixture.exam.id, "answers": {"q1": "0", "q2": " 1 "}})),
        ))
        .await
        .expect("submit");
    let body = test_support::read_json(response).await;
    assert_eq!(body["score"], 100);
    assert_eq!(body["correct_answers"], 2);
}

#[tokio::test]
async fn submission_requires_an_active_attempt() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let fixture = published_exam(&ctx, ("920001", "920002"), "No attempt").await;
    let token = test_support::bearer_token(&fixture.student, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/results",
            Some(&token),
            Some(json!({"exam_id": fixture.exam.id, "answers": {}})),
        ))
        .await
        .expect("submit");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test_support::read_json(response).await["detail"], "No active attempt for this exam");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/results",
            Some(&token),
            Some(json!({"exam_id": "missing", "answers": {}})),
        ))
        .await
        .expect("submit unknown");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn late_submission_expires_the_attempt() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let fixture = published_exam(&ctx, ("920003", "920004"), "Too late").await;

    let started_at = primitive_now_utc() - Duration::minutes(31);
    repositories::attempts::create(
        ctx.state.db(),
        repositories::attempts::CreateAttempt {
            id: "late-attempt",
            exam_id: &fixture.exam.id,
            student_id: &fixture.student.id,
            started_at,
            expires_at: started_at + Duration::minutes(30),
        },
    )
    .await
    .expect("seed attempt");

    let token = test_support::bearer_token(&fixture.student, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/results",
            Some(&token),
            Some(json!({"exam_id": fixture.exam.id, "answers": {"q1": "0"}})),
        ))
        .await
        .expect("submit");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test_support::read_json(response).await["detail"], "Attempt has expired");

    let attempt = repositories::attempts::find_by_exam_and_student(
        ctx.state.db(),
        &fixture.exam.id,
        &fixture.student.id,
    )
    .await
    .expect("load attempt")
    .expect("attempt exists");
    assert_eq!(attempt.status, AttemptStatus::Expired);
}

#[tokio::test]
async fn submission_within_grace_is_accepted() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let fixture = published_exam(&ctx, ("920005", "920006"), "Just in time").await;

    let started_at = primitive_now_utc() - Duration::minutes(30) - Duration::seconds(10);
    repositories::attempts::create(
        ctx.state.db(),
        repositories::attempts::CreateAttempt {
            id: "grace-attempt",
            exam_id: &fixture.exam.id,
            student_id: &fixture.student.id,
            started_at,
            expires_at: started_at + Duration::minutes(30),
        },
    )
    .await
    .expect("seed attempt");

    let token = test_support::bearer_token(&fixture.student, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/results",
            Some(&token),
            Some(json!({"exam_id": fixture.exam.id, "answers": {}})),
        ))
        .await
        .expect("submit");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(test_support::read_json(response).await["score"], 0);
}

#[tokio::test]
async fn results_are_private_to_their_owner() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let fixture = published_exam(&ctx, ("930001", "930002"), "Private").await;
    let other = test_support::insert_student(ctx.state.db(), "930003").await;
    let token = test_support::bearer_token(&fixture.student, ctx.state.settings());
    start_attempt(&ctx, &fixture.exam, &token).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/results",
            Some(&token),
            Some(json!({"exam_id": fixture.exam.id, "answers": {"q1": "0"}})),
        ))
        .await
        .expect("submit");
    let result_id = test_support::read_json(response).await["id"]
        .as_str()
        .expect("result id")
        .to_string();

    let other_token = test_support::bearer_token(&other, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/results/{result_id}"),
            Some(&other_token),
            None,
        ))
        .await
        .expect("foreign result");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/results",
            Some(&other_token),
            None,
        ))
        .await
        .expect("list own results");
    let body = test_support::read_json(response).await;
    assert_eq!(body["total_count"], 0);
}

#[tokio::test]
async fn attempt_expired_after_start_is_reported_as_expired() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let fixture = published_exam(&ctx, ("940001", "940002"), "Swept").await;
    let token = test_support::bearer_token(&fixture.student, ctx.state.settings());
    start_attempt(&ctx, &fixture.exam, &token).await;

    let attempt = repositories::attempts::find_by_exam_and_student(
        ctx.state.db(),
        &fixture.exam.id,
        &fixture.student.id,
    )
    .await
    .expect("load attempt")
    .expect("attempt exists");
    repositories::attempts::mark_expired(ctx.state.db(), &attempt.id, primitive_now_utc())
        .await
        .expect("expire attempt");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/results",
            Some(&token),
            Some(json!({"exam_id": fixture.exam.id, "answers": {"q1": "0"}})),
        ))
        .await
        .expect("submit");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test_support::read_json(response).await["detail"], "Attempt has expired");

    let recorded =
        repositories::results::count(ctx.state.db(), Some(&fixture.student.id), Some(&fixture.exam.id))
            .await
            .expect("count results");
    assert_eq!(recorded, 0);
}

#[tokio::test]
async fn attempt_expired_while_recording_is_not_a_duplicate() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let fixture = published_exam(&ctx, ("940003", "940004"), "Raced").await;
    let token = test_support::bearer_token(&fixture.student, ctx.state.settings());
    start_attempt(&ctx, &fixture.exam, &token).await;

    let observed = repositories::attempts::find_by_exam_and_student(
        ctx.state.db(),
        &fixture.exam.id,
        &fixture.student.id,
    )
    .await
    .expect("load attempt")
    .expect("attempt exists");
    assert_eq!(observed.status, AttemptStatus::Active);

    // The sweep closes the attempt after the handler has read it as active.
    repositories::attempts::mark_expired(ctx.state.db(), &observed.id, primitive_now_utc())
        .await
        .expect("expire attempt");

    let err = super::record_result(
        &ctx.state,
        &observed,
        repositories::results::CreateResult {
            id: "raced-result",
            user_id: &fixture.student.id,
            exam_id: &fixture.exam.id,
            answers: Default::default(),
            score: 0,
            correct_answers: 0,
            total_questions: 2,
            completed_at: primitive_now_utc(),
        },
    )
    .await
    .expect_err("expired attempt cannot record a result");
    assert!(
        matches!(&err, ApiError::BadRequest(detail) if detail == "Attempt has expired"),
        "unexpected error: {err:?}"
    );

    let recorded =
        repositories::results::count(ctx.state.db(), Some(&fixture.student.id), Some(&fixture.exam.id))
            .await
            .expect("count results");
    assert_eq!(recorded, 0);
}
