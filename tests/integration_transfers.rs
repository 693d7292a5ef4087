mod common;

use axum::Router;
use axum::http::StatusCode;
use common::{
    TestUser, create_test_exam_session, create_test_user, empty_request, json_request, send,
    setup_test_app,
};
use examtrack::examtrack_models::UserRole;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

struct Handover {
    app: Router,
    session_id: Uuid,
    invigilator: TestUser,
    lecturer: TestUser,
}

/// An exam session held by its invigilator, plus a lecturer to receive it.
async fn setup_handover(pool: &PgPool) -> Handover {
    let invigilator = create_test_user(pool, UserRole::Invigilator).await;
    let lecturer = create_test_user(pool, UserRole::Lecturer).await;
    let session_id = create_test_exam_session(pool, Some(invigilator.id)).await;

    Handover {
        app: setup_test_app(pool.clone()),
        session_id,
        invigilator,
        lecturer,
    }
}

async fn request_transfer(h: &Handover, script_count: i32) -> (StatusCode, Value) {
    send(
        &h.app,
        json_request(
            "POST",
            "/api/transfers",
            Some(&h.invigilator.token),
            json!({
                "exam_session_id": h.session_id,
                "to_handler_id": h.lecturer.id,
                "script_count": script_count,
                "notes": "Sealed envelope, 2 bundles",
            }),
        ),
    )
    .await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_request_transfer(pool: PgPool) {
    let h = setup_handover(&pool).await;

    let (status, body) = request_transfer(&h, 40).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["from_handler_id"], h.invigilator.id.to_string());
    assert_eq!(body["to_handler_id"], h.lecturer.id.to_string());
    assert_eq!(body["script_count"], 40);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_non_holder_cannot_request(pool: PgPool) {
    let h = setup_handover(&pool).await;
    let other = create_test_user(&pool, UserRole::Invigilator).await;

    let (status, body) = send(
        &h.app,
        json_request(
            "POST",
            "/api/transfers",
            Some(&h.lecturer.token),
            json!({
                "exam_session_id": h.session_id,
                "to_handler_id": other.id,
                "script_count": 40,
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "Only the current custody holder can hand over these scripts"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_second_pending_transfer_conflicts(pool: PgPool) {
    let h = setup_handover(&pool).await;

    let (status, _) = request_transfer(&h, 40).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request_transfer(&h, 40).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Exam session already has a pending transfer");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cannot_transfer_to_self(pool: PgPool) {
    let h = setup_handover(&pool).await;

    let (status, body) = send(
        &h.app,
        json_request(
            "POST",
            "/api/transfers",
            Some(&h.invigilator.token),
            json!({
                "exam_session_id": h.session_id,
                "to_handler_id": h.invigilator.id,
                "script_count": 40,
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot transfer scripts to yourself");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_recipient_must_be_handler(pool: PgPool) {
    let h = setup_handover(&pool).await;
    let admin = create_test_user(&pool, UserRole::Admin).await;

    let (status, _) = send(
        &h.app,
        json_request(
            "POST",
            "/api/transfers",
            Some(&h.invigilator.token),
            json!({
                "exam_session_id": h.session_id,
                "to_handler_id": admin.id,
                "script_count": 40,
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_recipient_can_confirm(pool: PgPool) {
    let h = setup_handover(&pool).await;
    let (_, transfer) = request_transfer(&h, 40).await;
    let uri = format!("/api/transfers/{}/confirm", transfer["id"].as_str().unwrap());

    let (status, body) = send(
        &h.app,
        json_request("POST", &uri, Some(&h.invigilator.token), json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Only the recipient can respond to this transfer");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_confirm_moves_custody(pool: PgPool) {
    let h = setup_handover(&pool).await;
    let (_, transfer) = request_transfer(&h, 40).await;
    let uri = format!("/api/transfers/{}/confirm", transfer["id"].as_str().unwrap());

    let (status, body) = send(
        &h.app,
        json_request("POST", &uri, Some(&h.lecturer.token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["received_count"], 40);
    assert_eq!(body["has_discrepancy"], false);

    let (status, chain) = send(
        &h.app,
        empty_request(
            "GET",
            &format!("/api/exam-sessions/{}/custody", h.session_id),
            Some(&h.lecturer.token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chain["current_holder_id"], h.lecturer.id.to_string());
    assert_eq!(chain["transfers"].as_array().unwrap().len(), 1);

    // Confirming twice is a state conflict, not a second hand-over.
    let (status, body) = send(
        &h.app,
        json_request("POST", &uri, Some(&h.lecturer.token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Transfer is already confirmed");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_short_count_opens_incident(pool: PgPool) {
    let h = setup_handover(&pool).await;
    let (_, transfer) = request_transfer(&h, 40).await;
    let transfer_id = transfer["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &h.app,
        json_request(
            "POST",
            &format!("/api/transfers/{}/confirm", transfer_id),
            Some(&h.lecturer.token),
            json!({"received_count": 37}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_discrepancy"], true);
    assert_eq!(body["received_count"], 37);
    assert_eq!(body["discrepancy_note"], "Expected 40 scripts, received 37");

    let (incident_type, severity, transfer_ref) = sqlx::query_as::<_, (String, String, Option<Uuid>)>(
        r#"SELECT incident_type::text, severity::text, batch_transfer_id
           FROM incidents WHERE exam_session_id = $1"#,
    )
    .bind(h.session_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(incident_type, "script_discrepancy");
    assert_eq!(severity, "high");
    assert_eq!(transfer_ref.map(|id| id.to_string()), Some(transfer_id));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reject_transfer(pool: PgPool) {
    let h = setup_handover(&pool).await;
    let (_, transfer) = request_transfer(&h, 40).await;
    let uri = format!("/api/transfers/{}/reject", transfer["id"].as_str().unwrap());

    let (status, _) = send(
        &h.app,
        json_request("POST", &uri, Some(&h.lecturer.token), json!({"reason": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &h.app,
        json_request(
            "POST",
            &uri,
            Some(&h.lecturer.token),
            json!({"reason": "Envelope seal broken"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["rejection_reason"], "Envelope seal broken");

    // The invigilator still holds the scripts and can try again.
    let (status, _) = request_transfer(&h, 40).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cancel_transfer(pool: PgPool) {
    let h = setup_handover(&pool).await;
    let (_, transfer) = request_transfer(&h, 40).await;
    let uri = format!("/api/transfers/{}/cancel", transfer["id"].as_str().unwrap());

    let (status, body) = send(&h.app, empty_request("POST", &uri, Some(&h.lecturer.token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Only the sender can cancel this transfer");

    let (status, body) = send(
        &h.app,
        empty_request("POST", &uri, Some(&h.invigilator.token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_report_discrepancy_after_confirm(pool: PgPool) {
    let h = setup_handover(&pool).await;
    let (_, transfer) = request_transfer(&h, 40).await;
    let id = transfer["id"].as_str().unwrap();
    let discrepancy_uri = format!("/api/transfers/{}/discrepancy", id);

    let (status, _) = send(
        &h.app,
        json_request(
            "POST",
            &discrepancy_uri,
            Some(&h.lecturer.token),
            json!({"note": "Too early"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(
        &h.app,
        json_request(
            "POST",
            &format!("/api/transfers/{}/confirm", id),
            Some(&h.lecturer.token),
            json!({}),
        ),
    )
    .await;

    let (status, body) = send(
        &h.app,
        json_request(
            "POST",
            &discrepancy_uri,
            Some(&h.lecturer.token),
            json!({"received_count": 39, "note": "One script found torn apart and unreadable"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_discrepancy"], true);
    assert_eq!(body["received_count"], 39);

    let incidents = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM incidents WHERE batch_transfer_id = $1",
    )
    .bind(Uuid::parse_str(id).unwrap())
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(incidents, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_by_direction(pool: PgPool) {
    let h = setup_handover(&pool).await;
    request_transfer(&h, 40).await;

    let (status, body) = send(
        &h.app,
        empty_request(
            "GET",
            "/api/transfers?direction=incoming",
            Some(&h.lecturer.token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);

    let (status, body) = send(
        &h.app,
        empty_request(
            "GET",
            "/api/transfers?direction=outgoing",
            Some(&h.lecturer.token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cancelled_session_cannot_be_transferred(pool: PgPool) {
    let h = setup_handover(&pool).await;
    sqlx::query("UPDATE exam_sessions SET status = 'cancelled' WHERE id = $1")
        .bind(h.session_id)
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = request_transfer(&h, 40).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "Scripts of a cancelled exam session cannot be transferred"
    );
}
