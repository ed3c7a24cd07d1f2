mod common;

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use common::{TestApp, ids};
use serde_json::json;
use tutordesk_models::PermissionLevel;
use tutordesk_models::users::UserRole;

#[tokio::test]
async fn test_create_lesson_sets_owner() {
    let app = TestApp::new();
    let tutor = app.user(UserRole::Instructor).await;
    let mia = app.student("Mia").await;

    let (status, body) = app
        .post(
            "/api/lessons",
            Some(&app.token_for(&tutor)),
            json!({
                "datetime": "2025-01-06T15:00:00Z",
                "plan": "scales",
                "student_ids": [mia.id]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["owner_id"], tutor.id.to_string());
    assert_eq!(body["student_ids"], json!([mia.id.to_string()]));
}

#[tokio::test]
async fn test_get_lesson_follows_capabilities() {
    let app = TestApp::new();
    let owner = app.user(UserRole::Instructor).await;
    let viewer = app.user(UserRole::Assistant).await;
    let stranger = app.user(UserRole::Instructor).await;
    let admin = app.user(UserRole::Admin).await;
    let lesson = app.lesson(Some(&owner), Utc::now(), &[]).await;
    app.grant(&viewer, &lesson, PermissionLevel::View).await;

    let uri = format!("/api/lessons/{}", lesson.id);
    for user in [&owner, &viewer, &admin] {
        let (status, body) = app.get(&uri, Some(&app.token_for(user))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], lesson.id.to_string());
    }

    let (status, body) = app.get(&uri, Some(&app.token_for(&stranger))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You do not have permission to view this lesson");
}

#[tokio::test]
async fn test_missing_lesson_is_not_found() {
    let app = TestApp::new();
    let tutor = app.user(UserRole::Instructor).await;

    let (status, _) = app
        .get(
            &format!("/api/lessons/{}", uuid::Uuid::new_v4()),
            Some(&app.token_for(&tutor)),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_access_endpoint_reports_capabilities() {
    let app = TestApp::new();
    let owner = app.user(UserRole::Instructor).await;
    let editor = app.user(UserRole::Assistant).await;
    let lesson = app.lesson(Some(&owner), Utc::now(), &[]).await;
    app.grant(&editor, &lesson, PermissionLevel::Edit).await;

    let uri = format!("/api/lessons/{}/access", lesson.id);

    let (status, body) = app.get(&uri, Some(&app.token_for(&editor))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_view"], true);
    assert_eq!(body["can_edit"], true);
    assert_eq!(body["can_manage"], false);

    let (_, body) = app.get(&uri, Some(&app.token_for(&owner))).await;
    assert_eq!(body["can_manage"], true);
}

#[tokio::test]
async fn test_edit_and_delete_require_matching_levels() {
    let app = TestApp::new();
    let owner = app.user(UserRole::Instructor).await;
    let viewer = app.user(UserRole::Assistant).await;
    let editor = app.user(UserRole::Assistant).await;
    let lesson = app.lesson(Some(&owner), Utc::now(), &[]).await;
    app.grant(&viewer, &lesson, PermissionLevel::View).await;
    app.grant(&editor, &lesson, PermissionLevel::Edit).await;

    let uri = format!("/api/lessons/{}", lesson.id);
    let change = json!({"notes": "worked on arpeggios"});

    let (status, _) = app.put(&uri, Some(&app.token_for(&viewer)), change.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.put(&uri, Some(&app.token_for(&editor)), change).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notes"], "worked on arpeggios");

    let (status, _) = app.delete(&uri, Some(&app.token_for(&editor))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, Some(&app.token_for(&owner))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&uri, Some(&app.token_for(&owner))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_participants_add_and_remove() {
    let app = TestApp::new();
    let owner = app.user(UserRole::Instructor).await;
    let mia = app.student("Mia").await;
    let lesson = app.lesson(Some(&owner), Utc::now(), &[]).await;
    let token = app.token_for(&owner);

    let uri = format!("/api/lessons/{}/students", lesson.id);
    let (status, body) = app
        .post(&uri, Some(&token), json!({"student_id": mia.id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student_ids"], json!([mia.id.to_string()]));

    let (status, _) = app
        .post(&uri, Some(&token), json!({"student_id": mia.id}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .delete(&format!("{}/{}", uri, mia.id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student_ids"], json!([]));

    let (status, _) = app
        .delete(&format!("{}/{}", uri, mia.id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_shows_owned_and_shared_lessons() {
    let app = TestApp::new();
    let tutor = app.user(UserRole::Instructor).await;
    let colleague = app.user(UserRole::Instructor).await;
    let own = app
        .lesson(Some(&tutor), Utc.with_ymd_and_hms(2025, 1, 6, 15, 0, 0).unwrap(), &[])
        .await;
    let shared = app
        .lesson(Some(&colleague), Utc.with_ymd_and_hms(2025, 1, 8, 15, 0, 0).unwrap(), &[])
        .await;
    app.lesson(Some(&colleague), Utc.with_ymd_and_hms(2025, 1, 9, 15, 0, 0).unwrap(), &[])
        .await;
    app.lesson(None, Utc.with_ymd_and_hms(2025, 1, 7, 15, 0, 0).unwrap(), &[])
        .await;
    app.grant(&tutor, &shared, PermissionLevel::View).await;
    let token = app.token_for(&tutor);

    let (status, body) = app.get("/api/lessons", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ids(&body["data"]),
        vec![shared.id.to_string(), own.id.to_string()]
    );
    assert!(body.get("meta").is_none());

    let (_, body) = app
        .get("/api/lessons?include_shared=false", Some(&token))
        .await;
    assert_eq!(ids(&body["data"]), vec![own.id.to_string()]);
}

#[tokio::test]
async fn test_admin_lists_every_lesson() {
    let app = TestApp::new();
    let admin = app.user(UserRole::Admin).await;
    let tutor = app.user(UserRole::Instructor).await;
    app.lesson(Some(&tutor), Utc::now(), &[]).await;
    app.lesson(None, Utc::now(), &[]).await;

    let (status, body) = app.get("/api/lessons", Some(&app.token_for(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_filters_by_window_group_and_student() {
    let app = TestApp::new();
    let tutor = app.user(UserRole::Instructor).await;
    let mia = app.student("Mia").await;
    let leo = app.student("Leo").await;
    let monday = app
        .lesson(
            Some(&tutor),
            Utc.with_ymd_and_hms(2025, 1, 6, 15, 0, 0).unwrap(),
            &[&mia],
        )
        .await;
    let wednesday = app
        .lesson(
            Some(&tutor),
            Utc.with_ymd_and_hms(2025, 1, 8, 15, 0, 0).unwrap(),
            &[&mia, &leo],
        )
        .await;
    let next_week = app
        .lesson(
            Some(&tutor),
            Utc.with_ymd_and_hms(2025, 1, 13, 15, 0, 0).unwrap(),
            &[&leo],
        )
        .await;
    let token = app.token_for(&tutor);

    let (_, body) = app
        .get("/api/lessons?start=2025-01-06", Some(&token))
        .await;
    assert_eq!(
        ids(&body["data"]),
        vec![wednesday.id.to_string(), monday.id.to_string()]
    );

    let (_, body) = app
        .get("/api/lessons?start=2025-01-06&range_length=14", Some(&token))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (_, body) = app
        .get(
            "/api/lessons?start=2025-01-06&end=2025-01-13T15:00:00Z",
            Some(&token),
        )
        .await;
    assert_eq!(ids(&body["data"])[0], next_week.id.to_string());

    let (_, body) = app.get("/api/lessons?group=true", Some(&token)).await;
    assert_eq!(ids(&body["data"]), vec![wednesday.id.to_string()]);

    let (_, body) = app
        .get(&format!("/api/lessons?student_id={}", leo.id), Some(&token))
        .await;
    assert_eq!(
        ids(&body["data"]),
        vec![next_week.id.to_string(), wednesday.id.to_string()]
    );
}

#[tokio::test]
async fn test_list_rejects_malformed_filters() {
    let app = TestApp::new();
    let tutor = app.user(UserRole::Instructor).await;
    let token = app.token_for(&tutor);

    for query in [
        "start=yesterday",
        "range_length=-3",
        "range_length=week",
        "group=maybe",
        "include_shared=perhaps",
    ] {
        let (status, body) = app
            .get(&format!("/api/lessons?{}", query), Some(&token))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", query);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_list_pagination_meta() {
    let app = TestApp::new();
    let tutor = app.user(UserRole::Instructor).await;
    for day in 1..=5 {
        app.lesson(
            Some(&tutor),
            Utc.with_ymd_and_hms(2025, 2, day, 10, 0, 0).unwrap(),
            &[],
        )
        .await;
    }
    let token = app.token_for(&tutor);

    let (_, body) = app
        .get("/api/lessons?page=3&per_page=2", Some(&token))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(
        body["meta"],
        json!({"page": 3, "per_page": 2, "total_pages": 3, "total_count": 5})
    );

    let (_, body) = app
        .get("/api/lessons?page=9&per_page=2", Some(&token))
        .await;
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["meta"]["total_count"], 5);
}

#[tokio::test]
async fn test_user_id_filter_scoping() {
    let app = TestApp::new();
    let admin = app.user(UserRole::Admin).await;
    let tutor = app.user(UserRole::Instructor).await;
    let other = app.user(UserRole::Instructor).await;
    let owned = app.lesson(Some(&tutor), Utc::now(), &[]).await;
    app.lesson(Some(&other), Utc::now(), &[]).await;

    let uri = format!("/api/lessons?user_id={}", tutor.id);

    let (status, _) = app.get(&uri, Some(&app.token_for(&other))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get(&uri, Some(&app.token_for(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["data"]), vec![owned.id.to_string()]);

    let (status, body) = app.get(&uri, Some(&app.token_for(&tutor))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["data"]), vec![owned.id.to_string()]);
}

#[tokio::test]
async fn test_assign_owner_claims_ownerless_lessons() {
    let app = TestApp::new();
    let admin = app.user(UserRole::Admin).await;
    let tutor = app.user(UserRole::Instructor).await;
    let legacy = app.lesson(None, Utc::now(), &[]).await;
    let body = json!({"owner_id": tutor.id});

    let (status, _) = app
        .post("/api/lessons/assign-owner", Some(&app.token_for(&tutor)), body.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, response) = app
        .post("/api/lessons/assign-owner", Some(&app.token_for(&admin)), body.clone())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["updated"], 1);

    let (status, lesson) = app
        .get(&format!("/api/lessons/{}", legacy.id), Some(&app.token_for(&tutor)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lesson["owner_id"], tutor.id.to_string());

    let (_, response) = app
        .post("/api/lessons/assign-owner", Some(&app.token_for(&admin)), body)
        .await;
    assert_eq!(response["updated"], 0);
}

#[tokio::test]
async fn test_quiz_results_within_lesson() {
    let app = TestApp::new();
    let owner = app.user(UserRole::Instructor).await;
    let viewer = app.user(UserRole::Assistant).await;
    let mia = app.student("Mia").await;
    let lesson = app.lesson(Some(&owner), Utc::now(), &[&mia]).await;
    app.grant(&viewer, &lesson, PermissionLevel::View).await;
    let result = json!({"student_id": mia.id, "lesson_id": lesson.id, "points": 9.5});

    let (status, _) = app
        .post("/api/student-lesson-quizzes", Some(&app.token_for(&viewer)), result.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = app
        .post("/api/student-lesson-quizzes", Some(&app.token_for(&owner)), result)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["points"], 9.5);

    let (status, listed) = app
        .get(
            &format!("/api/lessons/{}/quiz-results", lesson.id),
            Some(&app.token_for(&viewer)),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&listed), vec![created["id"].as_str().unwrap().to_string()]);

    let (status, _) = app
        .delete(
            &format!("/api/student-lesson-quizzes/{}", created["id"].as_str().unwrap()),
            Some(&app.token_for(&owner)),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_quiz_results_edit_and_scoped_list() {
    let app = TestApp::new();
    let owner = app.user(UserRole::Instructor).await;
    let editor = app.user(UserRole::Assistant).await;
    let viewer = app.user(UserRole::Assistant).await;
    let outsider = app.user(UserRole::Instructor).await;
    let mia = app.student("Mia").await;
    let leo = app.student("Leo").await;
    let shared = app.lesson(Some(&owner), Utc::now(), &[&mia, &leo]).await;
    let private = app.lesson(Some(&owner), Utc::now(), &[&mia]).await;
    app.grant(&editor, &shared, PermissionLevel::Edit).await;
    app.grant(&viewer, &shared, PermissionLevel::View).await;
    let owner_token = app.token_for(&owner);

    let mut recorded = Vec::new();
    for (student, lesson) in [(&mia, &shared), (&leo, &shared), (&mia, &private)] {
        let (status, body) = app
            .post(
                "/api/student-lesson-quizzes",
                Some(&owner_token),
                json!({"student_id": student.id, "lesson_id": lesson.id, "points": 7}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        recorded.push(body["id"].as_str().unwrap().to_string());
    }
    let uri = format!("/api/student-lesson-quizzes/{}", recorded[0]);
    let edit = json!({"points": 9.5, "notes": "Clean scales"});

    let (status, _) = app
        .put(&uri, Some(&app.token_for(&viewer)), edit.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .put(&uri, Some(&app.token_for(&editor)), edit)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["points"], 9.5);
    assert_eq!(updated["notes"], "Clean scales");
    assert_eq!(updated["lesson_id"], shared.id.to_string());

    let (status, _) = app
        .put(&uri, Some(&owner_token), json!({"points": -1}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, page) = app
        .get("/api/student-lesson-quizzes?per_page=2", Some(&owner_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"].as_array().unwrap().len(), 2);
    assert_eq!(page["meta"]["total_count"], 3);

    let (_, page) = app
        .get("/api/student-lesson-quizzes", Some(&app.token_for(&viewer)))
        .await;
    let mut seen = ids(&page["data"]);
    seen.sort();
    let mut expected = recorded[..2].to_vec();
    expected.sort();
    assert_eq!(seen, expected);

    let (_, page) = app
        .get(
            &format!("/api/student-lesson-quizzes?student_id={}", mia.id),
            Some(&app.token_for(&viewer)),
        )
        .await;
    assert_eq!(ids(&page["data"]), vec![recorded[0].clone()]);

    let (_, page) = app
        .get("/api/student-lesson-quizzes", Some(&app.token_for(&outsider)))
        .await;
    assert_eq!(page["data"], json!([]));
    assert_eq!(page["meta"]["total_count"], 0);
}
