#![cfg(feature = "pg-tests")]

use std::time::Duration;

use chrono::{TimeZone, Utc};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::{Mutex, MutexGuard};

use tutordesk_core::{AppError, ErrorKind, PageRequest};
use tutordesk_db::{
    CurriculumStore, LessonStore, MIGRATOR, PostgresStore, StoreError, StudentStore, UserStore,
};
use tutordesk_models::PermissionLevel;
use tutordesk_models::curriculum::CreateStatusDto;
use tutordesk_models::ids::StudentId;
use tutordesk_models::lessons::NewLesson;
use tutordesk_models::query::{
    DateWindow, GroupSize, LessonPredicate, LessonQuery, LessonScope, StudentPredicate,
    StudentQuery,
};
use tutordesk_models::sharing::GrantFilter;
use tutordesk_models::students::NewStudent;
use tutordesk_models::users::{NewUser, User, UserPatch, UserRole};

// Every test truncates the same database.
static DB_LOCK: Mutex<()> = Mutex::const_new(());

async fn pg_store() -> Option<(PostgresStore, MutexGuard<'static, ()>)> {
    let url = match std::env::var("TUTORDESK_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping pg-tests: set TUTORDESK_TEST_DATABASE_URL or DATABASE_URL");
            return None;
        }
    };
    let guard = DB_LOCK.lock().await;

    let pool = match PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(2))
        .connect(&url)
        .await
    {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("skipping pg-tests: cannot connect to postgres: {err}");
            return None;
        }
    };
    MIGRATOR.run(&pool).await.unwrap();
    sqlx::query(
        "TRUNCATE student_lesson_quizzes, user_lessons, lesson_students, lessons, \
         student_level_history, student_status_history, quizzes, units, levels, curricula, \
         student_statuses, students, users CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    Some((PostgresStore::new(pool), guard))
}

async fn user(store: &PostgresStore, email: &str, role: UserRole) -> User {
    store
        .create_user(NewUser {
            first_name: "Test".into(),
            last_name: "User".into(),
            email: email.into(),
            role,
            password_hash: "x".into(),
        })
        .await
        .unwrap()
}

fn lesson_at(owner: Option<&User>, day: u32, students: Vec<StudentId>) -> NewLesson {
    NewLesson {
        datetime: Utc.with_ymd_and_hms(2025, 1, day, 15, 0, 0).unwrap(),
        plan: None,
        concepts: None,
        notes: None,
        owner_id: owner.map(|u| u.id),
        student_ids: students,
    }
}

#[tokio::test]
async fn test_pg_user_constraints() {
    let Some((store, _guard)) = pg_store().await else {
        return;
    };
    let admin = user(&store, "root@t.io", UserRole::Admin).await;

    let err = store
        .create_user(NewUser {
            first_name: "Dup".into(),
            last_name: "User".into(),
            email: "root@t.io".into(),
            role: UserRole::Assistant,
            password_hash: "x".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let demote = UserPatch {
        role: Some(UserRole::Instructor),
        ..Default::default()
    };
    let err: AppError = store.update_user(admin.id, demote).await.unwrap_err().into();
    assert_eq!(err.kind, ErrorKind::Conflict);

    store.record_login(admin.id).await.unwrap();
    let reloaded = store.find_user(admin.id).await.unwrap().unwrap();
    assert!(reloaded.last_login.is_some());
}

#[tokio::test]
async fn test_pg_grants_upsert_and_owner_cleanup() {
    let Some((store, _guard)) = pg_store().await else {
        return;
    };
    let owner = user(&store, "owner@t.io", UserRole::Instructor).await;
    let colleague = user(&store, "colleague@t.io", UserRole::Assistant).await;
    let lesson = store.create_lesson(lesson_at(Some(&owner), 6, vec![])).await.unwrap();

    let first = store
        .upsert_grant(colleague.id, lesson.id, PermissionLevel::View)
        .await
        .unwrap();
    let second = store
        .upsert_grant(colleague.id, lesson.id, PermissionLevel::Manage)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.permission_level, PermissionLevel::Manage);

    assert!(store.delete_grant(colleague.id, lesson.id).await.unwrap());
    assert!(!store.delete_grant(colleague.id, lesson.id).await.unwrap());

    store.delete_user(owner.id).await.unwrap();
    let orphan = store.find_lesson(lesson.id).await.unwrap().unwrap();
    assert_eq!(orphan.owner_id, None);

    assert_eq!(store.assign_default_owner(colleague.id).await.unwrap(), 1);
    assert_eq!(store.assign_default_owner(colleague.id).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pg_concurrent_share_yields_one_grant() {
    let Some((store, _guard)) = pg_store().await else {
        return;
    };
    let owner = user(&store, "owner@t.io", UserRole::Instructor).await;
    let colleague = user(&store, "colleague@t.io", UserRole::Assistant).await;

    for day in 6..9 {
        let lesson = store.create_lesson(lesson_at(Some(&owner), day, vec![])).await.unwrap();
        let (first, second) = tokio::join!(
            store.upsert_grant(colleague.id, lesson.id, PermissionLevel::View),
            store.upsert_grant(colleague.id, lesson.id, PermissionLevel::Edit),
        );
        for outcome in [&first, &second] {
            if let Err(err) = outcome {
                assert!(matches!(err, StoreError::Conflict(_)), "{err:?}");
            }
        }
        assert!(first.is_ok() || second.is_ok());

        let grants = store
            .list_grants(&GrantFilter {
                lesson_id: Some(lesson.id),
                user_id: Some(colleague.id),
                permission_level: None,
            })
            .await
            .unwrap();
        assert_eq!(grants.len(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pg_concurrent_demotions_keep_one_admin() {
    let Some((store, _guard)) = pg_store().await else {
        return;
    };
    let first = user(&store, "first@t.io", UserRole::Admin).await;
    let second = user(&store, "second@t.io", UserRole::Admin).await;
    let demote = || UserPatch {
        role: Some(UserRole::Instructor),
        ..Default::default()
    };

    let (a, b) = tokio::join!(
        store.update_user(first.id, demote()),
        store.update_user(second.id, demote()),
    );
    let errors: Vec<_> = [a, b].into_iter().filter_map(Result::err).collect();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], StoreError::Conflict(_)), "{:?}", errors[0]);

    let mut admins = 0;
    for id in [first.id, second.id] {
        if store.find_user(id).await.unwrap().unwrap().role == UserRole::Admin {
            admins += 1;
        }
    }
    assert_eq!(admins, 1);
}

#[tokio::test]
async fn test_pg_lesson_query_matches_memory_semantics() {
    let Some((store, _guard)) = pg_store().await else {
        return;
    };
    let owner = user(&store, "owner@t.io", UserRole::Instructor).await;
    let mia = store
        .create_student(NewStudent {
            first_name: "Mia".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let leo = store
        .create_student(NewStudent {
            first_name: "Leo".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let monday = store
        .create_lesson(lesson_at(Some(&owner), 6, vec![mia.id]))
        .await
        .unwrap();
    let wednesday = store
        .create_lesson(lesson_at(Some(&owner), 8, vec![mia.id, leo.id]))
        .await
        .unwrap();
    store
        .create_lesson(lesson_at(Some(&owner), 13, vec![leo.id]))
        .await
        .unwrap();

    let window = DateWindow::for_lessons(
        Some(Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap()),
        None,
        None,
        Utc::now(),
    )
    .unwrap()
    .unwrap();
    let page = store
        .query_lessons(&LessonQuery {
            scope: LessonScope::All,
            predicates: vec![LessonPredicate::Within(window)],
            page: None,
        })
        .await
        .unwrap();
    let ids: Vec<_> = page.items.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![wednesday.id, monday.id]);
    assert_eq!(page.total_count, 2);

    let page = store
        .query_lessons(&LessonQuery {
            scope: LessonScope::Only(vec![monday.id, wednesday.id]),
            predicates: vec![LessonPredicate::Size(GroupSize::Individual)],
            page: Some(PageRequest::new(1, 10)),
        })
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, monday.id);

    let students = store
        .query_students(&StudentQuery {
            predicates: vec![StudentPredicate::HasLessonOfSize(GroupSize::Group)],
            page: PageRequest::default(),
        })
        .await
        .unwrap();
    assert_eq!(students.total_count, 2);
}

#[tokio::test]
async fn test_pg_current_status_follows_latest_entry() {
    let Some((store, _guard)) = pg_store().await else {
        return;
    };
    let mia = store
        .create_student(NewStudent {
            first_name: "Mia".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let active = store
        .create_status(&CreateStatusDto {
            name: "Active".into(),
        })
        .await
        .unwrap();
    let paused = store
        .create_status(&CreateStatusDto {
            name: "Paused".into(),
        })
        .await
        .unwrap();

    store
        .add_status_history(mia.id, paused.id, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap())
        .await
        .unwrap();
    store
        .add_status_history(mia.id, active.id, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        .await
        .unwrap();

    assert_eq!(store.current_status(mia.id).await.unwrap().as_deref(), Some("Paused"));
    let history = store.status_history(mia.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, "Paused");
}
