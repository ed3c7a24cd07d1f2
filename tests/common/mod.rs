#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use tutordesk::router::init_router;
use tutordesk::state::AppState;
use tutordesk_auth::create_access_token;
use tutordesk_config::{CorsConfig, JwtConfig};
use tutordesk_core::hash_password;
use tutordesk_db::{LessonStore, MemoryStore, StudentStore, UserStore};
use tutordesk_models::PermissionLevel;
use tutordesk_models::lessons::{Lesson, NewLesson};
use tutordesk_models::students::{NewStudent, Student};
use tutordesk_models::users::{NewUser, User, UserRole};

pub const TEST_SECRET: &str = "integration-test-secret";

/// A router over a fresh in-memory store, with the store kept at hand for seeding.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
    jwt_config: JwtConfig,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let jwt_config = JwtConfig::new(TEST_SECRET, 3600);
        let state = AppState::new(
            store.clone(),
            jwt_config.clone(),
            CorsConfig::from_list("http://localhost:5173"),
        );
        Self {
            store,
            router: init_router(state),
            jwt_config,
        }
    }

    pub async fn user(&self, role: UserRole) -> User {
        self.store
            .create_user(NewUser {
                first_name: "Test".into(),
                last_name: "User".into(),
                email: unique_email(),
                role,
                password_hash: "x".into(),
            })
            .await
            .unwrap()
    }

    pub async fn user_with_password(&self, email: &str, password: &str, role: UserRole) -> User {
        self.store
            .create_user(NewUser {
                first_name: "Test".into(),
                last_name: "User".into(),
                email: email.into(),
                role,
                password_hash: hash_password(password).unwrap(),
            })
            .await
            .unwrap()
    }

    pub fn token_for(&self, user: &User) -> String {
        create_access_token(
            user.id.into_inner(),
            &user.email,
            user.role.as_str(),
            &self.jwt_config,
        )
        .unwrap()
    }

    pub async fn student(&self, first_name: &str) -> Student {
        self.store
            .create_student(NewStudent {
                first_name: first_name.into(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    pub async fn lesson(
        &self,
        owner: Option<&User>,
        datetime: DateTime<Utc>,
        students: &[&Student],
    ) -> Lesson {
        self.store
            .create_lesson(NewLesson {
                datetime,
                plan: None,
                concepts: None,
                notes: None,
                owner_id: owner.map(|u| u.id),
                student_ids: students.iter().map(|s| s.id).collect(),
            })
            .await
            .unwrap()
    }

    pub async fn grant(&self, user: &User, lesson: &Lesson, level: PermissionLevel) {
        self.store
            .upsert_grant(user.id, lesson.id, level)
            .await
            .unwrap();
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("PUT", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("DELETE", uri, token, None).await
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

pub fn unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

/// Ids in a JSON array of objects, in response order.
pub fn ids(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}
