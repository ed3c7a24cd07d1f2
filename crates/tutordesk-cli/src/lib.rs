//! # Tutordesk CLI
//!
//! Administrative operations used by the `tutordesk-cli` binary. They run
//! against any [`EntityStore`], so the same code serves Postgres in
//! production and the in-memory store in tests.

use anyhow::{Context, anyhow};
use uuid::Uuid;

use tutordesk_core::hash_password;
use tutordesk_db::{EntityStore, LessonStore, UserStore};
use tutordesk_models::users::{NewUser, User, UserRole};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Creates an admin account.
pub async fn create_admin(
    store: &dyn EntityStore,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<User> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(anyhow!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }
    let password_hash = hash_password(password).map_err(|e| e.error)?;

    let user = store
        .create_user(NewUser {
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: email.trim().to_string(),
            role: UserRole::Admin,
            password_hash,
        })
        .await?;
    Ok(user)
}

/// Resolves `owner` (a user id or an email address) and gives every
/// ownerless lesson to that user. Returns the number of lessons updated.
pub async fn assign_lesson_owner(store: &dyn EntityStore, owner: &str) -> anyhow::Result<u64> {
    let owner = owner.trim();
    let user = match owner.parse::<Uuid>() {
        Ok(id) => store.find_user(id.into()).await?,
        Err(_) => store.find_user_by_email(owner).await?,
    }
    .with_context(|| format!("No user matches '{owner}'"))?;

    Ok(store.assign_default_owner(user.id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tutordesk_db::MemoryStore;
    use tutordesk_models::lessons::NewLesson;

    fn ownerless_lesson(days_ago: i64) -> NewLesson {
        NewLesson {
            datetime: Utc::now() - Duration::days(days_ago),
            plan: None,
            concepts: None,
            notes: None,
            owner_id: None,
            student_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_admin() {
        let store = MemoryStore::new();
        let admin = create_admin(&store, " Ada ", "Lovelace", "ada@example.com", "s3cret-pass")
            .await
            .unwrap();

        assert_eq!(admin.first_name, "Ada");
        assert_eq!(admin.role, UserRole::Admin);
        assert_ne!(admin.password_hash, "s3cret-pass");
    }

    #[tokio::test]
    async fn test_create_admin_rejects_short_password_and_duplicates() {
        let store = MemoryStore::new();
        assert!(
            create_admin(&store, "A", "B", "a@b.io", "short")
                .await
                .is_err()
        );

        create_admin(&store, "A", "B", "a@b.io", "long-enough")
            .await
            .unwrap();
        assert!(
            create_admin(&store, "A", "B", "a@b.io", "long-enough")
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_assign_lesson_owner_by_email_and_id() {
        let store = MemoryStore::new();
        let admin = create_admin(&store, "A", "B", "a@b.io", "long-enough")
            .await
            .unwrap();
        store.create_lesson(ownerless_lesson(1)).await.unwrap();
        store.create_lesson(ownerless_lesson(2)).await.unwrap();

        assert_eq!(assign_lesson_owner(&store, "a@b.io").await.unwrap(), 2);
        assert_eq!(
            assign_lesson_owner(&store, &admin.id.to_string())
                .await
                .unwrap(),
            0
        );
        assert!(assign_lesson_owner(&store, "nobody@b.io").await.is_err());
    }
}
