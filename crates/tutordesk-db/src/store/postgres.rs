//! Postgres-backed entity store.
//!
//! - Multi-row mutations run in a single transaction.
//! - Unique violations surface as [`StoreError::Conflict`], foreign key
//!   violations as [`StoreError::NotFound`].
//! - Cascades are enforced by the schema (`ON DELETE CASCADE` / `SET NULL`).
//! - The last-admin check locks every admin row, in id order and before any
//!   other user row, so two concurrent demotions cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use tutordesk_core::Page;
use tutordesk_models::PermissionLevel;
use tutordesk_models::curriculum::{
    CreateCurriculumDto, CreateLevelDto, CreateQuizDto, CreateStatusDto, CreateUnitDto,
    Curriculum, Level, Quiz, StudentStatus, Unit, UpdateUnitDto,
};
use tutordesk_models::history::{
    LevelHistoryEntry, StatusHistoryEntry, UpdateLevelHistoryDto, UpdateStatusHistoryDto,
};
use tutordesk_models::ids::{
    CurriculumId, GrantId, LessonId, LevelHistoryId, LevelId, QuizId, QuizResultId,
    StatusHistoryId, StatusId, StudentId, UnitId, UserId,
};
use tutordesk_models::lessons::{Lesson, LessonPatch, NewLesson};
use tutordesk_models::query::{LessonQuery, LessonScope, StudentQuery};
use tutordesk_models::quiz_results::{
    CreateQuizResultDto, QuizResultFilter, StudentLessonQuiz, UpdateQuizResultDto,
};
use tutordesk_models::sharing::{GrantFilter, UserLesson};
use tutordesk_models::students::{NewStudent, Student, StudentPatch};
use tutordesk_models::users::{NewUser, User, UserFilter, UserPatch};

use super::filters::{
    CURRENT_LEVEL_SQL, CURRENT_STATUS_SQL, like_pattern, push_lesson_filters,
    push_quiz_result_filters, push_student_filters,
};
use super::{
    CurriculumStore, EntityStore, LAST_ADMIN, LessonStore, StoreError, StoreResult, StudentStore,
    UserStore,
};

const USER_COLUMNS: &str = "id, first_name, last_name, email, role, password_hash, last_login, \
     created_at, updated_at";

/// Lessons are aliased `l`; participants are aggregated in id order.
const LESSON_COLUMNS: &str = "l.id, l.datetime, l.plan, l.concepts, l.notes, l.owner_id, \
     ARRAY(SELECT ls.student_id FROM lesson_students ls WHERE ls.lesson_id = l.id \
     ORDER BY ls.student_id) AS student_ids, l.created_at, l.updated_at";

const LESSON_ORDER: &str = " ORDER BY l.datetime DESC, l.id";

const STUDENT_COLUMNS: &str = "st.id, st.first_name, st.last_name, st.date_started, \
     st.classes_per_week, st.notes_general, st.notes_strengths, st.notes_weaknesses, \
     st.notes_future, st.created_at, st.updated_at";

/// Case-insensitive, then byte order; independent of the database collation.
const STUDENT_ORDER: &str = " ORDER BY LOWER(st.last_name) COLLATE \"C\" NULLS LAST, \
     st.last_name COLLATE \"C\", LOWER(st.first_name) COLLATE \"C\", \
     st.first_name COLLATE \"C\", st.id";

const GRANT_COLUMNS: &str = "id, user_id, lesson_id, permission_level, shared_at";

const QUIZ_RESULT_COLUMNS: &str = "id, student_id, lesson_id, quiz_id, points, notes, recorded_at";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

/// Maps constraint violations on a write to store errors.
fn write_error(err: sqlx::Error, conflict: &str, missing: &str) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict(conflict.to_string())
    } else if is_foreign_key_violation(&err) {
        StoreError::NotFound(missing.to_string())
    } else {
        err.into()
    }
}

fn not_found(what: &str) -> StoreError {
    StoreError::NotFound(what.to_string())
}

async fn fetch_lesson<'e, E: PgExecutor<'e>>(
    executor: E,
    id: LessonId,
) -> StoreResult<Option<Lesson>> {
    let lesson = sqlx::query_as::<_, Lesson>(&format!(
        "SELECT {LESSON_COLUMNS} FROM lessons l WHERE l.id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(lesson)
}

fn normalized(mut ids: Vec<StudentId>) -> Vec<Uuid> {
    ids.sort();
    ids.dedup();
    ids.into_iter().map(StudentId::into_inner).collect()
}

/// Durable entity store backed by a Postgres pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an already migrated pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Locks every admin row in id order and fails if `id` is the only one.
    async fn guard_last_admin(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        id: UserId,
    ) -> StoreResult<()> {
        let admins: Vec<UserId> =
            sqlx::query_scalar("SELECT id FROM users WHERE role = 'admin' ORDER BY id FOR UPDATE")
                .fetch_all(&mut **tx)
                .await?;
        if admins.contains(&id) && admins.len() <= 1 {
            return Err(StoreError::Conflict(LAST_ADMIN.into()));
        }
        Ok(())
    }

    async fn page_lessons(&self, query: &LessonQuery) -> StoreResult<Page<Lesson>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM lessons l WHERE TRUE");
        push_lesson_filters(&mut count, &query.scope, &query.predicates);
        let total_count: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {LESSON_COLUMNS} FROM lessons l WHERE TRUE"
        ));
        push_lesson_filters(&mut select, &query.scope, &query.predicates);
        select.push(LESSON_ORDER);
        if let Some(page) = query.page {
            select
                .push(" LIMIT ")
                .push_bind(page.per_page)
                .push(" OFFSET ")
                .push_bind(page.offset());
        }
        let items = select
            .build_query_as::<Lesson>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page { items, total_count })
    }

    async fn lessons_where(&self, clause: &str, bind: Option<Uuid>) -> StoreResult<Vec<Lesson>> {
        let sql = format!("SELECT {LESSON_COLUMNS} FROM lessons l WHERE {clause}{LESSON_ORDER}");
        let query = sqlx::query_as::<_, Lesson>(&sql);
        let query = match bind {
            Some(id) => query.bind(id),
            None => query,
        };
        Ok(query.fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self))]
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));
        if let Some(email) = &filter.email {
            qb.push(" AND email ILIKE ").push_bind(like_pattern(email));
        }
        if let Some(role) = filter.role {
            qb.push(" AND role = ").push_bind(role);
        }
        qb.push(" ORDER BY email");

        Ok(qb.build_query_as::<User>().fetch_all(&self.pool).await?)
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, first_name, last_name, email, role, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(UserId::new())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.role)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "Email already registered", "User"))
    }

    #[instrument(skip(self, patch))]
    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;

        // Lock order: admin rows by id, then the target row.
        if patch.role.is_some_and(|r| !r.is_admin()) {
            Self::guard_last_admin(&mut tx, id).await?;
        }
        let exists: Option<UserId> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        exists.ok_or_else(|| not_found("User"))?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                first_name = COALESCE($2, first_name), \
                last_name = COALESCE($3, last_name), \
                email = COALESCE($4, email), \
                role = COALESCE($5, role), \
                password_hash = COALESCE($6, password_hash), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.first_name)
        .bind(patch.last_name)
        .bind(patch.email)
        .bind(patch.role)
        .bind(patch.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| write_error(e, "Email already registered", "User"))?;

        tx.commit().await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::guard_last_admin(&mut tx, id).await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("User"));
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn record_login(&self, id: UserId) -> StoreResult<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl LessonStore for PostgresStore {
    #[instrument(skip(self))]
    async fn find_lesson(&self, id: LessonId) -> StoreResult<Option<Lesson>> {
        fetch_lesson(&self.pool, id).await
    }

    #[instrument(skip(self))]
    async fn all_lessons(&self) -> StoreResult<Vec<Lesson>> {
        self.lessons_where("TRUE", None).await
    }

    #[instrument(skip(self))]
    async fn lessons_owned_by(&self, owner: Option<UserId>) -> StoreResult<Vec<Lesson>> {
        match owner {
            Some(owner) => {
                self.lessons_where("l.owner_id = $1", Some(owner.into_inner()))
                    .await
            }
            None => self.lessons_where("l.owner_id IS NULL", None).await,
        }
    }

    #[instrument(skip(self))]
    async fn lessons_granted_to(&self, user: UserId) -> StoreResult<Vec<Lesson>> {
        self.lessons_where(
            "EXISTS (SELECT 1 FROM user_lessons ul WHERE ul.lesson_id = l.id AND ul.user_id = $1)",
            Some(user.into_inner()),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn query_lessons(&self, query: &LessonQuery) -> StoreResult<Page<Lesson>> {
        if matches!(&query.scope, LessonScope::Only(ids) if ids.is_empty()) {
            return Ok(Page::unpaginated(Vec::new()));
        }
        self.page_lessons(query).await
    }

    #[instrument(skip(self, lesson))]
    async fn create_lesson(&self, lesson: NewLesson) -> StoreResult<Lesson> {
        let mut tx = self.pool.begin().await?;
        let id = LessonId::new();

        sqlx::query(
            "INSERT INTO lessons (id, datetime, plan, concepts, notes, owner_id) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(lesson.datetime)
        .bind(&lesson.plan)
        .bind(&lesson.concepts)
        .bind(&lesson.notes)
        .bind(lesson.owner_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, "Lesson already exists", "User"))?;

        sqlx::query(
            "INSERT INTO lesson_students (lesson_id, student_id) SELECT $1, UNNEST($2::uuid[])",
        )
        .bind(id)
        .bind(normalized(lesson.student_ids))
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, "Duplicate participant", "Student"))?;

        let created = fetch_lesson(&mut *tx, id)
            .await?
            .ok_or_else(|| not_found("Lesson"))?;
        tx.commit().await?;
        Ok(created)
    }

    #[instrument(skip(self, patch))]
    async fn update_lesson(&self, id: LessonId, patch: LessonPatch) -> StoreResult<Lesson> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE lessons SET \
                datetime = COALESCE($2, datetime), \
                plan = COALESCE($3, plan), \
                concepts = COALESCE($4, concepts), \
                notes = COALESCE($5, notes), \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(patch.datetime)
        .bind(patch.plan)
        .bind(patch.concepts)
        .bind(patch.notes)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Lesson"));
        }

        if let Some(student_ids) = patch.student_ids {
            sqlx::query("DELETE FROM lesson_students WHERE lesson_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT INTO lesson_students (lesson_id, student_id) \
                 SELECT $1, UNNEST($2::uuid[])",
            )
            .bind(id)
            .bind(normalized(student_ids))
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error(e, "Duplicate participant", "Student"))?;
        }

        let updated = fetch_lesson(&mut *tx, id)
            .await?
            .ok_or_else(|| not_found("Lesson"))?;
        tx.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_lesson(&self, id: LessonId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Lesson"));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_participant(&self, lesson: LessonId, student: StudentId) -> StoreResult<Lesson> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO lesson_students (lesson_id, student_id) SELECT $1, $2 \
             WHERE EXISTS (SELECT 1 FROM lessons WHERE id = $1)",
        )
        .bind(lesson)
        .bind(student)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            write_error(
                e,
                "Student is already a participant of this lesson",
                "Student",
            )
        })?;
        if result.rows_affected() == 0 {
            return Err(not_found("Lesson"));
        }

        sqlx::query("UPDATE lessons SET updated_at = NOW() WHERE id = $1")
            .bind(lesson)
            .execute(&mut *tx)
            .await?;
        let updated = fetch_lesson(&mut *tx, lesson)
            .await?
            .ok_or_else(|| not_found("Lesson"))?;
        tx.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn remove_participant(
        &self,
        lesson: LessonId,
        student: StudentId,
    ) -> StoreResult<Lesson> {
        let mut tx = self.pool.begin().await?;

        if fetch_lesson(&mut *tx, lesson).await?.is_none() {
            return Err(not_found("Lesson"));
        }
        let result =
            sqlx::query("DELETE FROM lesson_students WHERE lesson_id = $1 AND student_id = $2")
                .bind(lesson)
                .bind(student)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Participant"));
        }

        sqlx::query("UPDATE lessons SET updated_at = NOW() WHERE id = $1")
            .bind(lesson)
            .execute(&mut *tx)
            .await?;
        let updated = fetch_lesson(&mut *tx, lesson)
            .await?
            .ok_or_else(|| not_found("Lesson"))?;
        tx.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn find_grant(&self, user: UserId, lesson: LessonId) -> StoreResult<Option<UserLesson>> {
        let grant = sqlx::query_as::<_, UserLesson>(&format!(
            "SELECT {GRANT_COLUMNS} FROM user_lessons WHERE user_id = $1 AND lesson_id = $2"
        ))
        .bind(user)
        .bind(lesson)
        .fetch_optional(&self.pool)
        .await?;
        Ok(grant)
    }

    #[instrument(skip(self))]
    async fn find_grant_by_id(&self, id: GrantId) -> StoreResult<Option<UserLesson>> {
        let grant = sqlx::query_as::<_, UserLesson>(&format!(
            "SELECT {GRANT_COLUMNS} FROM user_lessons WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(grant)
    }

    #[instrument(skip(self))]
    async fn list_grants(&self, filter: &GrantFilter) -> StoreResult<Vec<UserLesson>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {GRANT_COLUMNS} FROM user_lessons WHERE TRUE"
        ));
        if let Some(lesson) = filter.lesson_id {
            qb.push(" AND lesson_id = ").push_bind(lesson);
        }
        if let Some(user) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user);
        }
        if let Some(level) = filter.permission_level {
            qb.push(" AND permission_level = ").push_bind(level);
        }
        qb.push(" ORDER BY shared_at DESC, id");

        Ok(qb
            .build_query_as::<UserLesson>()
            .fetch_all(&self.pool)
            .await?)
    }

    #[instrument(skip(self))]
    async fn upsert_grant(
        &self,
        user: UserId,
        lesson: LessonId,
        level: PermissionLevel,
    ) -> StoreResult<UserLesson> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<GrantId> = sqlx::query_scalar(
            "SELECT id FROM user_lessons WHERE user_id = $1 AND lesson_id = $2 FOR UPDATE",
        )
        .bind(user)
        .bind(lesson)
        .fetch_optional(&mut *tx)
        .await?;

        let grant = match existing {
            Some(id) => {
                sqlx::query_as::<_, UserLesson>(&format!(
                    "UPDATE user_lessons SET permission_level = $2 WHERE id = $1 \
                     RETURNING {GRANT_COLUMNS}"
                ))
                .bind(id)
                .bind(level)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                if fetch_lesson(&mut *tx, lesson).await?.is_none() {
                    return Err(not_found("Lesson"));
                }

                sqlx::query_as::<_, UserLesson>(&format!(
                    "INSERT INTO user_lessons (id, user_id, lesson_id, permission_level) \
                     VALUES ($1, $2, $3, $4) RETURNING {GRANT_COLUMNS}"
                ))
                .bind(GrantId::new())
                .bind(user)
                .bind(lesson)
                .bind(level)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    write_error(e, "Lesson was shared with this user concurrently", "User")
                })?
            }
        };

        tx.commit().await?;
        Ok(grant)
    }

    #[instrument(skip(self))]
    async fn update_grant_level(
        &self,
        id: GrantId,
        level: PermissionLevel,
    ) -> StoreResult<UserLesson> {
        sqlx::query_as::<_, UserLesson>(&format!(
            "UPDATE user_lessons SET permission_level = $2 WHERE id = $1 RETURNING {GRANT_COLUMNS}"
        ))
        .bind(id)
        .bind(level)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found("Grant"))
    }

    #[instrument(skip(self))]
    async fn delete_grant(&self, user: UserId, lesson: LessonId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM user_lessons WHERE user_id = $1 AND lesson_id = $2")
            .bind(user)
            .bind(lesson)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete_grant_by_id(&self, id: GrantId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM user_lessons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Grant"));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn assign_default_owner(&self, owner: UserId) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<UserId> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR SHARE")
                .bind(owner)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(not_found("User"));
        }

        let result = sqlx::query(
            "UPDATE lessons SET owner_id = $1, updated_at = NOW() WHERE owner_id IS NULL",
        )
        .bind(owner)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl StudentStore for PostgresStore {
    #[instrument(skip(self))]
    async fn find_student(&self, id: StudentId) -> StoreResult<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students st WHERE st.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    #[instrument(skip(self))]
    async fn query_students(&self, query: &StudentQuery) -> StoreResult<Page<Student>> {
        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM students st WHERE TRUE");
        push_student_filters(&mut count, &query.predicates);
        let total_count: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {STUDENT_COLUMNS} FROM students st WHERE TRUE"
        ));
        push_student_filters(&mut select, &query.predicates);
        select
            .push(STUDENT_ORDER)
            .push(" LIMIT ")
            .push_bind(query.page.per_page)
            .push(" OFFSET ")
            .push_bind(query.page.offset());
        let items = select
            .build_query_as::<Student>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page { items, total_count })
    }

    #[instrument(skip(self, student))]
    async fn create_student(&self, student: NewStudent) -> StoreResult<Student> {
        let created = sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students AS st (id, first_name, last_name, date_started, \
                classes_per_week, notes_general, notes_strengths, notes_weaknesses, notes_future) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(StudentId::new())
        .bind(student.first_name)
        .bind(student.last_name)
        .bind(student.date_started)
        .bind(student.classes_per_week)
        .bind(student.notes_general)
        .bind(student.notes_strengths)
        .bind(student.notes_weaknesses)
        .bind(student.notes_future)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    #[instrument(skip(self, patch))]
    async fn update_student(&self, id: StudentId, patch: StudentPatch) -> StoreResult<Student> {
        sqlx::query_as::<_, Student>(&format!(
            "UPDATE students AS st SET \
                first_name = COALESCE($2, first_name), \
                last_name = COALESCE($3, last_name), \
                date_started = COALESCE($4, date_started), \
                classes_per_week = COALESCE($5, classes_per_week), \
                notes_general = COALESCE($6, notes_general), \
                notes_strengths = COALESCE($7, notes_strengths), \
                notes_weaknesses = COALESCE($8, notes_weaknesses), \
                notes_future = COALESCE($9, notes_future), \
                updated_at = NOW() \
             WHERE st.id = $1 RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.first_name)
        .bind(patch.last_name)
        .bind(patch.date_started)
        .bind(patch.classes_per_week)
        .bind(patch.notes_general)
        .bind(patch.notes_strengths)
        .bind(patch.notes_weaknesses)
        .bind(patch.notes_future)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found("Student"))
    }

    #[instrument(skip(self))]
    async fn delete_student(&self, id: StudentId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Student"));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn current_status(&self, id: StudentId) -> StoreResult<Option<String>> {
        let name: Option<Option<String>> = sqlx::query_scalar(&format!(
            "SELECT {CURRENT_STATUS_SQL} FROM students st WHERE st.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(name.flatten())
    }

    #[instrument(skip(self))]
    async fn current_level(&self, id: StudentId) -> StoreResult<Option<String>> {
        let name: Option<Option<String>> = sqlx::query_scalar(&format!(
            "SELECT {CURRENT_LEVEL_SQL} FROM students st WHERE st.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(name.flatten())
    }

    #[instrument(skip(self))]
    async fn add_status_history(
        &self,
        student: StudentId,
        status: StatusId,
        changed_at: DateTime<Utc>,
    ) -> StoreResult<StatusHistoryEntry> {
        sqlx::query_as::<_, StatusHistoryEntry>(
            "WITH inserted AS ( \
                INSERT INTO student_status_history (id, student_id, status_id, changed_at) \
                VALUES ($1, $2, $3, $4) RETURNING id, student_id, status_id, changed_at) \
             SELECT i.id, i.student_id, i.status_id, ss.name AS status, i.changed_at \
             FROM inserted i JOIN student_statuses ss ON ss.id = i.status_id",
        )
        .bind(StatusHistoryId::new())
        .bind(student)
        .bind(status)
        .bind(changed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "Duplicate history entry", "Student or status"))
    }

    #[instrument(skip(self))]
    async fn status_history(&self, student: StudentId) -> StoreResult<Vec<StatusHistoryEntry>> {
        let entries = sqlx::query_as::<_, StatusHistoryEntry>(
            "SELECT sh.id, sh.student_id, sh.status_id, ss.name AS status, sh.changed_at \
             FROM student_status_history sh JOIN student_statuses ss ON ss.id = sh.status_id \
             WHERE sh.student_id = $1 ORDER BY sh.changed_at DESC, sh.seq DESC",
        )
        .bind(student)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    #[instrument(skip(self, dto))]
    async fn update_status_history(
        &self,
        student: StudentId,
        id: StatusHistoryId,
        dto: &UpdateStatusHistoryDto,
    ) -> StoreResult<StatusHistoryEntry> {
        sqlx::query_as::<_, StatusHistoryEntry>(
            "WITH updated AS ( \
                UPDATE student_status_history SET \
                    status_id = COALESCE($3, status_id), \
                    changed_at = COALESCE($4, changed_at) \
                WHERE id = $1 AND student_id = $2 \
                RETURNING id, student_id, status_id, changed_at) \
             SELECT u.id, u.student_id, u.status_id, ss.name AS status, u.changed_at \
             FROM updated u JOIN student_statuses ss ON ss.id = u.status_id",
        )
        .bind(id)
        .bind(student)
        .bind(dto.status_id)
        .bind(dto.changed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error(e, "Duplicate history entry", "Status"))?
        .ok_or_else(|| not_found("Status history entry"))
    }

    #[instrument(skip(self))]
    async fn delete_status_history(
        &self,
        student: StudentId,
        id: StatusHistoryId,
    ) -> StoreResult<()> {
        let result =
            sqlx::query("DELETE FROM student_status_history WHERE id = $1 AND student_id = $2")
                .bind(id)
                .bind(student)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Status history entry"));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_level_history(
        &self,
        student: StudentId,
        level: LevelId,
        changed_at: DateTime<Utc>,
    ) -> StoreResult<LevelHistoryEntry> {
        sqlx::query_as::<_, LevelHistoryEntry>(
            "WITH inserted AS ( \
                INSERT INTO student_level_history (id, student_id, level_id, changed_at) \
                VALUES ($1, $2, $3, $4) RETURNING id, student_id, level_id, changed_at) \
             SELECT i.id, i.student_id, i.level_id, lv.name AS level, i.changed_at \
             FROM inserted i JOIN levels lv ON lv.id = i.level_id",
        )
        .bind(LevelHistoryId::new())
        .bind(student)
        .bind(level)
        .bind(changed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "Duplicate history entry", "Student or level"))
    }

    #[instrument(skip(self))]
    async fn level_history(&self, student: StudentId) -> StoreResult<Vec<LevelHistoryEntry>> {
        let entries = sqlx::query_as::<_, LevelHistoryEntry>(
            "SELECT lh.id, lh.student_id, lh.level_id, lv.name AS level, lh.changed_at \
             FROM student_level_history lh JOIN levels lv ON lv.id = lh.level_id \
             WHERE lh.student_id = $1 ORDER BY lh.changed_at DESC, lh.seq DESC",
        )
        .bind(student)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    #[instrument(skip(self, dto))]
    async fn update_level_history(
        &self,
        student: StudentId,
        id: LevelHistoryId,
        dto: &UpdateLevelHistoryDto,
    ) -> StoreResult<LevelHistoryEntry> {
        sqlx::query_as::<_, LevelHistoryEntry>(
            "WITH updated AS ( \
                UPDATE student_level_history SET \
                    level_id = COALESCE($3, level_id), \
                    changed_at = COALESCE($4, changed_at) \
                WHERE id = $1 AND student_id = $2 \
                RETURNING id, student_id, level_id, changed_at) \
             SELECT u.id, u.student_id, u.level_id, lv.name AS level, u.changed_at \
             FROM updated u JOIN levels lv ON lv.id = u.level_id",
        )
        .bind(id)
        .bind(student)
        .bind(dto.level_id)
        .bind(dto.changed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error(e, "Duplicate history entry", "Level"))?
        .ok_or_else(|| not_found("Level history entry"))
    }

    #[instrument(skip(self))]
    async fn delete_level_history(
        &self,
        student: StudentId,
        id: LevelHistoryId,
    ) -> StoreResult<()> {
        let result =
            sqlx::query("DELETE FROM student_level_history WHERE id = $1 AND student_id = $2")
                .bind(id)
                .bind(student)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Level history entry"));
        }
        Ok(())
    }
}

#[async_trait]
impl CurriculumStore for PostgresStore {
    async fn list_statuses(&self) -> StoreResult<Vec<StudentStatus>> {
        Ok(
            sqlx::query_as::<_, StudentStatus>("SELECT id, name FROM student_statuses ORDER BY name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn create_status(&self, dto: &CreateStatusDto) -> StoreResult<StudentStatus> {
        sqlx::query_as::<_, StudentStatus>(
            "INSERT INTO student_statuses (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(StatusId::new())
        .bind(&dto.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, &format!("Status '{}' already exists", dto.name), "Status"))
    }

    async fn delete_status(&self, id: StatusId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM student_statuses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Status"));
        }
        Ok(())
    }

    async fn list_curricula(&self) -> StoreResult<Vec<Curriculum>> {
        Ok(
            sqlx::query_as::<_, Curriculum>("SELECT id, name FROM curricula ORDER BY name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn create_curriculum(&self, dto: &CreateCurriculumDto) -> StoreResult<Curriculum> {
        sqlx::query_as::<_, Curriculum>(
            "INSERT INTO curricula (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(CurriculumId::new())
        .bind(&dto.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            write_error(
                e,
                &format!("Curriculum '{}' already exists", dto.name),
                "Curriculum",
            )
        })
    }

    async fn delete_curriculum(&self, id: CurriculumId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM curricula WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Curriculum"));
        }
        Ok(())
    }

    async fn list_levels(&self, curriculum: Option<CurriculumId>) -> StoreResult<Vec<Level>> {
        Ok(sqlx::query_as::<_, Level>(
            "SELECT id, name, curriculum_id FROM levels \
             WHERE ($1::uuid IS NULL OR curriculum_id = $1) ORDER BY name, id",
        )
        .bind(curriculum)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_level(&self, dto: &CreateLevelDto) -> StoreResult<Level> {
        sqlx::query_as::<_, Level>(
            "INSERT INTO levels (id, name, curriculum_id) VALUES ($1, $2, $3) \
             RETURNING id, name, curriculum_id",
        )
        .bind(LevelId::new())
        .bind(&dto.name)
        .bind(dto.curriculum_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "Level already exists", "Curriculum"))
    }

    async fn delete_level(&self, id: LevelId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM levels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Level"));
        }
        Ok(())
    }

    async fn list_units(&self, level: Option<LevelId>) -> StoreResult<Vec<Unit>> {
        Ok(sqlx::query_as::<_, Unit>(
            "SELECT id, name, level_id FROM units \
             WHERE ($1::uuid IS NULL OR level_id = $1) ORDER BY name, id",
        )
        .bind(level)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_unit(&self, dto: &CreateUnitDto) -> StoreResult<Unit> {
        sqlx::query_as::<_, Unit>(
            "INSERT INTO units (id, name, level_id) VALUES ($1, $2, $3) \
             RETURNING id, name, level_id",
        )
        .bind(UnitId::new())
        .bind(&dto.name)
        .bind(dto.level_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "Unit already exists", "Level"))
    }

    async fn update_unit(&self, id: UnitId, dto: &UpdateUnitDto) -> StoreResult<Unit> {
        sqlx::query_as::<_, Unit>(
            "UPDATE units SET name = COALESCE($2, name), level_id = COALESCE($3, level_id) \
             WHERE id = $1 RETURNING id, name, level_id",
        )
        .bind(id)
        .bind(&dto.name)
        .bind(dto.level_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error(e, "Unit already exists", "Level"))?
        .ok_or_else(|| not_found("Unit"))
    }

    async fn delete_unit(&self, id: UnitId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM units WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Unit"));
        }
        Ok(())
    }

    async fn list_quizzes(&self, unit: Option<UnitId>) -> StoreResult<Vec<Quiz>> {
        Ok(sqlx::query_as::<_, Quiz>(
            "SELECT id, name, max_points, unit_id FROM quizzes \
             WHERE ($1::uuid IS NULL OR unit_id = $1) ORDER BY name, id",
        )
        .bind(unit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_quiz(&self, dto: &CreateQuizDto) -> StoreResult<Quiz> {
        sqlx::query_as::<_, Quiz>(
            "INSERT INTO quizzes (id, name, max_points, unit_id) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, max_points, unit_id",
        )
        .bind(QuizId::new())
        .bind(&dto.name)
        .bind(dto.max_points)
        .bind(dto.unit_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "Quiz already exists", "Unit"))
    }

    async fn delete_quiz(&self, id: QuizId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Quiz"));
        }
        Ok(())
    }

    async fn record_quiz_result(
        &self,
        dto: &CreateQuizResultDto,
    ) -> StoreResult<StudentLessonQuiz> {
        sqlx::query_as::<_, StudentLessonQuiz>(&format!(
            "INSERT INTO student_lesson_quizzes (id, student_id, lesson_id, quiz_id, points, notes) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {QUIZ_RESULT_COLUMNS}"
        ))
        .bind(QuizResultId::new())
        .bind(dto.student_id)
        .bind(dto.lesson_id)
        .bind(dto.quiz_id)
        .bind(dto.points)
        .bind(&dto.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "Quiz result already exists", "Student, lesson or quiz"))
    }

    async fn find_quiz_result(&self, id: QuizResultId) -> StoreResult<Option<StudentLessonQuiz>> {
        Ok(sqlx::query_as::<_, StudentLessonQuiz>(&format!(
            "SELECT {QUIZ_RESULT_COLUMNS} FROM student_lesson_quizzes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_quiz_result(
        &self,
        id: QuizResultId,
        dto: &UpdateQuizResultDto,
    ) -> StoreResult<StudentLessonQuiz> {
        sqlx::query_as::<_, StudentLessonQuiz>(&format!(
            "UPDATE student_lesson_quizzes SET \
                quiz_id = COALESCE($2, quiz_id), \
                points = COALESCE($3, points), \
                notes = COALESCE($4, notes) \
             WHERE id = $1 RETURNING {QUIZ_RESULT_COLUMNS}"
        ))
        .bind(id)
        .bind(dto.quiz_id)
        .bind(dto.points)
        .bind(&dto.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error(e, "Quiz result already exists", "Quiz"))?
        .ok_or_else(|| not_found("Quiz result"))
    }

    async fn delete_quiz_result(&self, id: QuizResultId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM student_lesson_quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Quiz result"));
        }
        Ok(())
    }

    async fn quiz_results_for_lesson(
        &self,
        lesson: LessonId,
    ) -> StoreResult<Vec<StudentLessonQuiz>> {
        Ok(sqlx::query_as::<_, StudentLessonQuiz>(&format!(
            "SELECT {QUIZ_RESULT_COLUMNS} FROM student_lesson_quizzes \
             WHERE lesson_id = $1 ORDER BY student_id, id"
        ))
        .bind(lesson)
        .fetch_all(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn list_quiz_results(
        &self,
        filter: &QuizResultFilter,
    ) -> StoreResult<Page<StudentLessonQuiz>> {
        if matches!(&filter.scope, LessonScope::Only(ids) if ids.is_empty()) {
            return Ok(Page::unpaginated(Vec::new()));
        }

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM student_lesson_quizzes q WHERE TRUE",
        );
        push_quiz_result_filters(&mut count, filter);
        let total_count: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {QUIZ_RESULT_COLUMNS} FROM student_lesson_quizzes q WHERE TRUE"
        ));
        push_quiz_result_filters(&mut select, filter);
        select
            .push(" ORDER BY q.recorded_at DESC, q.id LIMIT ")
            .push_bind(filter.page.per_page)
            .push(" OFFSET ")
            .push_bind(filter.page.offset());
        let items = select
            .build_query_as::<StudentLessonQuiz>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page { items, total_count })
    }
}

#[async_trait]
impl EntityStore for PostgresStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
