//! In-memory entity store.
//!
//! All collections live in one `State` behind a single `tokio::sync::RwLock`,
//! so every mutation (including cascades) happens under one write lock and is
//! atomic with respect to concurrent readers and writers. History streams are
//! kept in insertion order; that order breaks ties between equal timestamps.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

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
use tutordesk_models::query::{LessonQuery, StudentPredicate, StudentQuery};
use tutordesk_models::quiz_results::{
    CreateQuizResultDto, QuizResultFilter, StudentLessonQuiz, UpdateQuizResultDto,
};
use tutordesk_models::sharing::{GrantFilter, UserLesson};
use tutordesk_models::students::{NewStudent, Student, StudentPatch};
use tutordesk_models::users::{NewUser, User, UserFilter, UserPatch};

use super::{
    CurriculumStore, EntityStore, LAST_ADMIN, LessonStore, StoreError, StoreResult, StudentStore,
    UserStore,
};

struct StatusRecord {
    id: StatusHistoryId,
    student_id: StudentId,
    status_id: StatusId,
    changed_at: DateTime<Utc>,
}

struct LevelRecord {
    id: LevelHistoryId,
    student_id: StudentId,
    level_id: LevelId,
    changed_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    lessons: HashMap<LessonId, Lesson>,
    grants: HashMap<GrantId, UserLesson>,
    students: HashMap<StudentId, Student>,
    statuses: HashMap<StatusId, StudentStatus>,
    status_history: Vec<StatusRecord>,
    level_history: Vec<LevelRecord>,
    curricula: HashMap<CurriculumId, Curriculum>,
    levels: HashMap<LevelId, Level>,
    units: HashMap<UnitId, Unit>,
    quizzes: HashMap<QuizId, Quiz>,
    quiz_results: HashMap<QuizResultId, StudentLessonQuiz>,
}

fn not_found(what: &str) -> StoreError {
    StoreError::NotFound(what.to_string())
}

fn page_of<T>(matches: Vec<T>, page: tutordesk_core::PageRequest) -> Page<T> {
    Page {
        total_count: i64::try_from(matches.len()).unwrap_or(i64::MAX),
        items: page.slice(matches),
    }
}

fn lesson_order(a: &Lesson, b: &Lesson) -> Ordering {
    b.datetime.cmp(&a.datetime).then_with(|| a.id.cmp(&b.id))
}

/// Case-insensitive first, then byte order, matching the Postgres store.
fn name_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn student_order(a: &Student, b: &Student) -> Ordering {
    let last = match (&a.last_name, &b.last_name) {
        (Some(x), Some(y)) => name_order(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    last.then_with(|| name_order(&a.first_name, &b.first_name))
        .then_with(|| a.id.cmp(&b.id))
}

fn sorted_lessons<'a>(lessons: impl Iterator<Item = &'a Lesson>) -> Vec<Lesson> {
    let mut lessons: Vec<Lesson> = lessons.cloned().collect();
    lessons.sort_by(lesson_order);
    lessons
}

impl State {
    fn admin_count(&self) -> usize {
        self.users.values().filter(|u| u.is_admin()).count()
    }

    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn check_students(&self, ids: &[StudentId]) -> StoreResult<()> {
        match ids.iter().find(|id| !self.students.contains_key(id)) {
            Some(_) => Err(not_found("Student")),
            None => Ok(()),
        }
    }

    fn lessons_of(&self, student: StudentId) -> impl Iterator<Item = &Lesson> {
        self.lessons
            .values()
            .filter(move |l| l.student_ids.contains(&student))
    }

    fn current_status(&self, student: StudentId) -> Option<String> {
        self.status_history
            .iter()
            .enumerate()
            .filter(|(_, r)| r.student_id == student)
            .max_by_key(|(seq, r)| (r.changed_at, *seq))
            .and_then(|(_, r)| self.statuses.get(&r.status_id))
            .map(|s| s.name.clone())
    }

    fn current_level(&self, student: StudentId) -> Option<String> {
        self.level_history
            .iter()
            .enumerate()
            .filter(|(_, r)| r.student_id == student)
            .max_by_key(|(seq, r)| (r.changed_at, *seq))
            .and_then(|(_, r)| self.levels.get(&r.level_id))
            .map(|l| l.name.clone())
    }

    fn student_matches(&self, student: &Student, predicate: &StudentPredicate) -> bool {
        match predicate {
            StudentPredicate::NameContains(needle) => {
                let needle = needle.to_lowercase();
                student.first_name.to_lowercase().contains(&needle)
                    || student
                        .last_name
                        .as_ref()
                        .is_some_and(|last| last.to_lowercase().contains(&needle))
            }
            StudentPredicate::CurrentStatus(name) => {
                self.current_status(student.id).as_deref() == Some(name.as_str())
            }
            StudentPredicate::CurrentLevel(name) => {
                self.current_level(student.id).as_deref() == Some(name.as_str())
            }
            StudentPredicate::HasLessonWithin(window) => self
                .lessons_of(student.id)
                .any(|l| window.contains(l.datetime)),
            StudentPredicate::HasLessonOfSize(size) => self
                .lessons_of(student.id)
                .any(|l| size.matches(l.participant_count())),
            StudentPredicate::StartedOnOrAfter(date) => {
                student.date_started.is_some_and(|started| started >= *date)
            }
            StudentPredicate::ClassesPerWeek(count) => student.classes_per_week == Some(*count),
        }
    }

    fn status_entry(&self, record: &StatusRecord) -> StatusHistoryEntry {
        StatusHistoryEntry {
            id: record.id,
            student_id: record.student_id,
            status_id: record.status_id,
            status: self
                .statuses
                .get(&record.status_id)
                .map(|s| s.name.clone())
                .unwrap_or_default(),
            changed_at: record.changed_at,
        }
    }

    fn level_entry(&self, record: &LevelRecord) -> LevelHistoryEntry {
        LevelHistoryEntry {
            id: record.id,
            student_id: record.student_id,
            level_id: record.level_id,
            level: self
                .levels
                .get(&record.level_id)
                .map(|l| l.name.clone())
                .unwrap_or_default(),
            changed_at: record.changed_at,
        }
    }

    fn delete_quiz(&mut self, id: QuizId) {
        self.quizzes.remove(&id);
        for result in self.quiz_results.values_mut() {
            if result.quiz_id == Some(id) {
                result.quiz_id = None;
            }
        }
    }

    fn delete_unit(&mut self, id: UnitId) {
        self.units.remove(&id);
        let quizzes: Vec<QuizId> = self
            .quizzes
            .values()
            .filter(|q| q.unit_id == Some(id))
            .map(|q| q.id)
            .collect();
        for quiz in quizzes {
            self.delete_quiz(quiz);
        }
    }

    fn delete_level(&mut self, id: LevelId) {
        self.levels.remove(&id);
        self.level_history.retain(|r| r.level_id != id);
        let units: Vec<UnitId> = self
            .units
            .values()
            .filter(|u| u.level_id == id)
            .map(|u| u.id)
            .collect();
        for unit in units {
            self.delete_unit(unit);
        }
    }
}

/// Entity store kept entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        let needle = filter.email.as_ref().map(|e| e.to_lowercase());
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| {
                needle
                    .as_ref()
                    .is_none_or(|n| u.email.to_lowercase().contains(n))
            })
            .filter(|u| filter.role.is_none_or(|r| u.role == r))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if state.email_taken(&user.email, None) {
            return Err(StoreError::Conflict("Email already registered".into()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            password_hash: user.password_hash,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<User> {
        let mut state = self.state.write().await;
        let current = state.users.get(&id).ok_or_else(|| not_found("User"))?;

        if let Some(email) = &patch.email
            && state.email_taken(email, Some(id))
        {
            return Err(StoreError::Conflict("Email already registered".into()));
        }
        let demoted = current.is_admin() && patch.role.is_some_and(|r| !r.is_admin());
        if demoted && state.admin_count() <= 1 {
            return Err(StoreError::Conflict(LAST_ADMIN.into()));
        }

        let user = state.users.get_mut(&id).ok_or_else(|| not_found("User"))?;
        if let Some(first_name) = patch.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = last_name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(password_hash) = patch.password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let user = state.users.get(&id).ok_or_else(|| not_found("User"))?;
        if user.is_admin() && state.admin_count() <= 1 {
            return Err(StoreError::Conflict(LAST_ADMIN.into()));
        }

        state.users.remove(&id);
        state.grants.retain(|_, g| g.user_id != id);
        for lesson in state.lessons.values_mut() {
            if lesson.owner_id == Some(id) {
                lesson.owner_id = None;
            }
        }
        Ok(())
    }

    async fn record_login(&self, id: UserId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let user = state.users.get_mut(&id).ok_or_else(|| not_found("User"))?;
        user.last_login = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl LessonStore for MemoryStore {
    async fn find_lesson(&self, id: LessonId) -> StoreResult<Option<Lesson>> {
        Ok(self.state.read().await.lessons.get(&id).cloned())
    }

    async fn all_lessons(&self) -> StoreResult<Vec<Lesson>> {
        let state = self.state.read().await;
        Ok(sorted_lessons(state.lessons.values()))
    }

    async fn lessons_owned_by(&self, owner: Option<UserId>) -> StoreResult<Vec<Lesson>> {
        let state = self.state.read().await;
        Ok(sorted_lessons(
            state.lessons.values().filter(|l| l.owner_id == owner),
        ))
    }

    async fn lessons_granted_to(&self, user: UserId) -> StoreResult<Vec<Lesson>> {
        let state = self.state.read().await;
        Ok(sorted_lessons(
            state
                .grants
                .values()
                .filter(|g| g.user_id == user)
                .filter_map(|g| state.lessons.get(&g.lesson_id)),
        ))
    }

    async fn query_lessons(&self, query: &LessonQuery) -> StoreResult<Page<Lesson>> {
        let state = self.state.read().await;
        let matches = sorted_lessons(state.lessons.values().filter(|l| query.matches(l)));
        Ok(match query.page {
            Some(page) => page_of(matches, page),
            None => Page::unpaginated(matches),
        })
    }

    async fn create_lesson(&self, lesson: NewLesson) -> StoreResult<Lesson> {
        let mut state = self.state.write().await;
        if let Some(owner) = lesson.owner_id
            && !state.users.contains_key(&owner)
        {
            return Err(not_found("User"));
        }
        let mut student_ids = lesson.student_ids;
        student_ids.sort();
        student_ids.dedup();
        state.check_students(&student_ids)?;

        let now = Utc::now();
        let lesson = Lesson {
            id: LessonId::new(),
            datetime: lesson.datetime,
            plan: lesson.plan,
            concepts: lesson.concepts,
            notes: lesson.notes,
            owner_id: lesson.owner_id,
            student_ids,
            created_at: now,
            updated_at: now,
        };
        state.lessons.insert(lesson.id, lesson.clone());
        Ok(lesson)
    }

    async fn update_lesson(&self, id: LessonId, patch: LessonPatch) -> StoreResult<Lesson> {
        let mut state = self.state.write().await;
        if !state.lessons.contains_key(&id) {
            return Err(not_found("Lesson"));
        }
        let student_ids = match patch.student_ids {
            Some(mut ids) => {
                ids.sort();
                ids.dedup();
                state.check_students(&ids)?;
                Some(ids)
            }
            None => None,
        };

        let lesson = state.lessons.get_mut(&id).ok_or_else(|| not_found("Lesson"))?;
        if let Some(datetime) = patch.datetime {
            lesson.datetime = datetime;
        }
        if let Some(plan) = patch.plan {
            lesson.plan = Some(plan);
        }
        if let Some(concepts) = patch.concepts {
            lesson.concepts = Some(concepts);
        }
        if let Some(notes) = patch.notes {
            lesson.notes = Some(notes);
        }
        if let Some(ids) = student_ids {
            lesson.student_ids = ids;
        }
        lesson.updated_at = Utc::now();
        Ok(lesson.clone())
    }

    async fn delete_lesson(&self, id: LessonId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.lessons.remove(&id).ok_or_else(|| not_found("Lesson"))?;
        state.grants.retain(|_, g| g.lesson_id != id);
        state.quiz_results.retain(|_, r| r.lesson_id != id);
        Ok(())
    }

    async fn add_participant(&self, lesson: LessonId, student: StudentId) -> StoreResult<Lesson> {
        let mut state = self.state.write().await;
        state.check_students(&[student])?;
        let lesson = state
            .lessons
            .get_mut(&lesson)
            .ok_or_else(|| not_found("Lesson"))?;

        match lesson.student_ids.binary_search(&student) {
            Ok(_) => Err(StoreError::Conflict(
                "Student is already a participant of this lesson".into(),
            )),
            Err(pos) => {
                lesson.student_ids.insert(pos, student);
                lesson.updated_at = Utc::now();
                Ok(lesson.clone())
            }
        }
    }

    async fn remove_participant(
        &self,
        lesson: LessonId,
        student: StudentId,
    ) -> StoreResult<Lesson> {
        let mut state = self.state.write().await;
        let lesson = state
            .lessons
            .get_mut(&lesson)
            .ok_or_else(|| not_found("Lesson"))?;

        let pos = lesson
            .student_ids
            .binary_search(&student)
            .map_err(|_| not_found("Participant"))?;
        lesson.student_ids.remove(pos);
        lesson.updated_at = Utc::now();
        Ok(lesson.clone())
    }

    async fn find_grant(&self, user: UserId, lesson: LessonId) -> StoreResult<Option<UserLesson>> {
        let state = self.state.read().await;
        Ok(state
            .grants
            .values()
            .find(|g| g.user_id == user && g.lesson_id == lesson)
            .cloned())
    }

    async fn find_grant_by_id(&self, id: GrantId) -> StoreResult<Option<UserLesson>> {
        Ok(self.state.read().await.grants.get(&id).cloned())
    }

    async fn list_grants(&self, filter: &GrantFilter) -> StoreResult<Vec<UserLesson>> {
        let state = self.state.read().await;
        let mut grants: Vec<UserLesson> = state
            .grants
            .values()
            .filter(|g| filter.lesson_id.is_none_or(|id| g.lesson_id == id))
            .filter(|g| filter.user_id.is_none_or(|id| g.user_id == id))
            .filter(|g| {
                filter
                    .permission_level
                    .is_none_or(|level| g.permission_level == level)
            })
            .cloned()
            .collect();
        grants.sort_by(|a, b| b.shared_at.cmp(&a.shared_at).then_with(|| a.id.cmp(&b.id)));
        Ok(grants)
    }

    async fn upsert_grant(
        &self,
        user: UserId,
        lesson: LessonId,
        level: PermissionLevel,
    ) -> StoreResult<UserLesson> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user) {
            return Err(not_found("User"));
        }
        if !state.lessons.contains_key(&lesson) {
            return Err(not_found("Lesson"));
        }

        if let Some(grant) = state
            .grants
            .values_mut()
            .find(|g| g.user_id == user && g.lesson_id == lesson)
        {
            grant.permission_level = level;
            return Ok(grant.clone());
        }

        let grant = UserLesson {
            id: GrantId::new(),
            user_id: user,
            lesson_id: lesson,
            permission_level: level,
            shared_at: Utc::now(),
        };
        state.grants.insert(grant.id, grant.clone());
        Ok(grant)
    }

    async fn update_grant_level(
        &self,
        id: GrantId,
        level: PermissionLevel,
    ) -> StoreResult<UserLesson> {
        let mut state = self.state.write().await;
        let grant = state.grants.get_mut(&id).ok_or_else(|| not_found("Grant"))?;
        grant.permission_level = level;
        Ok(grant.clone())
    }

    async fn delete_grant(&self, user: UserId, lesson: LessonId) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let before = state.grants.len();
        state
            .grants
            .retain(|_, g| !(g.user_id == user && g.lesson_id == lesson));
        Ok(state.grants.len() < before)
    }

    async fn delete_grant_by_id(&self, id: GrantId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .grants
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found("Grant"))
    }

    async fn assign_default_owner(&self, owner: UserId) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&owner) {
            return Err(not_found("User"));
        }

        let now = Utc::now();
        let mut updated = 0;
        for lesson in state.lessons.values_mut() {
            if lesson.owner_id.is_none() {
                lesson.owner_id = Some(owner);
                lesson.updated_at = now;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[async_trait]
impl StudentStore for MemoryStore {
    async fn find_student(&self, id: StudentId) -> StoreResult<Option<Student>> {
        Ok(self.state.read().await.students.get(&id).cloned())
    }

    async fn query_students(&self, query: &StudentQuery) -> StoreResult<Page<Student>> {
        let state = self.state.read().await;
        let mut matches: Vec<Student> = state
            .students
            .values()
            .filter(|s| query.predicates.iter().all(|p| state.student_matches(s, p)))
            .cloned()
            .collect();
        matches.sort_by(student_order);
        Ok(page_of(matches, query.page))
    }

    async fn create_student(&self, student: NewStudent) -> StoreResult<Student> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let student = Student {
            id: StudentId::new(),
            first_name: student.first_name,
            last_name: student.last_name,
            date_started: student.date_started,
            classes_per_week: student.classes_per_week,
            notes_general: student.notes_general,
            notes_strengths: student.notes_strengths,
            notes_weaknesses: student.notes_weaknesses,
            notes_future: student.notes_future,
            created_at: now,
            updated_at: now,
        };
        state.students.insert(student.id, student.clone());
        Ok(student)
    }

    async fn update_student(&self, id: StudentId, patch: StudentPatch) -> StoreResult<Student> {
        let mut state = self.state.write().await;
        let student = state
            .students
            .get_mut(&id)
            .ok_or_else(|| not_found("Student"))?;

        if let Some(first_name) = patch.first_name {
            student.first_name = first_name;
        }
        if patch.last_name.is_some() {
            student.last_name = patch.last_name;
        }
        if patch.date_started.is_some() {
            student.date_started = patch.date_started;
        }
        if patch.classes_per_week.is_some() {
            student.classes_per_week = patch.classes_per_week;
        }
        if patch.notes_general.is_some() {
            student.notes_general = patch.notes_general;
        }
        if patch.notes_strengths.is_some() {
            student.notes_strengths = patch.notes_strengths;
        }
        if patch.notes_weaknesses.is_some() {
            student.notes_weaknesses = patch.notes_weaknesses;
        }
        if patch.notes_future.is_some() {
            student.notes_future = patch.notes_future;
        }
        student.updated_at = Utc::now();
        Ok(student.clone())
    }

    async fn delete_student(&self, id: StudentId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .students
            .remove(&id)
            .ok_or_else(|| not_found("Student"))?;

        state.status_history.retain(|r| r.student_id != id);
        state.level_history.retain(|r| r.student_id != id);
        state.quiz_results.retain(|_, r| r.student_id != id);
        for lesson in state.lessons.values_mut() {
            lesson.student_ids.retain(|s| *s != id);
        }
        Ok(())
    }

    async fn current_status(&self, id: StudentId) -> StoreResult<Option<String>> {
        Ok(self.state.read().await.current_status(id))
    }

    async fn current_level(&self, id: StudentId) -> StoreResult<Option<String>> {
        Ok(self.state.read().await.current_level(id))
    }

    async fn add_status_history(
        &self,
        student: StudentId,
        status: StatusId,
        changed_at: DateTime<Utc>,
    ) -> StoreResult<StatusHistoryEntry> {
        let mut state = self.state.write().await;
        if !state.students.contains_key(&student) {
            return Err(not_found("Student"));
        }
        if !state.statuses.contains_key(&status) {
            return Err(not_found("Status"));
        }

        let record = StatusRecord {
            id: StatusHistoryId::new(),
            student_id: student,
            status_id: status,
            changed_at,
        };
        let entry = state.status_entry(&record);
        state.status_history.push(record);
        Ok(entry)
    }

    async fn status_history(&self, student: StudentId) -> StoreResult<Vec<StatusHistoryEntry>> {
        let state = self.state.read().await;
        let mut records: Vec<(usize, &StatusRecord)> = state
            .status_history
            .iter()
            .enumerate()
            .filter(|(_, r)| r.student_id == student)
            .collect();
        records.sort_by(|(i, a), (j, b)| b.changed_at.cmp(&a.changed_at).then(j.cmp(i)));
        Ok(records
            .into_iter()
            .map(|(_, r)| state.status_entry(r))
            .collect())
    }

    async fn update_status_history(
        &self,
        student: StudentId,
        id: StatusHistoryId,
        dto: &UpdateStatusHistoryDto,
    ) -> StoreResult<StatusHistoryEntry> {
        let mut state = self.state.write().await;
        if let Some(status) = dto.status_id
            && !state.statuses.contains_key(&status)
        {
            return Err(not_found("Status"));
        }
        let record = state
            .status_history
            .iter_mut()
            .find(|r| r.id == id && r.student_id == student)
            .ok_or_else(|| not_found("Status history entry"))?;
        if let Some(status) = dto.status_id {
            record.status_id = status;
        }
        if let Some(changed_at) = dto.changed_at {
            record.changed_at = changed_at;
        }

        let state = &*state;
        state
            .status_history
            .iter()
            .find(|r| r.id == id)
            .map(|r| state.status_entry(r))
            .ok_or_else(|| not_found("Status history entry"))
    }

    async fn delete_status_history(
        &self,
        student: StudentId,
        id: StatusHistoryId,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let before = state.status_history.len();
        state
            .status_history
            .retain(|r| !(r.id == id && r.student_id == student));
        if state.status_history.len() == before {
            return Err(not_found("Status history entry"));
        }
        Ok(())
    }

    async fn add_level_history(
        &self,
        student: StudentId,
        level: LevelId,
        changed_at: DateTime<Utc>,
    ) -> StoreResult<LevelHistoryEntry> {
        let mut state = self.state.write().await;
        if !state.students.contains_key(&student) {
            return Err(not_found("Student"));
        }
        if !state.levels.contains_key(&level) {
            return Err(not_found("Level"));
        }

        let record = LevelRecord {
            id: LevelHistoryId::new(),
            student_id: student,
            level_id: level,
            changed_at,
        };
        let entry = state.level_entry(&record);
        state.level_history.push(record);
        Ok(entry)
    }

    async fn level_history(&self, student: StudentId) -> StoreResult<Vec<LevelHistoryEntry>> {
        let state = self.state.read().await;
        let mut records: Vec<(usize, &LevelRecord)> = state
            .level_history
            .iter()
            .enumerate()
            .filter(|(_, r)| r.student_id == student)
            .collect();
        records.sort_by(|(i, a), (j, b)| b.changed_at.cmp(&a.changed_at).then(j.cmp(i)));
        Ok(records
            .into_iter()
            .map(|(_, r)| state.level_entry(r))
            .collect())
    }

    async fn update_level_history(
        &self,
        student: StudentId,
        id: LevelHistoryId,
        dto: &UpdateLevelHistoryDto,
    ) -> StoreResult<LevelHistoryEntry> {
        let mut state = self.state.write().await;
        if let Some(level) = dto.level_id
            && !state.levels.contains_key(&level)
        {
            return Err(not_found("Level"));
        }
        let record = state
            .level_history
            .iter_mut()
            .find(|r| r.id == id && r.student_id == student)
            .ok_or_else(|| not_found("Level history entry"))?;
        if let Some(level) = dto.level_id {
            record.level_id = level;
        }
        if let Some(changed_at) = dto.changed_at {
            record.changed_at = changed_at;
        }

        let state = &*state;
        state
            .level_history
            .iter()
            .find(|r| r.id == id)
            .map(|r| state.level_entry(r))
            .ok_or_else(|| not_found("Level history entry"))
    }

    async fn delete_level_history(
        &self,
        student: StudentId,
        id: LevelHistoryId,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let before = state.level_history.len();
        state
            .level_history
            .retain(|r| !(r.id == id && r.student_id == student));
        if state.level_history.len() == before {
            return Err(not_found("Level history entry"));
        }
        Ok(())
    }
}

#[async_trait]
impl CurriculumStore for MemoryStore {
    async fn list_statuses(&self) -> StoreResult<Vec<StudentStatus>> {
        let state = self.state.read().await;
        let mut statuses: Vec<StudentStatus> = state.statuses.values().cloned().collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(statuses)
    }

    async fn create_status(&self, dto: &CreateStatusDto) -> StoreResult<StudentStatus> {
        let mut state = self.state.write().await;
        if state.statuses.values().any(|s| s.name == dto.name) {
            return Err(StoreError::Conflict(format!(
                "Status '{}' already exists",
                dto.name
            )));
        }
        let status = StudentStatus {
            id: StatusId::new(),
            name: dto.name.clone(),
        };
        state.statuses.insert(status.id, status.clone());
        Ok(status)
    }

    async fn delete_status(&self, id: StatusId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .statuses
            .remove(&id)
            .ok_or_else(|| not_found("Status"))?;
        state.status_history.retain(|r| r.status_id != id);
        Ok(())
    }

    async fn list_curricula(&self) -> StoreResult<Vec<Curriculum>> {
        let state = self.state.read().await;
        let mut curricula: Vec<Curriculum> = state.curricula.values().cloned().collect();
        curricula.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(curricula)
    }

    async fn create_curriculum(&self, dto: &CreateCurriculumDto) -> StoreResult<Curriculum> {
        let mut state = self.state.write().await;
        if state.curricula.values().any(|c| c.name == dto.name) {
            return Err(StoreError::Conflict(format!(
                "Curriculum '{}' already exists",
                dto.name
            )));
        }
        let curriculum = Curriculum {
            id: CurriculumId::new(),
            name: dto.name.clone(),
        };
        state.curricula.insert(curriculum.id, curriculum.clone());
        Ok(curriculum)
    }

    async fn delete_curriculum(&self, id: CurriculumId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .curricula
            .remove(&id)
            .ok_or_else(|| not_found("Curriculum"))?;
        let levels: Vec<LevelId> = state
            .levels
            .values()
            .filter(|l| l.curriculum_id == id)
            .map(|l| l.id)
            .collect();
        for level in levels {
            state.delete_level(level);
        }
        Ok(())
    }

    async fn list_levels(&self, curriculum: Option<CurriculumId>) -> StoreResult<Vec<Level>> {
        let state = self.state.read().await;
        let mut levels: Vec<Level> = state
            .levels
            .values()
            .filter(|l| curriculum.is_none_or(|c| l.curriculum_id == c))
            .cloned()
            .collect();
        levels.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(levels)
    }

    async fn create_level(&self, dto: &CreateLevelDto) -> StoreResult<Level> {
        let mut state = self.state.write().await;
        if !state.curricula.contains_key(&dto.curriculum_id) {
            return Err(not_found("Curriculum"));
        }
        let level = Level {
            id: LevelId::new(),
            name: dto.name.clone(),
            curriculum_id: dto.curriculum_id,
        };
        state.levels.insert(level.id, level.clone());
        Ok(level)
    }

    async fn delete_level(&self, id: LevelId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.levels.contains_key(&id) {
            return Err(not_found("Level"));
        }
        state.delete_level(id);
        Ok(())
    }

    async fn list_units(&self, level: Option<LevelId>) -> StoreResult<Vec<Unit>> {
        let state = self.state.read().await;
        let mut units: Vec<Unit> = state
            .units
            .values()
            .filter(|u| level.is_none_or(|l| u.level_id == l))
            .cloned()
            .collect();
        units.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(units)
    }

    async fn create_unit(&self, dto: &CreateUnitDto) -> StoreResult<Unit> {
        let mut state = self.state.write().await;
        if !state.levels.contains_key(&dto.level_id) {
            return Err(not_found("Level"));
        }
        let unit = Unit {
            id: UnitId::new(),
            name: dto.name.clone(),
            level_id: dto.level_id,
        };
        state.units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    async fn update_unit(&self, id: UnitId, dto: &UpdateUnitDto) -> StoreResult<Unit> {
        let mut state = self.state.write().await;
        if let Some(level) = dto.level_id
            && !state.levels.contains_key(&level)
        {
            return Err(not_found("Level"));
        }
        let unit = state.units.get_mut(&id).ok_or_else(|| not_found("Unit"))?;
        if let Some(name) = &dto.name {
            unit.name = name.clone();
        }
        if let Some(level) = dto.level_id {
            unit.level_id = level;
        }
        Ok(unit.clone())
    }

    async fn delete_unit(&self, id: UnitId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.units.contains_key(&id) {
            return Err(not_found("Unit"));
        }
        state.delete_unit(id);
        Ok(())
    }

    async fn list_quizzes(&self, unit: Option<UnitId>) -> StoreResult<Vec<Quiz>> {
        let state = self.state.read().await;
        let mut quizzes: Vec<Quiz> = state
            .quizzes
            .values()
            .filter(|q| unit.is_none_or(|u| q.unit_id == Some(u)))
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(quizzes)
    }

    async fn create_quiz(&self, dto: &CreateQuizDto) -> StoreResult<Quiz> {
        let mut state = self.state.write().await;
        if let Some(unit) = dto.unit_id
            && !state.units.contains_key(&unit)
        {
            return Err(not_found("Unit"));
        }
        let quiz = Quiz {
            id: QuizId::new(),
            name: dto.name.clone(),
            max_points: dto.max_points,
            unit_id: dto.unit_id,
        };
        state.quizzes.insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn delete_quiz(&self, id: QuizId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.quizzes.contains_key(&id) {
            return Err(not_found("Quiz"));
        }
        state.delete_quiz(id);
        Ok(())
    }

    async fn record_quiz_result(
        &self,
        dto: &CreateQuizResultDto,
    ) -> StoreResult<StudentLessonQuiz> {
        let mut state = self.state.write().await;
        if !state.students.contains_key(&dto.student_id) {
            return Err(not_found("Student"));
        }
        if !state.lessons.contains_key(&dto.lesson_id) {
            return Err(not_found("Lesson"));
        }
        if let Some(quiz) = dto.quiz_id
            && !state.quizzes.contains_key(&quiz)
        {
            return Err(not_found("Quiz"));
        }

        let result = StudentLessonQuiz {
            id: QuizResultId::new(),
            student_id: dto.student_id,
            lesson_id: dto.lesson_id,
            quiz_id: dto.quiz_id,
            points: dto.points,
            notes: dto.notes.clone(),
            recorded_at: Utc::now(),
        };
        state.quiz_results.insert(result.id, result.clone());
        Ok(result)
    }

    async fn find_quiz_result(&self, id: QuizResultId) -> StoreResult<Option<StudentLessonQuiz>> {
        Ok(self.state.read().await.quiz_results.get(&id).cloned())
    }

    async fn update_quiz_result(
        &self,
        id: QuizResultId,
        dto: &UpdateQuizResultDto,
    ) -> StoreResult<StudentLessonQuiz> {
        let mut state = self.state.write().await;
        if let Some(quiz) = dto.quiz_id
            && !state.quizzes.contains_key(&quiz)
        {
            return Err(not_found("Quiz"));
        }
        let result = state
            .quiz_results
            .get_mut(&id)
            .ok_or_else(|| not_found("Quiz result"))?;
        if dto.quiz_id.is_some() {
            result.quiz_id = dto.quiz_id;
        }
        if dto.points.is_some() {
            result.points = dto.points;
        }
        if let Some(notes) = &dto.notes {
            result.notes = Some(notes.clone());
        }
        Ok(result.clone())
    }

    async fn delete_quiz_result(&self, id: QuizResultId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .quiz_results
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found("Quiz result"))
    }

    async fn quiz_results_for_lesson(
        &self,
        lesson: LessonId,
    ) -> StoreResult<Vec<StudentLessonQuiz>> {
        let state = self.state.read().await;
        let mut results: Vec<StudentLessonQuiz> = state
            .quiz_results
            .values()
            .filter(|r| r.lesson_id == lesson)
            .cloned()
            .collect();
        results.sort_by(|a, b| a.student_id.cmp(&b.student_id).then_with(|| a.id.cmp(&b.id)));
        Ok(results)
    }

    async fn list_quiz_results(
        &self,
        filter: &QuizResultFilter,
    ) -> StoreResult<Page<StudentLessonQuiz>> {
        let state = self.state.read().await;
        let mut results: Vec<StudentLessonQuiz> = state
            .quiz_results
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        results.sort_by(|a, b| {
            b.recorded_at
                .cmp(&a.recorded_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(page_of(results, filter.page))
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use tutordesk_core::PageRequest;
    use tutordesk_models::UserRole;
    use tutordesk_models::query::{DateWindow, GroupSize, LessonPredicate, LessonScope};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn new_user(email: &str, role: UserRole) -> NewUser {
        NewUser {
            first_name: "Test".into(),
            last_name: "User".into(),
            email: email.into(),
            role,
            password_hash: "x".into(),
        }
    }

    fn new_lesson(owner: Option<UserId>, datetime: DateTime<Utc>, students: &[StudentId]) -> NewLesson {
        NewLesson {
            datetime,
            plan: None,
            concepts: None,
            notes: None,
            owner_id: owner,
            student_ids: students.to_vec(),
        }
    }

    async fn student(store: &MemoryStore, first: &str, last: Option<&str>) -> Student {
        store
            .create_student(NewStudent {
                first_name: first.into(),
                last_name: last.map(Into::into),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_email_conflict() {
        let store = MemoryStore::new();
        store
            .create_user(new_user("a@x.io", UserRole::Admin))
            .await
            .unwrap();
        let err = store
            .create_user(new_user("a@x.io", UserRole::Instructor))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_last_admin_cannot_be_removed_or_demoted() {
        let store = MemoryStore::new();
        let admin = store
            .create_user(new_user("a@x.io", UserRole::Admin))
            .await
            .unwrap();

        let err = store.delete_user(admin.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let demote = UserPatch {
            role: Some(UserRole::Instructor),
            ..Default::default()
        };
        let err = store.update_user(admin.id, demote.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        store
            .create_user(new_user("b@x.io", UserRole::Admin))
            .await
            .unwrap();
        let demoted = store.update_user(admin.id, demote).await.unwrap();
        assert_eq!(demoted.role, UserRole::Instructor);
    }

    #[tokio::test]
    async fn test_delete_user_orphans_lessons_and_drops_grants() {
        let store = MemoryStore::new();
        store
            .create_user(new_user("admin@x.io", UserRole::Admin))
            .await
            .unwrap();
        let owner = store
            .create_user(new_user("o@x.io", UserRole::Instructor))
            .await
            .unwrap();
        let lesson = store
            .create_lesson(new_lesson(Some(owner.id), at(2025, 1, 1), &[]))
            .await
            .unwrap();
        store
            .upsert_grant(owner.id, lesson.id, PermissionLevel::View)
            .await
            .unwrap();

        store.delete_user(owner.id).await.unwrap();

        let lesson = store.find_lesson(lesson.id).await.unwrap().unwrap();
        assert_eq!(lesson.owner_id, None);
        assert!(store.find_grant(owner.id, lesson.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_lesson_requires_existing_students() {
        let store = MemoryStore::new();
        let err = store
            .create_lesson(new_lesson(None, at(2025, 1, 1), &[StudentId::new()]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_participants() {
        let store = MemoryStore::new();
        let ann = student(&store, "Ann", Some("Lee")).await;
        let lesson = store
            .create_lesson(new_lesson(None, at(2025, 1, 1), &[]))
            .await
            .unwrap();

        let lesson = store.add_participant(lesson.id, ann.id).await.unwrap();
        assert_eq!(lesson.student_ids, vec![ann.id]);

        let err = store.add_participant(lesson.id, ann.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let lesson = store.remove_participant(lesson.id, ann.id).await.unwrap();
        assert!(lesson.student_ids.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_grant_overwrites_level() {
        let store = MemoryStore::new();
        let user = store
            .create_user(new_user("u@x.io", UserRole::Assistant))
            .await
            .unwrap();
        let lesson = store
            .create_lesson(new_lesson(None, at(2025, 1, 1), &[]))
            .await
            .unwrap();

        let first = store
            .upsert_grant(user.id, lesson.id, PermissionLevel::View)
            .await
            .unwrap();
        let second = store
            .upsert_grant(user.id, lesson.id, PermissionLevel::Manage)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.permission_level, PermissionLevel::Manage);
        let all = store.list_grants(&GrantFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_assign_default_owner_is_idempotent() {
        let store = MemoryStore::new();
        let owner = store
            .create_user(new_user("o@x.io", UserRole::Admin))
            .await
            .unwrap();
        for day in 1..=3 {
            store
                .create_lesson(new_lesson(None, at(2025, 1, day), &[]))
                .await
                .unwrap();
        }
        store
            .create_lesson(new_lesson(Some(owner.id), at(2025, 1, 9), &[]))
            .await
            .unwrap();

        assert_eq!(store.assign_default_owner(owner.id).await.unwrap(), 3);
        assert_eq!(store.assign_default_owner(owner.id).await.unwrap(), 0);
        assert!(store.lessons_owned_by(None).await.unwrap().is_empty());

        let err = store.assign_default_owner(UserId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_current_status_ties_go_to_latest_insert() {
        let store = MemoryStore::new();
        let ann = student(&store, "Ann", None).await;
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

        assert_eq!(store.current_status(ann.id).await.unwrap(), None);

        store
            .add_status_history(ann.id, active.id, at(2025, 2, 1))
            .await
            .unwrap();
        store
            .add_status_history(ann.id, paused.id, at(2025, 1, 1))
            .await
            .unwrap();
        assert_eq!(
            store.current_status(ann.id).await.unwrap().as_deref(),
            Some("Active")
        );

        store
            .add_status_history(ann.id, paused.id, at(2025, 2, 1))
            .await
            .unwrap();
        assert_eq!(
            store.current_status(ann.id).await.unwrap().as_deref(),
            Some("Paused")
        );

        let history = store.status_history(ann.id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].status, "Paused");
        assert_eq!(history[1].status, "Active");
        assert_eq!(history[2].changed_at, at(2025, 1, 1));
    }

    #[tokio::test]
    async fn test_query_students_filters_and_orders() {
        let store = MemoryStore::new();
        let ann = student(&store, "Ann", Some("Zane")).await;
        let bob = student(&store, "Bob", Some("Annis")).await;
        let cid = student(&store, "Cid", None).await;
        let dee = student(&store, "Dee", Some("Moss")).await;

        store
            .create_lesson(new_lesson(None, at(2025, 1, 5), &[ann.id, bob.id]))
            .await
            .unwrap();
        store
            .create_lesson(new_lesson(None, at(2025, 3, 5), &[cid.id]))
            .await
            .unwrap();

        let query = |predicates| StudentQuery {
            predicates,
            page: PageRequest::default(),
        };

        let page = store
            .query_students(&query(vec![StudentPredicate::NameContains("ANN".into())]))
            .await
            .unwrap();
        let ids: Vec<StudentId> = page.items.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![bob.id, ann.id]);

        let page = store
            .query_students(&query(vec![StudentPredicate::HasLessonOfSize(
                GroupSize::Individual,
            )]))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, cid.id);

        let window = DateWindow::between(Some(at(2025, 1, 1)), Some(at(2025, 1, 31))).unwrap();
        let page = store
            .query_students(&query(vec![StudentPredicate::HasLessonWithin(window)]))
            .await
            .unwrap();
        assert_eq!(page.total_count, 2);

        let page = store.query_students(&query(vec![])).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|s| s.first_name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Dee", "Ann", "Cid"]);
        assert!(page.items.iter().any(|s| s.id == dee.id));
    }

    #[tokio::test]
    async fn test_student_names_sort_case_insensitively() {
        let store = MemoryStore::new();
        student(&store, "eve", Some("Baker")).await;
        student(&store, "Flo", Some("adams")).await;
        student(&store, "gus", Some("Adams")).await;
        student(&store, "Hal", Some("Adams")).await;

        let page = store
            .query_students(&StudentQuery {
                predicates: vec![],
                page: PageRequest::default(),
            })
            .await
            .unwrap();
        let names: Vec<&str> = page.items.iter().map(|s| s.first_name.as_str()).collect();
        assert_eq!(names, vec!["gus", "Hal", "Flo", "eve"]);
    }

    #[tokio::test]
    async fn test_query_students_started_and_classes() {
        let store = MemoryStore::new();
        let early = store
            .create_student(NewStudent {
                first_name: "Early".into(),
                date_started: NaiveDate::from_ymd_opt(2023, 5, 1),
                classes_per_week: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        let late = store
            .create_student(NewStudent {
                first_name: "Late".into(),
                date_started: NaiveDate::from_ymd_opt(2024, 9, 1),
                classes_per_week: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();

        let page = store
            .query_students(&StudentQuery {
                predicates: vec![StudentPredicate::StartedOnOrAfter(
                    NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
                )],
                page: PageRequest::default(),
            })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, late.id);

        let page = store
            .query_students(&StudentQuery {
                predicates: vec![StudentPredicate::ClassesPerWeek(2)],
                page: PageRequest::default(),
            })
            .await
            .unwrap();
        assert_eq!(page.items[0].id, early.id);
    }

    #[tokio::test]
    async fn test_query_lessons_scope_order_and_pages() {
        let store = MemoryStore::new();
        let ann = student(&store, "Ann", None).await;
        let mut ids = Vec::new();
        for day in 1..=5 {
            let lesson = store
                .create_lesson(new_lesson(None, at(2025, 1, day), &[ann.id]))
                .await
                .unwrap();
            ids.push(lesson.id);
        }

        let page = store
            .query_lessons(&LessonQuery {
                scope: LessonScope::Only(vec![ids[0], ids[2], ids[4]]),
                predicates: vec![LessonPredicate::HasStudent(ann.id)],
                page: Some(PageRequest::new(1, 2)),
            })
            .await
            .unwrap();
        assert_eq!(page.total_count, 3);
        let got: Vec<LessonId> = page.items.iter().map(|l| l.id).collect();
        assert_eq!(got, vec![ids[4], ids[2]]);

        let page = store
            .query_lessons(&LessonQuery {
                scope: LessonScope::All,
                predicates: vec![],
                page: Some(PageRequest::new(9, 2)),
            })
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 5);
    }

    #[tokio::test]
    async fn test_delete_student_cascades() {
        let store = MemoryStore::new();
        let ann = student(&store, "Ann", None).await;
        let lesson = store
            .create_lesson(new_lesson(None, at(2025, 1, 1), &[ann.id]))
            .await
            .unwrap();
        let result = store
            .record_quiz_result(&CreateQuizResultDto {
                student_id: ann.id,
                lesson_id: lesson.id,
                quiz_id: None,
                points: Some(8.5),
                notes: None,
            })
            .await
            .unwrap();

        store.delete_student(ann.id).await.unwrap();

        let lesson = store.find_lesson(lesson.id).await.unwrap().unwrap();
        assert!(lesson.student_ids.is_empty());
        assert!(store.find_quiz_result(result.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_quiz_keeps_results() {
        let store = MemoryStore::new();
        let ann = student(&store, "Ann", None).await;
        let lesson = store
            .create_lesson(new_lesson(None, at(2025, 1, 1), &[ann.id]))
            .await
            .unwrap();
        let quiz = store
            .create_quiz(&CreateQuizDto {
                name: "Scales".into(),
                max_points: Some(10),
                unit_id: None,
            })
            .await
            .unwrap();
        let result = store
            .record_quiz_result(&CreateQuizResultDto {
                student_id: ann.id,
                lesson_id: lesson.id,
                quiz_id: Some(quiz.id),
                points: Some(7.0),
                notes: None,
            })
            .await
            .unwrap();

        store.delete_quiz(quiz.id).await.unwrap();

        let kept = store.find_quiz_result(result.id).await.unwrap().unwrap();
        assert_eq!(kept.quiz_id, None);
    }

    #[tokio::test]
    async fn test_curriculum_cascade() {
        let store = MemoryStore::new();
        let curriculum = store
            .create_curriculum(&CreateCurriculumDto {
                name: "Piano".into(),
            })
            .await
            .unwrap();
        let level = store
            .create_level(&CreateLevelDto {
                name: "Grade 1".into(),
                curriculum_id: curriculum.id,
            })
            .await
            .unwrap();
        store
            .create_unit(&CreateUnitDto {
                name: "Scales".into(),
                level_id: level.id,
            })
            .await
            .unwrap();

        store.delete_curriculum(curriculum.id).await.unwrap();

        assert!(store.list_levels(None).await.unwrap().is_empty());
        assert!(store.list_units(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_corrections_drive_current_status() {
        let store = MemoryStore::new();
        let ann = student(&store, "Ann", None).await;
        let bob = student(&store, "Bob", None).await;
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
            .add_status_history(ann.id, active.id, at(2025, 2, 1))
            .await
            .unwrap();
        let entry = store
            .add_status_history(ann.id, paused.id, at(2025, 1, 1))
            .await
            .unwrap();

        let moved = store
            .update_status_history(
                ann.id,
                entry.id,
                &UpdateStatusHistoryDto {
                    status_id: None,
                    changed_at: Some(at(2025, 3, 1)),
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.status, "Paused");
        assert_eq!(
            store.current_status(ann.id).await.unwrap().as_deref(),
            Some("Paused")
        );

        let err = store
            .update_status_history(bob.id, entry.id, &UpdateStatusHistoryDto::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = store
            .update_status_history(
                ann.id,
                entry.id,
                &UpdateStatusHistoryDto {
                    status_id: Some(StatusId::new()),
                    changed_at: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        store.delete_status_history(ann.id, entry.id).await.unwrap();
        assert_eq!(
            store.current_status(ann.id).await.unwrap().as_deref(),
            Some("Active")
        );
        assert!(store.delete_status_history(ann.id, entry.id).await.is_err());
    }

    #[tokio::test]
    async fn test_level_history_corrections() {
        let store = MemoryStore::new();
        let ann = student(&store, "Ann", None).await;
        let curriculum = store
            .create_curriculum(&CreateCurriculumDto {
                name: "Piano".into(),
            })
            .await
            .unwrap();
        let level = |name: &str| CreateLevelDto {
            name: name.into(),
            curriculum_id: curriculum.id,
        };
        let grade_one = store.create_level(&level("Grade 1")).await.unwrap();
        let grade_two = store.create_level(&level("Grade 2")).await.unwrap();
        let entry = store
            .add_level_history(ann.id, grade_one.id, at(2025, 1, 1))
            .await
            .unwrap();

        let fixed = store
            .update_level_history(
                ann.id,
                entry.id,
                &UpdateLevelHistoryDto {
                    level_id: Some(grade_two.id),
                    changed_at: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(fixed.level, "Grade 2");
        assert_eq!(fixed.changed_at, at(2025, 1, 1));
        assert_eq!(
            store.current_level(ann.id).await.unwrap().as_deref(),
            Some("Grade 2")
        );

        store.delete_level_history(ann.id, entry.id).await.unwrap();
        assert_eq!(store.current_level(ann.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_unit() {
        let store = MemoryStore::new();
        let curriculum = store
            .create_curriculum(&CreateCurriculumDto {
                name: "Piano".into(),
            })
            .await
            .unwrap();
        let level = |name: &str| CreateLevelDto {
            name: name.into(),
            curriculum_id: curriculum.id,
        };
        let grade_one = store.create_level(&level("Grade 1")).await.unwrap();
        let grade_two = store.create_level(&level("Grade 2")).await.unwrap();
        let unit = store
            .create_unit(&CreateUnitDto {
                name: "Scales".into(),
                level_id: grade_one.id,
            })
            .await
            .unwrap();

        let moved = store
            .update_unit(
                unit.id,
                &UpdateUnitDto {
                    name: None,
                    level_id: Some(grade_two.id),
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.name, "Scales");
        assert_eq!(moved.level_id, grade_two.id);
        assert!(store.list_units(Some(grade_one.id)).await.unwrap().is_empty());

        let err = store
            .update_unit(
                unit.id,
                &UpdateUnitDto {
                    name: None,
                    level_id: Some(LevelId::new()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(
            store
                .update_unit(UnitId::new(), &UpdateUnitDto::default())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_quiz_results_update_and_list() {
        let store = MemoryStore::new();
        let ann = student(&store, "Ann", None).await;
        let bob = student(&store, "Bob", None).await;
        let monday = store
            .create_lesson(new_lesson(None, at(2025, 1, 6), &[ann.id, bob.id]))
            .await
            .unwrap();
        let tuesday = store
            .create_lesson(new_lesson(None, at(2025, 1, 7), &[ann.id]))
            .await
            .unwrap();
        let record = |student: StudentId, lesson: LessonId, points: f64| CreateQuizResultDto {
            student_id: student,
            lesson_id: lesson,
            quiz_id: None,
            points: Some(points),
            notes: Some("steady".into()),
        };
        let first = store
            .record_quiz_result(&record(ann.id, monday.id, 6.0))
            .await
            .unwrap();
        store
            .record_quiz_result(&record(bob.id, monday.id, 9.0))
            .await
            .unwrap();
        store
            .record_quiz_result(&record(ann.id, tuesday.id, 7.0))
            .await
            .unwrap();

        let updated = store
            .update_quiz_result(
                first.id,
                &UpdateQuizResultDto {
                    points: Some(8.5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.points, Some(8.5));
        assert_eq!(updated.notes.as_deref(), Some("steady"));
        assert_eq!(updated.recorded_at, first.recorded_at);

        let filter = |scope, student_id| QuizResultFilter {
            scope,
            student_id,
            lesson_id: None,
            quiz_id: None,
            page: PageRequest::new(1, 2),
        };

        let page = store
            .list_quiz_results(&filter(LessonScope::All, None))
            .await
            .unwrap();
        assert_eq!(page.total_count, 3);
        assert_eq!(page.items.len(), 2);

        let page = store
            .list_quiz_results(&filter(LessonScope::All, Some(ann.id)))
            .await
            .unwrap();
        assert_eq!(page.total_count, 2);

        let page = store
            .list_quiz_results(&filter(LessonScope::Only(vec![tuesday.id]), None))
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].lesson_id, tuesday.id);

        let err = store
            .update_quiz_result(QuizResultId::new(), &UpdateQuizResultDto::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
