//! Lesson access control and lesson mutations.
//!
//! Every capability check walks the same chain and stops at the first match:
//!
//! 1. admins may do anything;
//! 2. the owner may do anything;
//! 3. otherwise the caller's grant on the lesson decides, through
//!    [`PermissionLevel`]'s predicates;
//! 4. otherwise access is denied.
//!
//! A lesson without an owner never matches step 2 and skips step 3, so only
//! admins reach it until [`LessonService::assign_default_owner`] runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{instrument, warn};

use tutordesk_core::{AppError, Page, PaginationMeta};
use tutordesk_db::{EntityStore, LessonStore, UserStore};
use tutordesk_models::ids::{GrantId, LessonId, StudentId, UserId};
use tutordesk_models::lessons::{
    CreateLessonDto, Lesson, LessonPatch, NewLesson, PaginatedLessonsResponse, UpdateLessonDto,
};
use tutordesk_models::query::{LessonFilters, LessonQuery, LessonScope};
use tutordesk_models::sharing::{GrantFilter, GrantFilterParams, UserLesson};
use tutordesk_models::users::User;
use tutordesk_models::PermissionLevel;

use crate::metrics::{track_lesson_access_denied, track_lesson_shared, track_lessons_owner_assigned};

/// How a user came to hold rights on a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Admin,
    Owner,
    Granted(PermissionLevel),
}

impl Capability {
    pub fn can_view(self) -> bool {
        match self {
            Capability::Admin | Capability::Owner => true,
            Capability::Granted(level) => level.can_view(),
        }
    }

    pub fn can_edit(self) -> bool {
        match self {
            Capability::Admin | Capability::Owner => true,
            Capability::Granted(level) => level.can_edit(),
        }
    }

    pub fn can_manage(self) -> bool {
        match self {
            Capability::Admin | Capability::Owner => true,
            Capability::Granted(level) => level.can_manage(),
        }
    }
}

#[derive(Clone, Copy)]
enum Need {
    View,
    Edit,
    Manage,
}

impl Need {
    fn satisfied_by(self, capability: Capability) -> bool {
        match self {
            Need::View => capability.can_view(),
            Need::Edit => capability.can_edit(),
            Need::Manage => capability.can_manage(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Need::View => "view",
            Need::Edit => "edit",
            Need::Manage => "manage",
        }
    }
}

#[derive(Clone)]
pub struct LessonService {
    store: Arc<dyn EntityStore>,
}

impl LessonService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Resolves the caller's capability on `lesson`, or `None` when denied.
    ///
    /// A failed grant lookup is logged and treated as no grant.
    pub async fn access_level(&self, user: &User, lesson: &Lesson) -> Option<Capability> {
        if user.is_admin() {
            return Some(Capability::Admin);
        }
        let owner = lesson.owner_id?;
        if owner == user.id {
            return Some(Capability::Owner);
        }
        match self.store.find_grant(user.id, lesson.id).await {
            Ok(grant) => grant.map(|g| Capability::Granted(g.permission_level)),
            Err(err) => {
                warn!(user_id = %user.id, lesson_id = %lesson.id, error = %err, "Grant lookup failed, denying access");
                None
            }
        }
    }

    async fn allows(&self, user: &User, lesson: &Lesson, need: Need) -> bool {
        self.access_level(user, lesson)
            .await
            .is_some_and(|capability| need.satisfied_by(capability))
    }

    pub async fn can_access(&self, user: &User, lesson: &Lesson) -> bool {
        self.allows(user, lesson, Need::View).await
    }

    pub async fn can_edit(&self, user: &User, lesson: &Lesson) -> bool {
        self.allows(user, lesson, Need::Edit).await
    }

    pub async fn can_manage(&self, user: &User, lesson: &Lesson) -> bool {
        self.allows(user, lesson, Need::Manage).await
    }

    pub async fn get_lesson(&self, id: LessonId) -> Result<Lesson, AppError> {
        self.store
            .find_lesson(id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Lesson not found")))
    }

    async fn authorize(&self, user: &User, id: LessonId, need: Need) -> Result<Lesson, AppError> {
        let lesson = self.get_lesson(id).await?;
        if self.allows(user, &lesson, need).await {
            Ok(lesson)
        } else {
            track_lesson_access_denied(need.label());
            Err(AppError::forbidden(format!(
                "You do not have permission to {} this lesson",
                need.label()
            )))
        }
    }

    /// Loads the lesson, failing with `PermissionDenied` unless the user may view it.
    pub async fn require_access(&self, user: &User, id: LessonId) -> Result<Lesson, AppError> {
        self.authorize(user, id, Need::View).await
    }

    pub async fn require_edit(&self, user: &User, id: LessonId) -> Result<Lesson, AppError> {
        self.authorize(user, id, Need::Edit).await
    }

    pub async fn require_manage(&self, user: &User, id: LessonId) -> Result<Lesson, AppError> {
        self.authorize(user, id, Need::Manage).await
    }

    /// Grants `grantee` the given level on the lesson, overwriting any
    /// existing grant for the pair.
    #[instrument(skip(self, granter), fields(granter = %granter.id))]
    pub async fn share(
        &self,
        lesson_id: LessonId,
        granter: &User,
        grantee: UserId,
        level: &str,
    ) -> Result<UserLesson, AppError> {
        let level: PermissionLevel = level.parse()?;
        let lesson = self.require_manage(granter, lesson_id).await?;

        if self.store.find_user(grantee).await?.is_none() {
            return Err(AppError::not_found(anyhow!("User not found")));
        }

        let grant = self.store.upsert_grant(grantee, lesson.id, level).await?;
        track_lesson_shared(level.as_str());
        Ok(grant)
    }

    /// Removes `grantee`'s grant. Anyone may remove their own grant; removing
    /// someone else's needs manage rights. A missing grant is not an error.
    #[instrument(skip(self, requester), fields(requester = %requester.id))]
    pub async fn unshare(
        &self,
        lesson_id: LessonId,
        requester: &User,
        grantee: UserId,
    ) -> Result<(), AppError> {
        if requester.id == grantee {
            self.get_lesson(lesson_id).await?;
        } else {
            self.require_manage(requester, lesson_id).await?;
        }
        self.store.delete_grant(grantee, lesson_id).await?;
        Ok(())
    }

    async fn find_grant(&self, id: GrantId) -> Result<UserLesson, AppError> {
        self.store
            .find_grant_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Grant not found")))
    }

    /// Visible to admins, the grantee and managers of the lesson.
    pub async fn get_grant(&self, id: GrantId, requester: &User) -> Result<UserLesson, AppError> {
        let grant = self.find_grant(id).await?;
        if grant.user_id != requester.id {
            self.require_manage(requester, grant.lesson_id).await?;
        }
        Ok(grant)
    }

    #[instrument(skip(self, requester), fields(requester = %requester.id))]
    pub async fn update_grant(
        &self,
        id: GrantId,
        requester: &User,
        level: &str,
    ) -> Result<UserLesson, AppError> {
        let level: PermissionLevel = level.parse()?;
        let grant = self.find_grant(id).await?;
        self.require_manage(requester, grant.lesson_id).await?;

        let grant = self.store.update_grant_level(grant.id, level).await?;
        track_lesson_shared(level.as_str());
        Ok(grant)
    }

    #[instrument(skip(self, requester), fields(requester = %requester.id))]
    pub async fn remove_grant(&self, id: GrantId, requester: &User) -> Result<(), AppError> {
        let grant = self.find_grant(id).await?;
        if grant.user_id != requester.id {
            self.require_manage(requester, grant.lesson_id).await?;
        }
        self.store.delete_grant_by_id(grant.id).await?;
        Ok(())
    }

    /// Admins see every grant matching the filter. Other users see their own
    /// grants, or every grant on a lesson they manage when filtering by it.
    pub async fn list_grants(
        &self,
        requester: &User,
        params: &GrantFilterParams,
    ) -> Result<Vec<UserLesson>, AppError> {
        let mut filter = GrantFilter {
            lesson_id: params.lesson_id,
            user_id: params.user_id,
            permission_level: params
                .permission_level
                .as_deref()
                .map(str::parse::<PermissionLevel>)
                .transpose()?,
        };

        if !requester.is_admin() {
            if filter.user_id.is_some_and(|id| id != requester.id) {
                return Err(AppError::forbidden(
                    "Only admins can list another user's grants",
                ));
            }
            let manages_lesson = match filter.lesson_id {
                Some(lesson_id) => {
                    let lesson = self.get_lesson(lesson_id).await?;
                    self.can_manage(requester, &lesson).await
                }
                None => false,
            };
            if !manages_lesson {
                filter.user_id = Some(requester.id);
            }
        }

        Ok(self.store.list_grants(&filter).await?)
    }

    /// Lessons the user may view: everything for admins, otherwise owned
    /// lessons plus, with `include_shared`, lessons granted to them.
    /// The result is in no particular order.
    pub async fn list_accessible_lessons(
        &self,
        user: &User,
        include_shared: bool,
    ) -> Result<Vec<Lesson>, AppError> {
        if user.is_admin() {
            return Ok(self.store.all_lessons().await?);
        }

        let mut lessons: BTreeMap<LessonId, Lesson> = self
            .store
            .lessons_owned_by(Some(user.id))
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();

        if include_shared {
            for lesson in self.store.lessons_granted_to(user.id).await? {
                if lesson.owner_id.is_some() {
                    lessons.entry(lesson.id).or_insert(lesson);
                }
            }
        }

        Ok(lessons.into_values().collect())
    }

    pub async fn accessible_lesson_ids(
        &self,
        user: &User,
        include_shared: bool,
    ) -> Result<LessonScope, AppError> {
        if user.is_admin() {
            return Ok(LessonScope::All);
        }
        let lessons = self.list_accessible_lessons(user, include_shared).await?;
        Ok(LessonScope::Only(lessons.into_iter().map(|l| l.id).collect()))
    }

    /// Lessons of `target` as seen by `requester`. Only admins may look at
    /// another user; they see that user's lessons together with every
    /// ownerless lesson.
    pub async fn lessons_for_user(
        &self,
        requester: &User,
        target: UserId,
        include_shared: bool,
    ) -> Result<Vec<Lesson>, AppError> {
        if requester.id == target {
            return self.list_accessible_lessons(requester, include_shared).await;
        }
        if !requester.is_admin() {
            return Err(AppError::forbidden(
                "You can only list your own lessons",
            ));
        }
        if self.store.find_user(target).await?.is_none() {
            return Err(AppError::not_found(anyhow!("User not found")));
        }

        let mut lessons = self.store.lessons_owned_by(Some(target)).await?;
        lessons.extend(self.store.lessons_owned_by(None).await?);
        Ok(lessons)
    }

    /// Runs a composed lesson list query within the lessons the requester
    /// may see.
    #[instrument(skip(self, requester), fields(requester = %requester.id))]
    pub async fn list_lessons(
        &self,
        requester: &User,
        filters: LessonFilters,
    ) -> Result<PaginatedLessonsResponse, AppError> {
        let scope = match filters.user_id {
            Some(target) if target != requester.id => LessonScope::Only(
                self.lessons_for_user(requester, target, filters.include_shared)
                    .await?
                    .into_iter()
                    .map(|l| l.id)
                    .collect(),
            ),
            _ => {
                self.accessible_lesson_ids(requester, filters.include_shared)
                    .await?
            }
        };

        let page: Page<Lesson> = match &scope {
            LessonScope::Only(ids) if ids.is_empty() => Page::unpaginated(Vec::new()),
            _ => {
                self.store
                    .query_lessons(&LessonQuery {
                        scope,
                        predicates: filters.predicates,
                        page: filters.page,
                    })
                    .await?
            }
        };

        Ok(PaginatedLessonsResponse {
            meta: filters
                .page
                .map(|request| PaginationMeta::new(&request, page.total_count)),
            data: page.items,
        })
    }

    /// Gives every ownerless lesson to `owner`. Admin only.
    #[instrument(skip(self, requester), fields(requester = %requester.id))]
    pub async fn assign_default_owner(
        &self,
        requester: &User,
        owner: UserId,
    ) -> Result<u64, AppError> {
        if !requester.is_admin() {
            return Err(AppError::forbidden("Only admins can assign lesson owners"));
        }
        let updated = self.store.assign_default_owner(owner).await?;
        track_lessons_owner_assigned(updated);
        Ok(updated)
    }

    #[instrument(skip(self, owner, dto), fields(owner = %owner.id))]
    pub async fn create_lesson(
        &self,
        owner: &User,
        dto: CreateLessonDto,
    ) -> Result<Lesson, AppError> {
        Ok(self
            .store
            .create_lesson(NewLesson {
                datetime: dto.datetime,
                plan: dto.plan,
                concepts: dto.concepts,
                notes: dto.notes,
                owner_id: Some(owner.id),
                student_ids: dto.student_ids,
            })
            .await?)
    }

    #[instrument(skip(self, requester, dto), fields(requester = %requester.id))]
    pub async fn update_lesson(
        &self,
        requester: &User,
        id: LessonId,
        dto: UpdateLessonDto,
    ) -> Result<Lesson, AppError> {
        self.require_edit(requester, id).await?;
        Ok(self
            .store
            .update_lesson(
                id,
                LessonPatch {
                    datetime: dto.datetime,
                    plan: dto.plan,
                    concepts: dto.concepts,
                    notes: dto.notes,
                    student_ids: dto.student_ids,
                },
            )
            .await?)
    }

    #[instrument(skip(self, requester), fields(requester = %requester.id))]
    pub async fn delete_lesson(&self, requester: &User, id: LessonId) -> Result<(), AppError> {
        self.require_manage(requester, id).await?;
        Ok(self.store.delete_lesson(id).await?)
    }

    pub async fn add_participant(
        &self,
        requester: &User,
        id: LessonId,
        student: StudentId,
    ) -> Result<Lesson, AppError> {
        self.require_edit(requester, id).await?;
        Ok(self.store.add_participant(id, student).await?)
    }

    pub async fn remove_participant(
        &self,
        requester: &User,
        id: LessonId,
        student: StudentId,
    ) -> Result<Lesson, AppError> {
        self.require_edit(requester, id).await?;
        Ok(self.store.remove_participant(id, student).await?)
    }
}
