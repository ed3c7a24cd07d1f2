//! Typed list queries for students and lessons.
//!
//! List endpoints receive optional, independent string parameters. The
//! composers here turn them into a set of predicates (AND semantics) plus a
//! page selection; the entity store executes them, either by compiling them
//! to SQL or by evaluating them directly against in-memory records.
//!
//! Ordering is fixed per collection and is not part of the query:
//!
//! - students: last name, first name, id
//! - lessons: datetime descending, then id
//!
//! # Lesson date window
//!
//! - an explicit `end` wins: the window is `[start?, end]` and `range_length`
//!   is ignored entirely, including its validity;
//! - otherwise, if `start` or `range_length` is given, `start` defaults to now
//!   and the window is `[start, start + range_length days)`, with
//!   `range_length` defaulting to 7;
//! - otherwise there is no date restriction.

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

use tutordesk_core::params::{
    parse_date_param, parse_datetime_param, parse_flag_param, parse_int_param,
};
use tutordesk_core::{AppError, PageRequest};

use crate::ids::{LessonId, StudentId, UserId};
use crate::lessons::{Lesson, LessonQueryParams};
use crate::students::StudentQueryParams;

pub const DEFAULT_RANGE_DAYS: i64 = 7;

/// Participant-count class of a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSize {
    /// More than one participant.
    Group,
    /// Exactly one participant.
    Individual,
}

impl GroupSize {
    pub fn parse(name: &str, value: &str) -> Result<Self, AppError> {
        Ok(if parse_flag_param(name, value)? {
            GroupSize::Group
        } else {
            GroupSize::Individual
        })
    }

    pub fn matches(self, participant_count: usize) -> bool {
        match self {
            GroupSize::Group => participant_count > 1,
            GroupSize::Individual => participant_count == 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEnd {
    Inclusive(DateTime<Utc>),
    Exclusive(DateTime<Utc>),
}

/// A time window with an inclusive start and an inclusive or exclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<WindowEnd>,
}

impl DateWindow {
    /// `[start, end]` with either side open; `None` when both are open.
    pub fn between(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<Self> {
        if start.is_none() && end.is_none() {
            return None;
        }
        Some(Self {
            start,
            end: end.map(WindowEnd::Inclusive),
        })
    }

    /// Applies the lesson window policy to already parsed bounds.
    pub fn for_lessons(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        range_days: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, AppError> {
        if end.is_some() {
            return Ok(Self::between(start, end));
        }
        if start.is_none() && range_days.is_none() {
            return Ok(None);
        }

        let days = range_days.unwrap_or(DEFAULT_RANGE_DAYS);
        if days < 0 {
            return Err(AppError::bad_request(anyhow!(
                "Invalid range_length '{days}': must not be negative"
            )));
        }

        let start = start.unwrap_or(now);
        let end = TimeDelta::try_days(days)
            .and_then(|delta| start.checked_add_signed(delta))
            .ok_or_else(|| {
                AppError::bad_request(anyhow!("Invalid range_length '{days}': out of range"))
            })?;

        Ok(Some(Self {
            start: Some(start),
            end: Some(WindowEnd::Exclusive(end)),
        }))
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let after_start = self.start.is_none_or(|start| at >= start);
        let before_end = match self.end {
            None => true,
            Some(WindowEnd::Inclusive(end)) => at <= end,
            Some(WindowEnd::Exclusive(end)) => at < end,
        };
        after_start && before_end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentPredicate {
    /// Case-insensitive substring of first or last name.
    NameContains(String),
    /// Name of the latest status history entry.
    CurrentStatus(String),
    /// Name of the latest level history entry.
    CurrentLevel(String),
    /// At least one lesson inside the window.
    HasLessonWithin(DateWindow),
    /// At least one lesson of this size.
    HasLessonOfSize(GroupSize),
    StartedOnOrAfter(NaiveDate),
    ClassesPerWeek(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentQuery {
    pub predicates: Vec<StudentPredicate>,
    pub page: PageRequest,
}

impl StudentQuery {
    pub fn compose(params: &StudentQueryParams) -> Result<Self, AppError> {
        let mut predicates = Vec::new();

        if let Some(search) = &params.search {
            predicates.push(StudentPredicate::NameContains(search.clone()));
        }
        if let Some(status) = &params.status {
            predicates.push(StudentPredicate::CurrentStatus(status.clone()));
        }
        if let Some(level) = &params.level {
            predicates.push(StudentPredicate::CurrentLevel(level.clone()));
        }

        let lesson_start = params
            .lesson_start
            .as_deref()
            .map(|v| parse_datetime_param("lesson_start", v))
            .transpose()?;
        let lesson_end = params
            .lesson_end
            .as_deref()
            .map(|v| parse_datetime_param("lesson_end", v))
            .transpose()?;
        if let Some(window) = DateWindow::between(lesson_start, lesson_end) {
            predicates.push(StudentPredicate::HasLessonWithin(window));
        }

        if let Some(value) = &params.is_in_group {
            predicates.push(StudentPredicate::HasLessonOfSize(GroupSize::parse(
                "is_in_group",
                value,
            )?));
        }
        if let Some(value) = &params.started_after {
            predicates.push(StudentPredicate::StartedOnOrAfter(parse_date_param(
                "started_after",
                value,
            )?));
        }
        if let Some(value) = &params.classes_per_week {
            let count = parse_int_param("classes_per_week", value)?;
            let count = i32::try_from(count).map_err(|_| {
                AppError::bad_request(anyhow!("Invalid classes_per_week '{value}'"))
            })?;
            predicates.push(StudentPredicate::ClassesPerWeek(count));
        }

        Ok(Self {
            predicates,
            page: params.pagination().to_request(),
        })
    }
}

/// The set of lessons a query may draw from, resolved from access rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonScope {
    All,
    Only(Vec<LessonId>),
}

impl LessonScope {
    pub fn contains(&self, id: LessonId) -> bool {
        match self {
            LessonScope::All => true,
            LessonScope::Only(ids) => ids.contains(&id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonPredicate {
    HasStudent(StudentId),
    Within(DateWindow),
    Size(GroupSize),
}

impl LessonPredicate {
    pub fn matches(&self, lesson: &Lesson) -> bool {
        match self {
            LessonPredicate::HasStudent(id) => lesson.student_ids.contains(id),
            LessonPredicate::Within(window) => window.contains(lesson.datetime),
            LessonPredicate::Size(size) => size.matches(lesson.participant_count()),
        }
    }
}

/// Parsed lesson filters, before the visible-lesson scope is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonFilters {
    pub user_id: Option<UserId>,
    pub include_shared: bool,
    pub predicates: Vec<LessonPredicate>,
    pub page: Option<PageRequest>,
}

impl LessonFilters {
    pub fn compose(params: &LessonQueryParams, now: DateTime<Utc>) -> Result<Self, AppError> {
        let mut predicates = Vec::new();

        if let Some(student_id) = params.student_id {
            predicates.push(LessonPredicate::HasStudent(student_id));
        }

        let start = params
            .start
            .as_deref()
            .map(|v| parse_datetime_param("start", v))
            .transpose()?;
        let end = params
            .end
            .as_deref()
            .map(|v| parse_datetime_param("end", v))
            .transpose()?;
        let range_days = match (&end, params.range_length.as_deref()) {
            (Some(_), _) | (None, None) => None,
            (None, Some(value)) => Some(parse_int_param("range_length", value)?),
        };
        if let Some(window) = DateWindow::for_lessons(start, end, range_days, now)? {
            predicates.push(LessonPredicate::Within(window));
        }

        if let Some(value) = &params.group {
            predicates.push(LessonPredicate::Size(GroupSize::parse("group", value)?));
        }

        let include_shared = params
            .include_shared
            .as_deref()
            .map(|v| parse_flag_param("include_shared", v))
            .transpose()?
            .unwrap_or(true);

        let pagination = params.pagination();

        Ok(Self {
            user_id: params.user_id,
            include_shared,
            predicates,
            page: pagination
                .is_requested()
                .then(|| pagination.to_request()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonQuery {
    pub scope: LessonScope,
    pub predicates: Vec<LessonPredicate>,
    pub page: Option<PageRequest>,
}

impl LessonQuery {
    pub fn matches(&self, lesson: &Lesson) -> bool {
        self.scope.contains(lesson.id) && self.predicates.iter().all(|p| p.matches(lesson))
    }
}
