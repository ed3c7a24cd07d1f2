//! Compiles typed query predicates into SQL `WHERE` fragments.
//!
//! Every fragment is appended as ` AND ...` after a `WHERE TRUE` base, with all
//! values bound as parameters. The same function feeds both the `COUNT(*)`
//! and the page query so totals and items always agree.

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use tutordesk_models::query::{
    DateWindow, GroupSize, LessonPredicate, LessonScope, StudentPredicate, WindowEnd,
};
use tutordesk_models::quiz_results::QuizResultFilter;

/// Students are aliased `st`.
pub(crate) const CURRENT_STATUS_SQL: &str = "(SELECT ss.name FROM student_status_history sh \
     JOIN student_statuses ss ON ss.id = sh.status_id \
     WHERE sh.student_id = st.id ORDER BY sh.changed_at DESC, sh.seq DESC LIMIT 1)";

pub(crate) const CURRENT_LEVEL_SQL: &str = "(SELECT lv.name FROM student_level_history lh \
     JOIN levels lv ON lv.id = lh.level_id \
     WHERE lh.student_id = st.id ORDER BY lh.changed_at DESC, lh.seq DESC LIMIT 1)";

/// Escapes `LIKE` wildcards so user input only ever matches literally.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_window(qb: &mut QueryBuilder<'_, Postgres>, column: &str, window: &DateWindow) {
    if let Some(start) = window.start {
        qb.push(format!(" AND {column} >= ")).push_bind(start);
    }
    match window.end {
        Some(WindowEnd::Inclusive(end)) => {
            qb.push(format!(" AND {column} <= ")).push_bind(end);
        }
        Some(WindowEnd::Exclusive(end)) => {
            qb.push(format!(" AND {column} < ")).push_bind(end);
        }
        None => {}
    }
}

fn size_comparison(size: GroupSize) -> &'static str {
    match size {
        GroupSize::Group => " > 1",
        GroupSize::Individual => " = 1",
    }
}

/// Lessons are aliased `l`.
pub(crate) fn push_lesson_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    scope: &LessonScope,
    predicates: &[LessonPredicate],
) {
    if let LessonScope::Only(ids) = scope {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        qb.push(" AND l.id = ANY(").push_bind(ids).push(")");
    }

    for predicate in predicates {
        match predicate {
            LessonPredicate::HasStudent(student) => {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM lesson_students ls \
                     WHERE ls.lesson_id = l.id AND ls.student_id = ",
                )
                .push_bind(*student)
                .push(")");
            }
            LessonPredicate::Within(window) => push_window(qb, "l.datetime", window),
            LessonPredicate::Size(size) => {
                qb.push(
                    " AND (SELECT COUNT(*) FROM lesson_students ls WHERE ls.lesson_id = l.id)",
                )
                .push(size_comparison(*size));
            }
        }
    }
}

pub(crate) fn push_student_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    predicates: &[StudentPredicate],
) {
    for predicate in predicates {
        match predicate {
            StudentPredicate::NameContains(needle) => {
                let pattern = like_pattern(needle);
                qb.push(" AND (st.first_name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR st.last_name ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
            StudentPredicate::CurrentStatus(name) => {
                qb.push(format!(" AND {CURRENT_STATUS_SQL} = "))
                    .push_bind(name.clone());
            }
            StudentPredicate::CurrentLevel(name) => {
                qb.push(format!(" AND {CURRENT_LEVEL_SQL} = "))
                    .push_bind(name.clone());
            }
            StudentPredicate::HasLessonWithin(window) => {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM lesson_students ls \
                     JOIN lessons l ON l.id = ls.lesson_id WHERE ls.student_id = st.id",
                );
                push_window(qb, "l.datetime", window);
                qb.push(")");
            }
            StudentPredicate::HasLessonOfSize(size) => {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM lesson_students ls WHERE ls.student_id = st.id \
                     AND (SELECT COUNT(*) FROM lesson_students o WHERE o.lesson_id = ls.lesson_id)",
                )
                .push(size_comparison(*size))
                .push(")");
            }
            StudentPredicate::StartedOnOrAfter(date) => {
                qb.push(" AND st.date_started >= ").push_bind(*date);
            }
            StudentPredicate::ClassesPerWeek(count) => {
                qb.push(" AND st.classes_per_week = ").push_bind(*count);
            }
        }
    }
}

/// Quiz results are aliased `q`.
pub(crate) fn push_quiz_result_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    filter: &QuizResultFilter,
) {
    if let LessonScope::Only(ids) = &filter.scope {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        qb.push(" AND q.lesson_id = ANY(").push_bind(ids).push(")");
    }
    if let Some(student) = filter.student_id {
        qb.push(" AND q.student_id = ").push_bind(student);
    }
    if let Some(lesson) = filter.lesson_id {
        qb.push(" AND q.lesson_id = ").push_bind(lesson);
    }
    if let Some(quiz) = filter.quiz_id {
        qb.push(" AND q.quiz_id = ").push_bind(quiz);
    }
}
