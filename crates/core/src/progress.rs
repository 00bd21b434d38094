use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Enrollment, Lesson, LessonId, LessonProgress};

//
// ─── CONSTANTS ─────────────────────────────────────────────────────────────────
//

/// An enrollment with no progress activity for longer than this is flagged
/// stale on the dashboard.
pub const STALE_AFTER_DAYS: i64 = 7;

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Derived progress state for one enrollment in one course.
///
/// Computed from already-fetched lesson and progress lists; the snapshot is a
/// pure value with no storage or subscription concepts. Inactive lessons are
/// filtered out and the remainder re-sorted by `order_index` here, so callers
/// cannot violate the input contract. Duplicate progress rows are tolerated:
/// any completed row marks its lesson complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    ordered_lesson_ids: Vec<LessonId>,
    completed_lesson_ids: BTreeSet<LessonId>,
    percentage: u8,
    resume_lesson_id: Option<LessonId>,
}

impl ProgressSnapshot {
    /// Derive the snapshot for one enrollment.
    ///
    /// `lessons` is the course's lesson list in any order; `progress` is the
    /// enrollment's progress rows. Both may be empty, and `progress` may
    /// reference lessons that have since been deleted or deactivated — the
    /// percentage only counts lessons still in the active list, which keeps
    /// it inside `0..=100`.
    #[must_use]
    pub fn compute(lessons: &[Lesson], progress: &[LessonProgress]) -> Self {
        let mut active: Vec<&Lesson> = lessons.iter().filter(|l| l.is_active()).collect();
        active.sort_by_key(|l| (l.order_index(), l.id()));
        let ordered_lesson_ids: Vec<LessonId> = active.iter().map(|l| l.id()).collect();
        let known: BTreeSet<LessonId> = ordered_lesson_ids.iter().copied().collect();

        // Every completed row counts here, including ids no longer in the
        // course; the resume rule needs the raw max so a completed-then-
        // deleted final lesson still falls back to the first lesson.
        let completed_any: BTreeSet<LessonId> = progress
            .iter()
            .filter(|row| row.is_completed())
            .map(LessonProgress::lesson_id)
            .collect();

        let completed_lesson_ids: BTreeSet<LessonId> =
            completed_any.intersection(&known).copied().collect();

        let percentage = percentage_of(completed_lesson_ids.len(), ordered_lesson_ids.len());
        let resume_lesson_id = resume_lesson(&ordered_lesson_ids, &completed_any);

        Self {
            ordered_lesson_ids,
            completed_lesson_ids,
            percentage,
            resume_lesson_id,
        }
    }

    /// Active lesson ids in presentation (`order_index`) order.
    #[must_use]
    pub fn ordered_lesson_ids(&self) -> &[LessonId] {
        &self.ordered_lesson_ids
    }

    #[must_use]
    pub fn completed_lesson_ids(&self) -> &BTreeSet<LessonId> {
        &self.completed_lesson_ids
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed_lesson_ids.len()
    }

    #[must_use]
    pub fn total_lessons(&self) -> usize {
        self.ordered_lesson_ids.len()
    }

    /// Completion percentage, rounded to the nearest integer.
    ///
    /// Exactly `0` when the course has no active lessons.
    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    #[must_use]
    pub fn is_lesson_completed(&self, lesson_id: LessonId) -> bool {
        self.completed_lesson_ids.contains(&lesson_id)
    }

    /// Where a returning learner should land.
    ///
    /// With no completed rows this is the first lesson by order; otherwise the
    /// first lesson (in order) whose id exceeds the highest completed lesson
    /// id, falling back to the first lesson when none remains. `None` only
    /// when the course has no active lessons. The choice is by id, not by
    /// completion timestamp.
    #[must_use]
    pub fn resume_lesson_id(&self) -> Option<LessonId> {
        self.resume_lesson_id
    }

    #[must_use]
    pub fn first_lesson_id(&self) -> Option<LessonId> {
        self.ordered_lesson_ids.first().copied()
    }

    /// The lesson following `lesson_id` in presentation order, if any.
    #[must_use]
    pub fn next_after(&self, lesson_id: LessonId) -> Option<LessonId> {
        let pos = self
            .ordered_lesson_ids
            .iter()
            .position(|id| *id == lesson_id)?;
        self.ordered_lesson_ids.get(pos + 1).copied()
    }

    /// True once every active lesson is completed (and at least one exists).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.ordered_lesson_ids.is_empty()
            && self.completed_lesson_ids.len() == self.ordered_lesson_ids.len()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percentage_of(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (completed as f64 * 100.0 / total as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

fn resume_lesson(ordered: &[LessonId], completed: &BTreeSet<LessonId>) -> Option<LessonId> {
    let first = ordered.first().copied()?;
    let Some(last_completed) = completed.iter().next_back().copied() else {
        return Some(first);
    };
    ordered
        .iter()
        .copied()
        .find(|id| *id > last_completed)
        .or(Some(first))
}

//
// ─── ENROLLMENT ACTIVITY ───────────────────────────────────────────────────────
//

/// Coarse dashboard flag for one enrollment, independent of the percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentActivity {
    /// Progress activity within the staleness window.
    Active,
    /// No progress rows (or enrollment itself) newer than [`STALE_AFTER_DAYS`].
    Stale,
    /// The enrollment-level `completed_at` badge is set.
    Completed,
}

/// Timestamp of the most recent completed progress row, if any.
#[must_use]
pub fn latest_progress_at(progress: &[LessonProgress]) -> Option<DateTime<Utc>> {
    progress.iter().filter_map(LessonProgress::completed_at).max()
}

/// Classify an enrollment for the dashboard.
///
/// `Completed` wins whenever the badge is set. Otherwise the enrollment is
/// `Stale` when the most recent progress timestamp (or the enrollment
/// timestamp, when no progress exists) is more than [`STALE_AFTER_DAYS`] days
/// before `now`; exactly seven days old is still `Active`.
#[must_use]
pub fn enrollment_activity(
    enrollment: &Enrollment,
    latest_progress: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> EnrollmentActivity {
    if enrollment.is_completed() {
        return EnrollmentActivity::Completed;
    }
    let last_seen = latest_progress.unwrap_or_else(|| enrollment.enrolled_at());
    if now - last_seen > Duration::days(STALE_AFTER_DAYS) {
        EnrollmentActivity::Stale
    } else {
        EnrollmentActivity::Active
    }
}

//
// ─── MODULE GROUPING ───────────────────────────────────────────────────────────
//

/// A fixed-size chunk of the course sequence for the syllabus view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonModule {
    /// 1-based module number.
    pub number: usize,
    pub lessons: Vec<Lesson>,
}

/// Group the active lessons, in presentation order, into modules of
/// `module_size` lessons each (the last module may be shorter).
///
/// `module_size == 0` yields a single module holding everything rather than
/// dividing by zero.
#[must_use]
pub fn group_into_modules(lessons: &[Lesson], module_size: usize) -> Vec<LessonModule> {
    let mut active: Vec<Lesson> = lessons.iter().filter(|l| l.is_active()).cloned().collect();
    active.sort_by_key(|l| (l.order_index(), l.id()));
    if active.is_empty() {
        return Vec::new();
    }
    let size = if module_size == 0 {
        active.len()
    } else {
        module_size
    };
    active
        .chunks(size)
        .enumerate()
        .map(|(i, chunk)| LessonModule {
            number: i + 1,
            lessons: chunk.to_vec(),
        })
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
