//! Sequential unlock rule.
//!
//! The first course of a sequence is always open. Every later course opens
//! once the course right before it has a completion timestamp; having no
//! enrollment there at all counts the same as an unfinished one.

use std::collections::{HashMap, HashSet};

use crate::model::{Course, CourseId, CourseStatus, CourseStatusMap, Enrollment, ProgressPercent};

/// Status of the course at `index`, given its own enrollment and the one of
/// the course right before it.
///
/// `previous` is ignored for `index == 0`.
#[must_use]
pub fn status_for(
    course_id: CourseId,
    index: usize,
    own: Option<&Enrollment>,
    previous: Option<&Enrollment>,
) -> CourseStatus {
    let is_unlocked = index == 0 || previous.is_some_and(Enrollment::is_completed);
    CourseStatus {
        course_id,
        is_unlocked,
        is_completed: own.is_some_and(Enrollment::is_completed),
        progress: own.map_or(ProgressPercent::ZERO, Enrollment::progress),
    }
}

/// Derives every status in one pass over an already-fetched enrollment set.
///
/// Carries only the previous course's completion flag forward. A course id
/// that repeats in `courses` keeps the status of its first occurrence.
#[must_use]
pub fn scan<'a, I>(courses: &[Course], enrollments: I) -> CourseStatusMap
where
    I: IntoIterator<Item = &'a Enrollment>,
{
    let by_course: HashMap<&CourseId, &Enrollment> = enrollments
        .into_iter()
        .map(|e| (e.course_id(), e))
        .collect();

    let mut seen = HashSet::new();
    let mut statuses = CourseStatusMap::new();
    let mut previous_completed = true;
    for course in courses {
        let own = by_course.get(course.id()).copied();
        let is_completed = own.is_some_and(Enrollment::is_completed);
        if seen.insert(course.id()) {
            statuses.insert(CourseStatus {
                course_id: course.id().clone(),
                is_unlocked: previous_completed,
                is_completed,
                progress: own.map_or(ProgressPercent::ZERO, Enrollment::progress),
            });
        }
        previous_completed = is_completed;
    }
    statuses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserId;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn course(raw: &str, position: u32) -> Course {
        Course::new(CourseId::new(raw).unwrap(), format!("Course {raw}"), position).unwrap()
    }

    fn sequence() -> Vec<Course> {
        vec![course("c1", 0), course("c2", 1), course("c3", 2)]
    }

    fn enrolled(user: UserId, raw: &str, progress: i64, completed: bool) -> Enrollment {
        let mut e = Enrollment::new(user, CourseId::new(raw).unwrap(), fixed_now());
        e.record_progress(ProgressPercent::new(progress).unwrap());
        if completed {
            e.mark_completed(fixed_now() + Duration::days(1)).unwrap();
        }
        e
    }

    /// Runs the per-course rule the way the concurrent deriver does.
    fn per_course(courses: &[Course], enrollments: &[Enrollment]) -> CourseStatusMap {
        let find = |c: &Course| enrollments.iter().find(|e| e.course_id() == c.id());
        courses
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let previous = i.checked_sub(1).and_then(|p| find(&courses[p]));
                status_for(c.id().clone(), i, find(c), previous)
            })
            .collect()
    }

    #[test]
    fn first_course_is_unlocked_without_enrollment() {
        let status = status_for(CourseId::new("c1").unwrap(), 0, None, None);
        assert!(status.is_unlocked);
        assert!(!status.is_completed);
        assert_eq!(status.progress, ProgressPercent::ZERO);
    }

    #[test]
    fn completion_is_read_regardless_of_unlock() {
        let user = UserId::random();
        let own = enrolled(user, "c3", 100, true);
        let status = status_for(CourseId::new("c3").unwrap(), 2, Some(&own), None);
        assert!(!status.is_unlocked);
        assert!(status.is_completed);
        assert_eq!(status.progress.value(), 100);
    }

    #[test]
    fn unfinished_previous_locks_like_missing_previous() {
        let user = UserId::random();
        let prev = enrolled(user, "c1", 90, false);
        let with_prev = status_for(CourseId::new("c2").unwrap(), 1, None, Some(&prev));
        let without_prev = status_for(CourseId::new("c2").unwrap(), 1, None, None);
        assert_eq!(with_prev, without_prev);
        assert!(!with_prev.is_unlocked);
    }

    #[test]
    fn scan_no_enrollments() {
        let courses = sequence();
        let map = scan(&courses, std::iter::empty());
        assert_eq!(map.len(), 3);
        assert!(map.is_unlocked(courses[0].id()));
        assert!(!map.is_unlocked(courses[1].id()));
        assert!(!map.is_unlocked(courses[2].id()));
    }

    #[test]
    fn scan_first_completed_opens_second_only() {
        let user = UserId::random();
        let courses = sequence();
        let enrollments = vec![enrolled(user, "c1", 100, true)];
        let map = scan(&courses, &enrollments);

        let c2 = map.status_or_locked(courses[1].id());
        assert!(c2.is_unlocked);
        assert!(!c2.is_completed);
        assert_eq!(c2.progress, ProgressPercent::ZERO);
        assert!(!map.is_unlocked(courses[2].id()));
    }

    #[test]
    fn scan_matches_per_course_rule() {
        let user = UserId::random();
        let courses = sequence();
        let fixtures = [
            vec![],
            vec![enrolled(user, "c1", 100, true)],
            vec![enrolled(user, "c1", 100, true), enrolled(user, "c2", 45, false)],
            vec![enrolled(user, "c2", 100, true)],
            vec![
                enrolled(user, "c1", 100, true),
                enrolled(user, "c2", 100, true),
                enrolled(user, "c3", 10, false),
            ],
        ];
        for enrollments in &fixtures {
            assert_eq!(scan(&courses, enrollments), per_course(&courses, enrollments));
        }
    }

    #[test]
    fn scan_follows_slice_order_not_position() {
        let user = UserId::random();
        let courses = vec![course("c2", 1), course("c1", 0)];
        let enrollments = vec![enrolled(user, "c2", 100, true)];
        let map = scan(&courses, &enrollments);
        assert!(map.is_unlocked(&CourseId::new("c1").unwrap()));
    }

    #[test]
    fn scan_keeps_first_occurrence_of_repeated_course() {
        let user = UserId::random();
        let courses = vec![course("c1", 0), course("c2", 1), course("c1", 0)];
        let enrollments = vec![enrolled(user, "c1", 100, true)];
        let map = scan(&courses, &enrollments);

        assert_eq!(map.len(), 2);
        let c1 = map.status_or_locked(courses[0].id());
        assert!(c1.is_unlocked && c1.is_completed);
        assert!(map.is_unlocked(courses[1].id()));
    }
}
