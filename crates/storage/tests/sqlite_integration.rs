use chrono::Duration;
use learn_core::model::{Course, CourseId, Enrollment, ProgressPercent, UserId};
use learn_core::time::fixed_now;
use storage::repository::{CourseRepository, EnrollmentRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn course(id: &str, title: &str, position: u32) -> Course {
    Course::new(CourseId::new(id).unwrap(), title, position).unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_lists_courses_in_position_order() {
    let repo = connect("memdb_courses").await;

    repo.upsert_course(&course("async", "Async Rust", 2)).await.unwrap();
    repo.upsert_course(&course("basics", "Rust Basics", 0)).await.unwrap();
    repo.upsert_course(&course("traits", "Traits", 1)).await.unwrap();
    // Re-upsert renames in place.
    repo.upsert_course(&course("traits", "Traits and Generics", 1))
        .await
        .unwrap();

    let courses = repo.list_courses().await.unwrap();
    let ids: Vec<&str> = courses.iter().map(|c| c.id().as_str()).collect();
    assert_eq!(ids, ["basics", "traits", "async"]);

    let traits = repo
        .get_course(&CourseId::new("traits").unwrap())
        .await
        .unwrap()
        .expect("course exists");
    assert_eq!(traits.title().as_str(), "Traits and Generics");
    assert!(
        repo.get_course(&CourseId::new("missing").unwrap())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn sqlite_roundtrips_enrollment_progress_and_completion() {
    let repo = connect("memdb_enrollments").await;
    let basics = course("basics", "Rust Basics", 0);
    repo.upsert_course(&basics).await.unwrap();

    let user = UserId::random();
    let mut enrollment = Enrollment::new(user, basics.id().clone(), fixed_now());
    enrollment.record_progress(ProgressPercent::new(45).unwrap());
    repo.upsert_enrollment(&enrollment).await.unwrap();

    let fetched = repo
        .get_enrollment(user, basics.id())
        .await
        .unwrap()
        .expect("enrollment exists");
    assert_eq!(fetched.progress().value(), 45);
    assert!(!fetched.is_completed());

    enrollment.mark_completed(fixed_now() + Duration::days(2)).unwrap();
    repo.upsert_enrollment(&enrollment).await.unwrap();

    let fetched = repo.get_enrollment(user, basics.id()).await.unwrap().unwrap();
    assert_eq!(fetched.completed_at(), Some(fixed_now() + Duration::days(2)));
    assert_eq!(fetched.progress(), ProgressPercent::COMPLETE);
    assert_eq!(fetched.enrolled_at(), fixed_now());

    assert!(
        repo.get_enrollment(UserId::random(), basics.id())
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(repo.list_enrollments(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sqlite_rejects_enrollment_for_unknown_course() {
    let repo = connect("memdb_fk").await;
    let enrollment = Enrollment::new(
        UserId::random(),
        CourseId::new("ghost").unwrap(),
        fixed_now(),
    );

    let err = repo.upsert_enrollment(&enrollment).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    assert!(repo.list_courses().await.unwrap().is_empty());
}
