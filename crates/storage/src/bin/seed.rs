use std::fmt;

use chrono::{DateTime, Duration, Utc};
use learn_core::model::{Course, CourseId, Enrollment, ProgressPercent, UserId};
use storage::repository::Storage;

const SAMPLE_COURSES: [(&str, &str); 5] = [
    ("rust-basics", "Rust Basics"),
    ("ownership", "Ownership and Borrowing"),
    ("traits", "Traits and Generics"),
    ("async", "Async Rust"),
    ("systems", "Systems Programming Project"),
];

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    courses: usize,
    user: Option<UserId>,
    completed: usize,
    progress: ProgressPercent,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidCourses { raw: String },
    InvalidUser { raw: String },
    InvalidCompleted { raw: String },
    InvalidProgress { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidCourses { raw } => {
                write!(f, "invalid --courses value (1..={}): {raw}", SAMPLE_COURSES.len())
            }
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value (expected UUID): {raw}"),
            ArgsError::InvalidCompleted { raw } => write!(f, "invalid --completed value: {raw}"),
            ArgsError::InvalidProgress { raw } => {
                write!(f, "invalid --progress value (0..=100): {raw}")
            }
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("LEARN_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut user = std::env::var("LEARN_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok());
        let mut courses = SAMPLE_COURSES.len();
        let mut completed = 0_usize;
        let mut progress = ProgressPercent::ZERO;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--courses" => {
                    let value = require_value(&mut args, "--courses")?;
                    courses = value
                        .parse::<usize>()
                        .ok()
                        .filter(|n| (1..=SAMPLE_COURSES.len()).contains(n))
                        .ok_or(ArgsError::InvalidCourses { raw: value.clone() })?;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidUser { raw: value.clone() })?,
                    );
                }
                "--completed" => {
                    let value = require_value(&mut args, "--completed")?;
                    completed = value
                        .parse::<usize>()
                        .map_err(|_| ArgsError::InvalidCompleted { raw: value.clone() })?;
                }
                "--progress" => {
                    let value = require_value(&mut args, "--progress")?;
                    progress = value
                        .parse::<i64>()
                        .ok()
                        .and_then(|n| ProgressPercent::new(n).ok())
                        .ok_or(ArgsError::InvalidProgress { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if completed > courses {
            return Err(ArgsError::InvalidCompleted {
                raw: completed.to_string(),
            });
        }

        Ok(Self {
            db_url,
            courses,
            user,
            completed,
            progress,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --courses <n>             Number of sample courses to upsert (default: 5)");
    eprintln!("  --user <uuid>             Also seed enrollments for this user");
    eprintln!("  --completed <n>           Courses the user has completed, in order (default: 0)");
    eprintln!("  --progress <0-100>        Progress on the first unfinished course (default: 0)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  LEARN_DB_URL, LEARN_USER_ID");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let mut sequence = Vec::with_capacity(args.courses);
    for (position, (id, title)) in (0_u32..).zip(SAMPLE_COURSES.iter().take(args.courses)) {
        let course = Course::new(CourseId::new(*id)?, *title, position)?;
        storage.courses.upsert_course(&course).await?;
        sequence.push(course);
    }

    if let Some(user) = args.user {
        let enrolled_at = now - Duration::days(30);
        for (index, course) in sequence.iter().enumerate().take(args.completed) {
            let mut enrollment = Enrollment::new(user, course.id().clone(), enrolled_at);
            let offset = i64::try_from(index).unwrap_or(0) + 1;
            enrollment.mark_completed(enrolled_at + Duration::days(offset))?;
            storage.enrollments.upsert_enrollment(&enrollment).await?;
        }
        if let Some(current) = sequence.get(args.completed) {
            let mut enrollment = Enrollment::new(user, current.id().clone(), now);
            enrollment.record_progress(args.progress);
            storage.enrollments.upsert_enrollment(&enrollment).await?;
        }
        println!(
            "Seeded {} courses into {} for user {user} ({} completed)",
            sequence.len(),
            args.db_url,
            args.completed
        );
    } else {
        println!("Seeded {} courses into {}", sequence.len(), args.db_url);
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
