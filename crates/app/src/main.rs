use learn_core::model::{Course, CourseStatusMap, ProgressOverview, UserId};
use services::{AppServices, Clock};
use storage::supabase::SupabaseConfig;
use tracing::info;

mod args;

use args::{Args, ArgsError, Command, EnvDefaults, normalize_sqlite_url};

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [progress] --user <uuid> [--batched] [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- enroll       --user <uuid> --course <id>");
    eprintln!("  cargo run -p app -- set-progress --user <uuid> --course <id> --percent <0-100>");
    eprintln!("  cargo run -p app -- complete     --user <uuid> --course <id>");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_DB_URL, LEARN_USER_ID");
    eprintln!("  LEARN_SUPABASE_URL + LEARN_SUPABASE_KEY  use Supabase instead of SQLite");
    eprintln!("  RUST_LOG                                 log filter (default: info)");
}

fn print_progress(courses: &[Course], statuses: &CourseStatusMap) {
    for (index, course) in courses.iter().enumerate() {
        let status = statuses.status_or_locked(course.id());
        let marker = if status.is_completed {
            "[x]"
        } else if status.is_unlocked {
            "[ ]"
        } else {
            "[-]"
        };
        let note = match statuses.get(course.id()) {
            None => " (unavailable)",
            Some(s) if !s.is_unlocked => " (locked)",
            Some(_) => "",
        };
        println!(
            "{marker} {}. {} [{}] {}{note}",
            index + 1,
            course.title(),
            course.id(),
            status.progress
        );
    }

    let overview = ProgressOverview::from_statuses(courses, statuses);
    println!(
        "{}/{} completed, overall {}",
        overview.completed, overview.total, overview.overall
    );
    if let Some(next) = overview.next_course {
        println!("continue with: {next}");
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn build_services(db_url: &str) -> Result<AppServices, Box<dyn std::error::Error>> {
    let clock = Clock::default();
    if let Some(config) = SupabaseConfig::from_env() {
        info!(url = %config.base_url, "using supabase backend");
        return Ok(AppServices::new_supabase(config, clock));
    }

    let db_url = normalize_sqlite_url(db_url);
    prepare_sqlite_file(&db_url)?;
    info!(%db_url, "using sqlite backend");
    Ok(AppServices::new_sqlite(&db_url, clock).await?)
}

fn require_user(user: Option<UserId>) -> Result<UserId, ArgsError> {
    user.ok_or(ArgsError::MissingFlag { flag: "--user" })
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let parsed = Args::parse(argv, EnvDefaults::from_env()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let services = build_services(&parsed.db_url).await?;
    let courses = services.catalog().list_courses().await?;

    match parsed.command {
        Command::Progress { batched } => {
            // An absent user derives nothing; every course then prints as unavailable.
            let statuses = if batched {
                services.progress().derive_batched(parsed.user, &courses).await
            } else {
                services.progress().derive(parsed.user, &courses).await
            };
            print_progress(&courses, &statuses);
        }
        Command::Enroll { course } => {
            let user = require_user(parsed.user)?;
            let enrollment = services.enrollments().enroll(user, &courses, &course).await?;
            println!("enrolled in {} ({})", enrollment.course_id(), enrollment.progress());
        }
        Command::SetProgress { course, percent } => {
            let user = require_user(parsed.user)?;
            let enrollment = services
                .enrollments()
                .record_progress(user, &course, percent)
                .await?;
            println!("{} now at {}", enrollment.course_id(), enrollment.progress());
        }
        Command::Complete { course } => {
            let user = require_user(parsed.user)?;
            let enrollment = services.enrollments().complete(user, &course).await?;
            if let Some(at) = enrollment.completed_at() {
                println!("{} completed at {}", enrollment.course_id(), at.to_rfc3339());
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
