use std::fmt;

use learn_core::model::{CourseId, ProgressPercent, UserId};

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidUser { raw: String },
    InvalidCourse { raw: String },
    InvalidPercent { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required for this command"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value (expected UUID): {raw}"),
            ArgsError::InvalidCourse { raw } => write!(f, "invalid --course value: {raw:?}"),
            ArgsError::InvalidPercent { raw } => {
                write!(f, "invalid --percent value (0..=100): {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print every course with its derived status.
    Progress { batched: bool },
    Enroll { course: CourseId },
    SetProgress { course: CourseId, percent: ProgressPercent },
    Complete { course: CourseId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub db_url: String,
    pub user: Option<UserId>,
    pub command: Command,
}

/// Values taken from the environment before flags override them.
#[derive(Debug, Clone, Default)]
pub struct EnvDefaults {
    pub db_url: Option<String>,
    pub user: Option<String>,
}

impl EnvDefaults {
    pub fn from_env() -> Self {
        Self {
            db_url: std::env::var("LEARN_DB_URL").ok(),
            user: std::env::var("LEARN_USER_ID").ok(),
        }
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_user(raw: String) -> Result<UserId, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidUser { raw })
}

impl Args {
    /// Parses `argv` (without the program name). No subcommand means `progress`.
    pub fn parse(
        argv: impl IntoIterator<Item = String>,
        env: EnvDefaults,
    ) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter().peekable();

        let name = args.next_if(|first| !first.starts_with('-'));

        let mut db_url = env.db_url.unwrap_or_else(|| "sqlite:dev.sqlite3".into());
        let mut user = env.user.map(parse_user).transpose()?;
        let mut course: Option<CourseId> = None;
        let mut percent: Option<ProgressPercent> = None;
        let mut batched = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user" => user = Some(parse_user(require_value(&mut args, "--user")?)?),
                "--course" => {
                    let value = require_value(&mut args, "--course")?;
                    course = Some(
                        CourseId::new(value.clone())
                            .map_err(|_| ArgsError::InvalidCourse { raw: value })?,
                    );
                }
                "--percent" => {
                    let value = require_value(&mut args, "--percent")?;
                    percent = Some(
                        value
                            .parse::<i64>()
                            .ok()
                            .and_then(|n| ProgressPercent::new(n).ok())
                            .ok_or(ArgsError::InvalidPercent { raw: value })?,
                    );
                }
                "--batched" => batched = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let require_course = || course.clone().ok_or(ArgsError::MissingFlag { flag: "--course" });
        let command = match name.as_deref() {
            None | Some("progress") => Command::Progress { batched },
            Some("enroll") => Command::Enroll { course: require_course()? },
            Some("set-progress") => Command::SetProgress {
                course: require_course()?,
                percent: percent.ok_or(ArgsError::MissingFlag { flag: "--percent" })?,
            },
            Some("complete") => Command::Complete { course: require_course()? },
            Some(other) => return Err(ArgsError::UnknownCommand(other.to_string())),
        };

        Ok(Self {
            db_url,
            user,
            command,
        })
    }
}

/// Turns a bare path or `sqlite:` path into an absolute `sqlite://` URL.
pub fn normalize_sqlite_url(raw: &str) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw.to_string();
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "6f1c2f8e-4b7a-4d8e-9b1c-2a3d4e5f6a7b";

    fn parse(argv: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(argv.iter().map(|s| (*s).to_string()), EnvDefaults::default())
    }

    #[test]
    fn defaults_to_progress() {
        let args = parse(&["--user", USER]).unwrap();
        assert_eq!(args.command, Command::Progress { batched: false });
        assert_eq!(args.db_url, "sqlite:dev.sqlite3");
        assert_eq!(args.user, Some(USER.parse().unwrap()));
    }

    #[test]
    fn set_progress_needs_course_and_percent() {
        let args = parse(&["set-progress", "--course", "c2", "--percent", "45"]).unwrap();
        assert_eq!(
            args.command,
            Command::SetProgress {
                course: CourseId::new("c2").unwrap(),
                percent: ProgressPercent::new(45).unwrap(),
            }
        );
        assert_eq!(
            parse(&["set-progress", "--course", "c2"]),
            Err(ArgsError::MissingFlag { flag: "--percent" })
        );
        assert_eq!(
            parse(&["complete"]),
            Err(ArgsError::MissingFlag { flag: "--course" })
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            parse(&["--user", "bob"]),
            Err(ArgsError::InvalidUser { .. })
        ));
        assert!(matches!(
            parse(&["set-progress", "--course", "c1", "--percent", "120"]),
            Err(ArgsError::InvalidPercent { .. })
        ));
        assert_eq!(
            parse(&["launch"]),
            Err(ArgsError::UnknownCommand("launch".into()))
        );
    }

    #[test]
    fn flags_override_environment() {
        let env = EnvDefaults {
            db_url: Some("sqlite:env.sqlite3".into()),
            user: Some(USER.into()),
        };
        let args = Args::parse(
            ["progress", "--db", "sqlite:flag.sqlite3", "--batched"].map(String::from),
            env,
        )
        .unwrap();
        assert_eq!(args.db_url, "sqlite:flag.sqlite3");
        assert_eq!(args.command, Command::Progress { batched: true });
        assert!(args.user.is_some());
    }

    #[test]
    fn normalizes_relative_sqlite_paths() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(normalize_sqlite_url("sqlite:///tmp/x.db"), "sqlite:///tmp/x.db");
        assert!(normalize_sqlite_url("sqlite:dev.sqlite3").starts_with("sqlite:///"));
    }
}
