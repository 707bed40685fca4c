use std::fmt;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use hifz_core::model::{
    HomeworkDraft, ReadingType, Schedule, ScheduleDraft, ScheduleId, ScheduleType, StudentId,
    TrackingDraft, VerseRange,
};
use hifz_services::{AppServices, Clock};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{FileConfig, resolve_db_url};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { command: &'static str, flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    InvalidDate { raw: String },
    ForeignSchedule { schedule_id: ScheduleId, student_id: StudentId },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { command, flag } => write!(f, "{command} requires {flag}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidDate { raw } => {
                write!(f, "invalid --today value (expected YYYY-MM-DD): {raw}")
            }
            ArgsError::ForeignSchedule {
                schedule_id,
                student_id,
            } => write!(f, "schedule {schedule_id} does not belong to student {student_id}"),
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

fn parse_id(args: &mut impl Iterator<Item = String>, flag: &'static str) -> Result<u64, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .parse::<u64>()
        .map_err(|_| ArgsError::InvalidId { flag, raw: value })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Progress,
    Activate,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "progress" => Some(Self::Progress),
            "activate" => Some(Self::Activate),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Activate => "activate",
            Self::Seed => "seed",
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    db_url: Option<String>,
    config_path: Option<PathBuf>,
    today: Option<NaiveDate>,
    student: Option<StudentId>,
    schedule: Option<ScheduleId>,
    all: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(normalize_sqlite_url(value));
                }
                "--config" => {
                    parsed.config_path = Some(PathBuf::from(require_value(args, "--config")?));
                }
                "--today" => {
                    let value = require_value(args, "--today")?;
                    let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                        .map_err(|_| ArgsError::InvalidDate { raw: value.clone() })?;
                    parsed.today = Some(date);
                }
                "--student" => {
                    parsed.student = Some(StudentId::new(parse_id(args, "--student")?));
                }
                "--schedule" => {
                    parsed.schedule = Some(ScheduleId::new(parse_id(args, "--schedule")?));
                }
                "--all" => parsed.all = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(parsed)
    }

    fn require_student(&self, command: Command) -> Result<StudentId, ArgsError> {
        self.student.ok_or(ArgsError::MissingFlag {
            command: command.name(),
            flag: "--student",
        })
    }

    fn require_schedule(&self, command: Command) -> Result<ScheduleId, ArgsError> {
        self.schedule.ok_or(ArgsError::MissingFlag {
            command: command.name(),
            flag: "--schedule",
        })
    }
}

fn ensure_owned(schedule: &Schedule, student_id: StudentId) -> Result<(), ArgsError> {
    if schedule.student_id() == student_id {
        Ok(())
    } else {
        Err(ArgsError::ForeignSchedule {
            schedule_id: schedule.id(),
            student_id,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  hifz progress --student <id> [--schedule <id> | --all] [--today YYYY-MM-DD]");
    eprintln!("  hifz activate --student <id> --schedule <id>");
    eprintln!("  hifz seed     [--student <id>]");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>    default sqlite://hifz.sqlite3");
    eprintln!("  --config <file.toml> engine settings under [engine]");
    eprintln!();
    eprintln!("Environment (.env is loaded if present):");
    eprintln!("  HIFZ_DB_URL, HIFZ_CONFIG, HIFZ_LOG");
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
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

fn init_logging() {
    let filter = EnvFilter::try_from_env("HIFZ_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the JSON output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_logging();

    let mut argv = std::env::args().skip(1);
    let cmd = match argv.next() {
        None => {
            print_usage();
            return Err(ArgsError::MissingValue { flag: "<command>" }.into());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            print_usage();
            ArgsError::UnknownArg(first.clone())
        })?,
    };

    let args = Args::parse(&mut argv).inspect_err(|_| print_usage())?;

    let config_path = args
        .config_path
        .clone()
        .or_else(|| dotenvy::var("HIFZ_CONFIG").ok().map(PathBuf::from));
    let file_config = match &config_path {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let db_url = resolve_db_url(
        args.db_url.clone(),
        dotenvy::var("HIFZ_DB_URL").ok().map(normalize_sqlite_url),
        file_config.database_url.clone().map(normalize_sqlite_url),
    );
    let clock = args.today.map_or_else(Clock::default_clock, Clock::fixed_on);

    prepare_sqlite_file(&db_url)?;
    let app = AppServices::new_sqlite(&db_url, clock, file_config.engine).await?;
    info!(command = cmd.name(), db = %db_url, "starting");

    match cmd {
        Command::Progress => {
            let student = args.require_student(cmd)?;
            let progress = app.progress();
            if args.all {
                print_json(&progress.progress_for_all(student).await?)
            } else if let Some(schedule_id) = args.schedule {
                let report = progress.progress_for_schedule(schedule_id).await?;
                ensure_owned(&report.schedule, student)?;
                print_json(&report)
            } else {
                print_json(&progress.progress_for_student(student).await?)
            }
        }
        Command::Activate => {
            let student = args.require_student(cmd)?;
            let schedule_id = args.require_schedule(cmd)?;
            app.schedules().activate(student, schedule_id).await?;
            print_json(&app.progress().progress_for_student(student).await?)
        }
        Command::Seed => {
            let student = args.student.unwrap_or_else(|| StudentId::new(1));
            seed(&app, clock, student).await?;
            print_json(&app.progress().progress_for_all(student).await?)
        }
    }
}

/// Demo data: an active Juz Amma plan with two weeks of entries, an older
/// inactive plan, and one homework assignment.
async fn seed(
    app: &AppServices,
    clock: Clock,
    student_id: StudentId,
) -> Result<(), Box<dyn std::error::Error>> {
    let today = clock.today();

    app.schedules()
        .create_schedule(ScheduleDraft {
            student_id,
            title: Some("Al-Mulk review plan".into()),
            schedule_type: ScheduleType::Weekly,
            pages_per_period: None,
            verses_per_period: Some(30.0),
            start_date: today - Duration::days(60),
            expected_completion_date: None,
            target_total_pages: None,
            is_active: false,
        })
        .await?;

    let active = app
        .schedules()
        .create_schedule(ScheduleDraft {
            student_id,
            title: Some("Juz Amma".into()),
            schedule_type: ScheduleType::Daily,
            pages_per_period: Some(1.0),
            verses_per_period: None,
            start_date: today - Duration::days(14),
            expected_completion_date: Some(today + Duration::days(16)),
            target_total_pages: Some(23),
            is_active: true,
        })
        .await?;

    // (surah, first verse, last verse, pages)
    let sessions: [(u16, u16, u16, i32); 6] = [
        (78, 1, 40, 2),
        (79, 1, 46, 2),
        (80, 1, 42, 1),
        (81, 1, 29, 1),
        (82, 1, 19, 1),
        (83, 1, 36, 2),
    ];
    let tracking = app.tracking();
    for (offset, (surah, from, to, pages)) in (0_i64..).zip(sessions) {
        tracking
            .record(TrackingDraft {
                student_id,
                schedule_id: Some(active.id()),
                date: today - Duration::days(13 - offset * 2),
                range: VerseRange::within(surah, from, to),
                reading_type: ReadingType::Memorize,
                pages_memorized: Some(pages),
                notes: None,
            })
            .await?;
    }
    tracking
        .record(TrackingDraft {
            student_id,
            schedule_id: None,
            date: today - Duration::days(1),
            range: VerseRange::within(67, 1, 30),
            reading_type: ReadingType::Revise,
            pages_memorized: None,
            notes: Some("smooth recitation".into()),
        })
        .await?;

    app.homework()
        .assign(HomeworkDraft {
            student_id,
            range: VerseRange::within(84, 1, 25),
            due_on: Some(today + Duration::days(3)),
            notes: None,
        })
        .await?;

    info!(%student_id, schedule_id = %active.id(), "seeded demo data");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(&mut iter)
    }

    #[test]
    fn parses_progress_flags() {
        let args = parse(&["--student", "4", "--schedule", "9", "--today", "2024-03-01"]).unwrap();
        assert_eq!(args.student, Some(StudentId::new(4)));
        assert_eq!(args.schedule, Some(ScheduleId::new(9)));
        assert_eq!(args.today, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert!(!args.all);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            parse(&["--student", "abc"]),
            Err(ArgsError::InvalidId { flag: "--student", .. })
        ));
        assert!(matches!(
            parse(&["--today", "01/03/2024"]),
            Err(ArgsError::InvalidDate { .. })
        ));
        assert!(matches!(
            parse(&["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(parse(&["--verbose"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn activate_requires_both_ids() {
        let args = parse(&["--student", "1"]).unwrap();
        assert!(args.require_student(Command::Activate).is_ok());
        let err = args.require_schedule(Command::Activate).unwrap_err();
        assert_eq!(err.to_string(), "activate requires --schedule");
    }

    #[test]
    fn schedule_must_belong_to_the_requested_student() {
        let schedule = ScheduleDraft {
            student_id: StudentId::new(2),
            title: None,
            schedule_type: ScheduleType::Daily,
            pages_per_period: Some(1.0),
            verses_per_period: None,
            start_date: hifz_core::time::fixed_today(),
            expected_completion_date: None,
            target_total_pages: None,
            is_active: true,
        }
        .validate(ScheduleId::new(7), hifz_core::time::fixed_now())
        .unwrap();

        assert!(ensure_owned(&schedule, StudentId::new(2)).is_ok());
        let err = ensure_owned(&schedule, StudentId::new(1)).unwrap_err();
        assert!(matches!(
            err,
            ArgsError::ForeignSchedule { schedule_id, student_id }
                if schedule_id == ScheduleId::new(7) && student_id == StudentId::new(1)
        ));
        assert_eq!(err.to_string(), "schedule 7 does not belong to student 1");
    }

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/hifz.db".into()),
            "sqlite:///tmp/hifz.db"
        );
        assert_eq!(normalize_sqlite_url("/tmp/hifz.db".into()), "sqlite:///tmp/hifz.db");
        assert_eq!(
            normalize_sqlite_url("sqlite:/tmp/hifz.db".into()),
            "sqlite:///tmp/hifz.db"
        );
    }

    #[test]
    fn commands_round_trip_names() {
        for cmd in [Command::Progress, Command::Activate, Command::Seed] {
            assert_eq!(Command::from_arg(cmd.name()), Some(cmd));
        }
        assert_eq!(Command::from_arg("ui"), None);
    }
}
