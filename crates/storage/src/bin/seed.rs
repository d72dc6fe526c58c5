use std::fmt;

use chrono::{DateTime, Duration, Utc};
use storage::repository::{Storage, StorageError};
use vidlearn_core::model::{ProgressSample, Student, StudentId, Video, VideoId};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    student_id: StudentId,
    student_name: String,
    student_email: String,
    days: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidStudentId { raw: String },
    InvalidDays { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidStudentId { raw } => write!(f, "invalid --student-id value: {raw}"),
            ArgsError::InvalidDays { raw } => write!(f, "invalid --days value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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
            std::env::var("VIDLEARN_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut student_id = std::env::var("VIDLEARN_STUDENT_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| StudentId::new(1), StudentId::new);
        let mut student_name =
            std::env::var("VIDLEARN_STUDENT_NAME").unwrap_or_else(|_| "Demo Student".into());
        let mut student_email = std::env::var("VIDLEARN_STUDENT_EMAIL")
            .unwrap_or_else(|_| "demo@vidlearn.dev".into());
        let mut days = std::env::var("VIDLEARN_DAYS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(3);
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
                "--student-id" => {
                    let value = require_value(&mut args, "--student-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidStudentId { raw: value.clone() })?;
                    student_id = StudentId::new(parsed);
                }
                "--student-name" => {
                    student_name = require_value(&mut args, "--student-name")?;
                }
                "--student-email" => {
                    student_email = require_value(&mut args, "--student-email")?;
                }
                "--days" => {
                    let value = require_value(&mut args, "--days")?;
                    days = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidDays { raw: value.clone() })?;
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

        Ok(Self {
            db_url,
            student_id,
            student_name,
            student_email,
            days,
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
    eprintln!("  --student-id <id>         Student id to seed (default: 1)");
    eprintln!("  --student-name <name>     Student name (default: Demo Student)");
    eprintln!("  --student-email <email>   Student email (default: demo@vidlearn.dev)");
    eprintln!("  --days <n>                Days of watch history to backfill (default: 3)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!(
        "  VIDLEARN_DB_URL, VIDLEARN_STUDENT_ID, VIDLEARN_STUDENT_NAME, VIDLEARN_STUDENT_EMAIL, VIDLEARN_DAYS"
    );
}

const SAMPLE_VIDEOS: [(&str, f64); 5] = [
    ("Rust Ownership Explained", 720.0),
    ("Rust Lifetimes in Practice", 840.0),
    ("Python Dataclasses Tour", 600.0),
    ("SQL Joins Crash Course", 540.0),
    ("Rust Error Handling Patterns", 660.0),
];

// Watched fraction cycles across days so charts show a mix of in-progress
// and completed videos.
const WATCH_FRACTIONS: [f64; 3] = [0.35, 0.6, 0.95];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    if storage.students.get_student(args.student_id).await?.is_none() {
        let student = Student::new(
            args.student_id,
            args.student_name.clone(),
            args.student_email.clone(),
            now,
        )?;
        storage.students.insert_student(&student).await?;
    }

    for (i, (title, duration)) in SAMPLE_VIDEOS.iter().enumerate() {
        let id = i as u64 + 1;
        let slug = title.to_lowercase().replace(' ', "-");
        let video = Video::new(
            VideoId::new(id),
            *title,
            None,
            format!("https://videos.example.com/{slug}"),
            Some(format!("https://videos.example.com/{slug}.jpg")),
            *duration,
            now - Duration::days(i as i64 + 1),
        )?;
        match storage.videos.insert_video(&video).await {
            Ok(()) | Err(StorageError::Conflict) => {}
            Err(e) => return Err(e.into()),
        }
    }

    // Oldest day first so reused videos end up with their newest timestamp.
    let mut recorded = 0_u32;
    for day in (0..args.days).rev() {
        let idx = (day as usize) % SAMPLE_VIDEOS.len();
        let (_, total) = SAMPLE_VIDEOS[idx];
        let fraction = WATCH_FRACTIONS[(day as usize) % WATCH_FRACTIONS.len()];
        let watched_at = now - Duration::days(i64::from(day));

        let sample = ProgressSample::new(
            args.student_id,
            VideoId::new(idx as u64 + 1),
            total * fraction,
            total,
        )?;
        let outcome = storage
            .watch_history
            .upsert_watch_record(&sample.into_record(watched_at))
            .await?;
        if outcome.created {
            storage
                .videos
                .increment_view_count(VideoId::new(idx as u64 + 1))
                .await?;
        }
        recorded += 1;
    }

    println!(
        "Seeded student {} with {} videos and {} days of watch history into {}",
        args.student_id.value(),
        SAMPLE_VIDEOS.len(),
        recorded,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
