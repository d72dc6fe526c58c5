use std::fmt;

use services::youtube::format_duration;
use services::{AppServices, Clock};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vidlearn_core::model::{ProgressSample, StudentId, VideoId};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidStudentId { raw: String },
    InvalidVideoId { raw: String },
    InvalidSeconds { flag: &'static str, raw: String },
    InvalidLimit { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(arg) => write!(f, "unknown command: {arg}"),
            ArgsError::InvalidStudentId { raw } => write!(f, "invalid --student value: {raw}"),
            ArgsError::InvalidVideoId { raw } => write!(f, "invalid --video value: {raw}"),
            ArgsError::InvalidSeconds { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Record,
    Resume,
    Stats,
    History,
    Videos,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "record" => Some(Self::Record),
            "resume" => Some(Self::Resume),
            "stats" => Some(Self::Stats),
            "history" => Some(Self::History),
            "videos" => Some(Self::Videos),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    student_id: StudentId,
    json: bool,
    limit: u32,
    video_id: Option<VideoId>,
    watched: Option<f64>,
    total: Option<f64>,
    completed: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("VIDLEARN_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut student_id = std::env::var("VIDLEARN_STUDENT_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| StudentId::new(1), StudentId::new);
        let mut json = false;
        let mut limit = 20;
        let mut video_id = None;
        let mut watched = None;
        let mut total = None;
        let mut completed = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--student" => {
                    let value = require_value(args, "--student")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidStudentId { raw: value.clone() })?;
                    student_id = StudentId::new(parsed);
                }
                "--video" => {
                    let value = require_value(args, "--video")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidVideoId { raw: value.clone() })?;
                    video_id = Some(VideoId::new(parsed));
                }
                "--watched" => {
                    let value = require_value(args, "--watched")?;
                    let parsed: f64 = value.parse().map_err(|_| ArgsError::InvalidSeconds {
                        flag: "--watched",
                        raw: value.clone(),
                    })?;
                    watched = Some(parsed);
                }
                "--total" => {
                    let value = require_value(args, "--total")?;
                    let parsed: f64 = value.parse().map_err(|_| ArgsError::InvalidSeconds {
                        flag: "--total",
                        raw: value.clone(),
                    })?;
                    total = Some(parsed);
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    limit = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                }
                "--completed" => completed = true,
                "--json" => json = true,
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
            json,
            limit,
            video_id,
            watched,
            total,
            completed,
        })
    }

    fn record_input(&self) -> Result<(VideoId, f64, f64), ArgsError> {
        let video_id = self.video_id.ok_or(ArgsError::MissingFlag { flag: "--video" })?;
        let watched = self.watched.ok_or(ArgsError::MissingFlag { flag: "--watched" })?;
        let total = self.total.ok_or(ArgsError::MissingFlag { flag: "--total" })?;
        Ok((video_id, watched, total))
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- record --video <id> --watched <secs> --total <secs> [--completed]");
    eprintln!("  cargo run -p app -- resume  [--json]");
    eprintln!("  cargo run -p app -- stats   [--json]");
    eprintln!("  cargo run -p app -- history [--json]");
    eprintln!("  cargo run -p app -- videos  [--limit <n>]");
    eprintln!();
    eprintln!("Common flags: --student <id>, --db <sqlite_url>");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!("  --student 1");
    eprintln!("  --limit 20");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VIDLEARN_DB_URL, VIDLEARN_STUDENT_ID");
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.contains("mode=memory") || raw.starts_with("sqlite://") {
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
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
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

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            print_usage();
            ArgsError::UnknownCommand(first.to_string())
        })?,
    };
    argv.remove(0);

    let mut iter = argv.into_iter();
    let args = Args::parse(&mut iter).map_err(|e| {
        print_usage();
        e
    })?;

    // Open + migrate SQLite in the binary glue so core and services stay pure.
    let db_url = normalize_sqlite_url(args.db_url.clone());
    prepare_sqlite_file(&db_url)?;
    let services =
        AppServices::new_sqlite(&db_url, Clock::default_clock(), args.student_id).await?;
    if services.registered_student() {
        tracing::info!("registered demo student {}", services.student_id());
    }
    let student_id = services.student_id();

    match cmd {
        Command::Record => {
            let (video_id, watched, total) = args.record_input().map_err(|e| {
                print_usage();
                e
            })?;
            let sample = ProgressSample::new(student_id, video_id, watched, total)?
                .with_completed(args.completed);
            let saved = services.progress().record_progress(sample).await?;
            let verb = if saved.created { "created" } else { "updated" };
            let state = if saved.record.completed() {
                ", completed"
            } else {
                ""
            };
            println!(
                "{verb} watch record: video {video_id} at {:.1}%{state}",
                saved.record.progress_percent()
            );
        }
        Command::Resume => {
            let target = services.resume().find_resume_point(student_id).await?;
            if args.json {
                match &target {
                    Some(target) => println!("{}", serde_json::to_string_pretty(target)?),
                    None => println!("{}", serde_json::json!({ "videoId": null })),
                }
            } else {
                match target {
                    Some(target) => println!(
                        "resume video {}: {} at {:.1}% ({} of {})",
                        target.video_id,
                        target.video_title,
                        target.progress_percent,
                        format_duration(target.duration_watched),
                        format_duration(target.total_duration),
                    ),
                    None => println!("nothing to resume"),
                }
            }
        }
        Command::Stats => {
            let report = services.analytics().compute_analytics(student_id).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!("study stats for student {student_id}:");
            println!("  watch time:     {} min", report.stats.total_minutes);
            println!("  completed:      {} videos", report.stats.videos_completed);
            println!("  current streak: {} days", report.stats.current_streak_days);
            println!(
                "  avg completion: {}%",
                report.stats.average_completion_percent
            );
            println!();
            println!("last 7 days:");
            for day in &report.week_data {
                println!("  {:<4} {:>4} min", day.day, day.minutes);
            }
            if !report.category_data.is_empty() {
                println!();
                println!("top categories:");
                for category in &report.category_data {
                    println!(
                        "  {:<16} {:>2} videos, {:>3}% completion",
                        category.name, category.count, category.completion_percent
                    );
                }
            }
        }
        Command::History => {
            let entries = services.analytics().watch_history(student_id).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            if entries.is_empty() {
                println!("no watch history");
                return Ok(());
            }
            for entry in &entries {
                let mark = if entry.completed { "done" } else { "    " };
                println!(
                    "  [{mark}] {}  {:<36} {:>5.1}%  ({} / {})",
                    entry.watched_at.format("%Y-%m-%d %H:%M"),
                    entry.video_title,
                    entry.progress_percent,
                    format_duration(entry.duration_watched),
                    format_duration(entry.total_duration),
                );
            }
        }
        Command::Videos => {
            let videos = services.catalog().list_videos(args.limit).await?;
            if videos.is_empty() {
                println!("catalogue is empty");
                return Ok(());
            }
            for video in &videos {
                println!(
                    "  {:>4}  {:<36} {:>8}  {:>6} views  uploaded {}",
                    video.id(),
                    video.title(),
                    format_duration(video.duration_seconds()),
                    video.views(),
                    video.uploaded_at().format("%Y-%m-%d"),
                );
            }
        }
    }

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
