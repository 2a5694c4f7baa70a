use std::fmt;

use chrono::{DateTime, Utc};
use storage::repository::{Storage, StorageError};
use storage::sqlite::DEFAULT_DB_URL;
use study_core::StudyDate;
use study_core::model::{ExamDraft, SubjectName, TopicDraft, TopicId};
use study_core::scheduler::{Difficulty, Scheduler};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    topics: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
    InvalidTopics { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
            ArgsError::InvalidTopics { raw } => write!(f, "invalid --topics value: {raw}"),
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
            std::env::var("STUDY_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into());
        let mut topics = std::env::var("STUDY_SEED_TOPICS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(6);
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
                "--topics" => {
                    let value = require_value(&mut args, "--topics")?;
                    topics = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidTopics { raw: value.clone() })?;
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

        Ok(Self { db_url, topics, now })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL, created if missing (default: {DEFAULT_DB_URL})");
    eprintln!("  --topics <n>              Number of sample topics to insert (default: 6)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  STUDY_DB_URL, STUDY_SEED_TOPICS");
}

const SAMPLES: [(&str, &str, Option<(&str, &str)>); 6] = [
    ("Intégrales généralisées", "Maths", Some(("Critère de Riemann ?", "∫1^∞ 1/t^a converge ssi a > 1"))),
    ("Thermodynamique", "Physique", Some(("Premier principe ?", "ΔU = W + Q"))),
    ("Present perfect", "Anglais", None),
    ("Graphes et parcours", "Info", Some(("Complexité d'un BFS ?", "O(V + E)"))),
    ("Révolution française", "Histoire", None),
    ("Électrocinétique", "MHO", Some(("Loi des mailles ?", "Σ des tensions = 0"))),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let today = StudyDate::from_datetime(args.now.unwrap_or_else(Utc::now));
    let scheduler = Scheduler::new();

    let mut created: Vec<TopicId> = Vec::new();
    for i in 0..args.topics {
        let idx = (i as usize) % SAMPLES.len();
        let (title, subject, card) = SAMPLES[idx];
        let draft = if i % 3 == 2 {
            TopicDraft::library(title)
        } else {
            TopicDraft::active(title)
        };
        let mut topic = storage
            .topics
            .insert_new_topic(draft.with_subject(subject).validate(today)?)
            .await?;
        if let Some((question, answer)) = card {
            topic.add_flashcard(question, answer)?;
        }
        // spread the agenda: some topics already reviewed a few times
        for _ in 0..(i % 4) {
            let schedule = topic.plan_review(&scheduler, Difficulty::Easy, today)?;
            topic.apply_schedule(&schedule);
        }
        storage.topics.upsert_topic(&topic).await?;
        created.push(topic.id());
    }

    let exams = [
        ("Partiel de mi-semestre", 3_u32),
        ("Concours blanc", 21),
    ];
    for (title, in_days) in exams {
        let draft = ExamDraft::new(title, today.add_days(in_days)?, created.clone());
        storage.exams.insert_new_exam(draft.validate()?).await?;
    }

    for name in ["MHO", "CGE"] {
        match storage.subjects.insert_subject(&SubjectName::new(name)?).await {
            Ok(_) | Err(StorageError::Conflict) => {}
            Err(err) => return Err(err.into()),
        }
    }

    println!(
        "Seeded {} topics and {} exams into {}",
        created.len(),
        exams.len(),
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
