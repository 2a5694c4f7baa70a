use std::fmt;
use std::path::{Path, PathBuf};

use study_core::StudyDate;
use study_core::library::{LibraryFilter, SubjectFilter};
use study_core::model::{ExamId, FlashcardId, TopicDraft, TopicEdit, TopicId, UserId};
use study_core::scheduler::{Difficulty, IntervalTable};

pub use storage::sqlite::DEFAULT_DB_URL;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArg { what: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidId { raw: String },
    InvalidUser { raw: String },
    InvalidDifficulty { raw: String },
    InvalidDate { raw: String },
    InvalidIntervals { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArg { what } => write!(f, "missing {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidId { raw } => write!(f, "invalid id: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value (expected UUID): {raw}"),
            ArgsError::InvalidDifficulty { raw } => {
                write!(f, "invalid difficulty (expected easy or hard): {raw}")
            }
            ArgsError::InvalidDate { raw } => write!(f, "invalid date (expected YYYY-MM-DD): {raw}"),
            ArgsError::InvalidIntervals { raw } => write!(
                f,
                "invalid --intervals value (expected positive days, e.g. 2,7,14,30): {raw}"
            ),
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

fn require_arg(
    args: &mut impl Iterator<Item = String>,
    what: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingArg { what })
}

fn parse_id<T: std::str::FromStr>(raw: String) -> Result<T, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidId { raw })
}

fn parse_difficulty(raw: String) -> Result<Difficulty, ArgsError> {
    raw.parse()
        .map_err(|_| ArgsError::InvalidDifficulty { raw })
}

fn parse_date(raw: String) -> Result<StudyDate, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidDate { raw })
}

fn parse_intervals(raw: &str) -> Result<IntervalTable, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidIntervals {
        raw: raw.to_string(),
    })
}

fn parse_user(raw: String) -> Result<UserId, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidUser { raw })
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

/// Fields for a new topic, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicArgs {
    pub title: String,
    pub active: bool,
    pub subject: Option<String>,
    pub course_link: Option<String>,
    pub exercise_link: Option<String>,
}

impl TopicArgs {
    #[must_use]
    pub fn into_draft(self) -> TopicDraft {
        let mut draft = if self.active {
            TopicDraft::active(self.title)
        } else {
            TopicDraft::library(self.title)
        };
        if let Some(subject) = self.subject {
            draft = draft.with_subject(subject);
        }
        if let Some(link) = self.course_link {
            draft = draft.with_course_link(link);
        }
        if let Some(link) = self.exercise_link {
            draft = draft.with_exercise_link(link);
        }
        draft
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(TopicArgs),
    Review { id: TopicId, difficulty: Difficulty },
    Study { id: TopicId, finish: Option<Difficulty> },
    Topics,
    Due,
    Agenda,
    Library(LibraryFilter),
    Edit { id: TopicId, edit: TopicEdit },
    Toggle { id: TopicId },
    Delete { id: TopicId },
    CardAdd { id: TopicId, question: String, answer: String },
    CardRemove { id: TopicId, card: FlashcardId },
    Streak,
    Exams,
    ExamAdd { title: String, date: StudyDate, topics: Vec<TopicId> },
    ExamTopics { id: ExamId },
    ExamDelete { id: ExamId },
    Subjects,
    SubjectAdd { name: String },
    SubjectDelete { name: String },
}

fn parse_topic_args(
    title: String,
    active: bool,
    args: &mut impl Iterator<Item = String>,
) -> Result<TopicArgs, ArgsError> {
    let mut topic = TopicArgs {
        title,
        active,
        subject: None,
        course_link: None,
        exercise_link: None,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--subject" => topic.subject = Some(require_value(args, "--subject")?),
            "--course" => topic.course_link = Some(require_value(args, "--course")?),
            "--exercise" => topic.exercise_link = Some(require_value(args, "--exercise")?),
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(topic)
}

/// Empty values clear an optional field.
fn optional(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

fn parse_edit(args: &mut impl Iterator<Item = String>) -> Result<TopicEdit, ArgsError> {
    let mut edit = TopicEdit::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--title" => edit.title = Some(require_value(args, "--title")?),
            "--subject" => edit.subject = Some(optional(require_value(args, "--subject")?)),
            "--course" => edit.course_link = Some(optional(require_value(args, "--course")?)),
            "--exercise" => {
                edit.exercise_link = Some(optional(require_value(args, "--exercise")?));
            }
            "--active" => edit.is_active = Some(true),
            "--library" => edit.is_active = Some(false),
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(edit)
}

fn parse_library(args: &mut impl Iterator<Item = String>) -> Result<LibraryFilter, ArgsError> {
    let mut filter = LibraryFilter::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--subject" => filter.subject = SubjectFilter::parse(&require_value(args, "--subject")?),
            "--search" => filter.search = require_value(args, "--search")?,
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(filter)
}

fn no_more(args: &mut impl Iterator<Item = String>) -> Result<(), ArgsError> {
    match args.next() {
        Some(extra) => Err(ArgsError::UnknownArg(extra)),
        None => Ok(()),
    }
}

impl Command {
    fn parse(name: &str, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let command = match name {
            "add" => Command::Add(parse_topic_args(require_arg(args, "topic title")?, true, args)?),
            "library-add" => {
                Command::Add(parse_topic_args(require_arg(args, "topic title")?, false, args)?)
            }
            "review" => Command::Review {
                id: parse_id(require_arg(args, "topic id")?)?,
                difficulty: parse_difficulty(require_arg(args, "difficulty")?)?,
            },
            "study" => Command::Study {
                id: parse_id(require_arg(args, "topic id")?)?,
                finish: args.next().map(parse_difficulty).transpose()?,
            },
            "topics" => Command::Topics,
            "due" => Command::Due,
            "agenda" => Command::Agenda,
            "library" => return Ok(Command::Library(parse_library(args)?)),
            "edit" => {
                let id = parse_id(require_arg(args, "topic id")?)?;
                return Ok(Command::Edit {
                    id,
                    edit: parse_edit(args)?,
                });
            }
            "toggle" => Command::Toggle {
                id: parse_id(require_arg(args, "topic id")?)?,
            },
            "delete" => Command::Delete {
                id: parse_id(require_arg(args, "topic id")?)?,
            },
            "card-add" => Command::CardAdd {
                id: parse_id(require_arg(args, "topic id")?)?,
                question: require_arg(args, "question")?,
                answer: require_arg(args, "answer")?,
            },
            "card-remove" => Command::CardRemove {
                id: parse_id(require_arg(args, "topic id")?)?,
                card: parse_id(require_arg(args, "flashcard id")?)?,
            },
            "streak" => Command::Streak,
            "exams" => Command::Exams,
            "exam-add" => {
                let title = require_arg(args, "exam title")?;
                let date = parse_date(require_arg(args, "exam date")?)?;
                let topics = args.map(parse_id).collect::<Result<Vec<_>, _>>()?;
                return Ok(Command::ExamAdd {
                    title,
                    date,
                    topics,
                });
            }
            "exam-topics" => Command::ExamTopics {
                id: parse_id(require_arg(args, "exam id")?)?,
            },
            "exam-delete" => Command::ExamDelete {
                id: parse_id(require_arg(args, "exam id")?)?,
            },
            "subjects" => Command::Subjects,
            "subject-add" => Command::SubjectAdd {
                name: require_arg(args, "subject name")?,
            },
            "subject-delete" => Command::SubjectDelete {
                name: require_arg(args, "subject name")?,
            },
            _ => return Err(ArgsError::UnknownCommand(name.to_string())),
        };
        no_more(args)?;
        Ok(command)
    }
}

//
// ─── ARGS ──────────────────────────────────────────────────────────────────────
//

/// Global options plus the command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub db_url: String,
    pub user: Option<UserId>,
    pub intervals: Option<IntervalTable>,
    pub verbose: bool,
    pub command: Option<Command>,
}

/// Environment fallbacks for the global options.
#[derive(Debug, Clone, Default)]
pub struct Env {
    pub db_url: Option<String>,
    pub user: Option<String>,
    pub intervals: Option<String>,
}

impl Env {
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            db_url: std::env::var("STUDY_DB_URL").ok(),
            user: std::env::var("STUDY_USER_ID").ok(),
            intervals: std::env::var("STUDY_INTERVALS").ok(),
        }
    }
}

impl Args {
    /// Parse global flags, then a command and its arguments.
    ///
    /// `command` is `None` when help was requested.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown flags or commands and malformed values.
    pub fn parse(argv: impl IntoIterator<Item = String>, env: Env) -> Result<Self, ArgsError> {
        let mut db_url = env
            .db_url
            .map_or_else(|| DEFAULT_DB_URL.to_string(), normalize_sqlite_url);
        let mut user = env.user.map(parse_user).transpose()?;
        let mut intervals = env.intervals.as_deref().map(parse_intervals).transpose()?;
        let mut verbose = false;

        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => user = Some(parse_user(require_value(&mut args, "--user")?)?),
                "--intervals" => {
                    intervals = Some(parse_intervals(&require_value(&mut args, "--intervals")?)?);
                }
                "--verbose" | "-v" => verbose = true,
                "--help" | "-h" => {
                    return Ok(Self {
                        db_url,
                        user,
                        intervals,
                        verbose,
                        command: None,
                    });
                }
                _ if arg.starts_with('-') => return Err(ArgsError::UnknownArg(arg)),
                _ => {
                    let command = Command::parse(&arg, &mut args)?;
                    return Ok(Self {
                        db_url,
                        user,
                        intervals,
                        verbose,
                        command: Some(command),
                    });
                }
            }
        }

        // no command: show the agenda
        Ok(Self {
            db_url,
            user,
            intervals,
            verbose,
            command: Some(Command::Agenda),
        })
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  study [options] <command> [args]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>          Database (default: {DEFAULT_DB_URL})");
    eprintln!("  --user <uuid>              Signed-in user, enables the streak");
    eprintln!("  --intervals <d,d,...>      Easy-review offsets per stage (default: 2,7,14,30)");
    eprintln!("  -v, --verbose              Debug logging");
    eprintln!();
    eprintln!("Topics:");
    eprintln!("  add <title> [--subject S] [--course URL] [--exercise URL]");
    eprintln!("  library-add <title> [--subject S] [--course URL] [--exercise URL]");
    eprintln!("  review <id> easy|hard");
    eprintln!("  study <id> [easy|hard]     Walk the topic's cards, optionally finish the session");
    eprintln!("  topics | due | agenda");
    eprintln!("  library [--subject S] [--search Q]");
    eprintln!("  edit <id> [--title T] [--subject S] [--course URL] [--exercise URL] [--active|--library]");
    eprintln!("  toggle <id> | delete <id>");
    eprintln!("  card-add <id> <question> <answer> | card-remove <id> <card-id>");
    eprintln!();
    eprintln!("Exams and subjects:");
    eprintln!("  exams | exam-add <title> <YYYY-MM-DD> [topic ids...]");
    eprintln!("  exam-topics <id> | exam-delete <id>");
    eprintln!("  subjects | subject-add <name> | subject-delete <name>");
    eprintln!("  streak");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL, STUDY_USER_ID, STUDY_INTERVALS, STUDY_LOG");
}

//
// ─── SQLITE URL ────────────────────────────────────────────────────────────────
//

/// Turn a bare or relative path into an absolute `sqlite://` URL.
#[must_use]
pub fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// File path behind a `sqlite://` URL, or `None` for in-memory databases.
///
/// # Errors
///
/// Returns `ArgsError::InvalidDbUrl` for URLs without a path.
pub fn sqlite_file_path(db_url: &str) -> Result<Option<PathBuf>, ArgsError> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
        return Ok(None);
    }
    let invalid = || ArgsError::InvalidDbUrl {
        raw: db_url.to_string(),
    };
    let path = db_url.strip_prefix("sqlite://").ok_or_else(invalid)?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(invalid());
    }
    Ok(Some(PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(args.iter().map(|s| (*s).to_string()), Env::default())
    }

    fn command(args: &[&str]) -> Command {
        parse(args).unwrap().command.unwrap()
    }

    #[test]
    fn no_command_shows_agenda() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.command, Some(Command::Agenda));
        assert_eq!(args.db_url, DEFAULT_DB_URL);
        assert!(args.user.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn help_has_no_command() {
        assert_eq!(parse(&["-v", "--help"]).unwrap().command, None);
    }

    #[test]
    fn global_flags_come_before_the_command() {
        let args = parse(&[
            "--db",
            "sqlite:///tmp/study.db",
            "--user",
            "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "--intervals",
            "1, 3,9",
            "-v",
            "due",
        ])
        .unwrap();
        assert_eq!(args.db_url, "sqlite:///tmp/study.db");
        assert_eq!(
            args.user.unwrap().to_string(),
            "67e55044-10b1-426f-9247-bb680e5fe0c8"
        );
        assert_eq!(args.intervals.unwrap().offsets(), &[1, 3, 9]);
        assert!(args.verbose);
        assert_eq!(args.command, Some(Command::Due));
    }

    #[test]
    fn add_and_library_add_differ_in_activity() {
        let Command::Add(active) = command(&["add", "Optique", "--subject", "Physique"]) else {
            panic!("expected add");
        };
        assert!(active.active);
        assert_eq!(active.subject.as_deref(), Some("Physique"));

        let Command::Add(shelved) =
            command(&["library-add", "Optique", "--course", "https://example.com/optique"])
        else {
            panic!("expected add");
        };
        assert!(!shelved.active);
        assert_eq!(
            shelved.course_link.as_deref(),
            Some("https://example.com/optique")
        );
    }

    #[test]
    fn review_parses_id_and_difficulty() {
        assert_eq!(
            command(&["review", "7", "HARD"]),
            Command::Review {
                id: TopicId::new(7),
                difficulty: Difficulty::Hard
            }
        );
        assert_eq!(
            parse(&["review", "7", "medium"]),
            Err(ArgsError::InvalidDifficulty {
                raw: "medium".into()
            })
        );
        assert_eq!(
            parse(&["review", "x", "easy"]),
            Err(ArgsError::InvalidId { raw: "x".into() })
        );
    }

    #[test]
    fn study_finish_is_optional() {
        assert_eq!(
            command(&["study", "2"]),
            Command::Study {
                id: TopicId::new(2),
                finish: None
            }
        );
        assert_eq!(
            command(&["study", "2", "easy"]),
            Command::Study {
                id: TopicId::new(2),
                finish: Some(Difficulty::Easy)
            }
        );
    }

    #[test]
    fn edit_clears_with_empty_values() {
        let Command::Edit { id, edit } =
            command(&["edit", "3", "--subject", "", "--title", "Ondes", "--library"])
        else {
            panic!("expected edit");
        };
        assert_eq!(id, TopicId::new(3));
        assert_eq!(edit.subject, Some(None));
        assert_eq!(edit.title.as_deref(), Some("Ondes"));
        assert_eq!(edit.is_active, Some(false));
        assert_eq!(edit.course_link, None);
    }

    #[test]
    fn library_filter_accepts_tout() {
        let Command::Library(filter) = command(&["library", "--subject", "Tout", "--search", "ond"])
        else {
            panic!("expected library");
        };
        assert_eq!(filter.subject, SubjectFilter::All);
        assert_eq!(filter.search, "ond");
    }

    #[test]
    fn exam_add_collects_topic_ids() {
        assert_eq!(
            command(&["exam-add", "Partiel", "2024-01-10", "1", "4"]),
            Command::ExamAdd {
                title: "Partiel".into(),
                date: "2024-01-10".parse().unwrap(),
                topics: vec![TopicId::new(1), TopicId::new(4)],
            }
        );
        assert_eq!(
            parse(&["exam-add", "Partiel", "10/01/2024"]),
            Err(ArgsError::InvalidDate {
                raw: "10/01/2024".into()
            })
        );
    }

    #[test]
    fn bad_input_is_reported() {
        assert_eq!(
            parse(&["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        );
        assert_eq!(
            parse(&["--intervals", "2,0", "due"]),
            Err(ArgsError::InvalidIntervals { raw: "2,0".into() })
        );
        assert_eq!(
            parse(&["--intervals", "2,,7", "due"]),
            Err(ArgsError::InvalidIntervals { raw: "2,,7".into() })
        );
        assert_eq!(
            parse(&["frobnicate"]),
            Err(ArgsError::UnknownCommand("frobnicate".into()))
        );
        assert_eq!(
            parse(&["due", "extra"]),
            Err(ArgsError::UnknownArg("extra".into()))
        );
        assert_eq!(
            parse(&["card-add", "1", "question only"]),
            Err(ArgsError::MissingArg { what: "answer" })
        );
    }

    #[test]
    fn env_supplies_defaults() {
        let env = Env {
            db_url: Some("sqlite:///var/study.db".into()),
            user: Some("not-a-uuid".into()),
            intervals: None,
        };
        assert_eq!(
            Args::parse(Vec::new(), env),
            Err(ArgsError::InvalidUser {
                raw: "not-a-uuid".into()
            })
        );
    }

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("sqlite:data/study.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/study.db"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }

    #[test]
    fn sqlite_file_path_strips_query() {
        assert_eq!(
            sqlite_file_path("sqlite:///tmp/a.db?mode=rwc").unwrap(),
            Some(PathBuf::from("/tmp/a.db"))
        );
        assert_eq!(sqlite_file_path("sqlite::memory:").unwrap(), None);
        assert!(sqlite_file_path("postgres://x").is_err());
    }
}
