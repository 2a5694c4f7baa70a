use std::sync::Arc;

use services::{AppServices, Clock, PersistStatus, StreakServiceError};
use storage::repository::{AuthSession, StaticSession};
use study_core::scheduler::Scheduler;
use study_core::session::{StudySession, format_countdown};

mod cli;
mod render;

use cli::{Args, ArgsError, Command, Env};

fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("STUDY_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| format!("failed to initialize tracing subscriber: {error}"))?;
    Ok(())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = cli::sqlite_file_path(db_url).map_err(|e| e.to_string())? else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1), Env::from_process()).map_err(|e| {
        eprintln!("{e}");
        cli::print_usage();
        e
    })?;
    let Some(command) = args.command else {
        cli::print_usage();
        return Ok(());
    };
    init_tracing(args.verbose)?;

    // Open + migrate SQLite here so core and services never touch the filesystem.
    prepare_sqlite_file(&args.db_url)?;
    let auth: Arc<dyn AuthSession> = Arc::new(match args.user {
        Some(user) => StaticSession::signed_in(user),
        None => StaticSession::anonymous(),
    });
    let scheduler = args
        .intervals
        .map_or_else(Scheduler::new, Scheduler::with_table);
    let app = AppServices::new_sqlite(&args.db_url, Clock::default_clock(), scheduler, auth).await?;

    // every run counts as a visit for the signed-in user
    if args.user.is_some() {
        if let Err(error) = app.streaks().check_streak().await {
            tracing::warn!(%error, "streak check failed");
        }
    }

    execute(&app, command).await
}

async fn execute(app: &AppServices, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Add(topic) => {
            let topic = app.topics().create_topic(topic.into_draft()).await?;
            println!("added {}", render::topic_line(&topic));
        }
        Command::Review { id, difficulty } => {
            let receipt = app.reviews().review_topic_by_id(id, difficulty).await?;
            match &receipt.persist {
                PersistStatus::Saved => println!(
                    "{difficulty}: next review {} (in {} days)",
                    receipt.schedule.next_review, receipt.schedule.offset_days
                ),
                PersistStatus::Failed(error) => {
                    return Err(format!("review of #{id} was not saved: {error}").into());
                }
            }
        }
        Command::Study { id, finish } => {
            let mut session = StudySession::start(app.topics().get_topic(id).await?);
            println!(
                "{} ({})",
                render::topic_details(session.topic()),
                format_countdown(session.time_left(Clock::default_clock().now()))
            );
            if session.show_cards().is_ok() {
                for _ in 0..session.topic().flashcards().len() {
                    if let (Some((n, total)), Some(question)) =
                        (session.card_position(), session.card_face())
                    {
                        println!("card {n}/{total}: {question}");
                    }
                    session.flip();
                    if let Some(answer) = session.card_face() {
                        println!("  -> {answer}");
                    }
                    session.next_card();
                }
            }
            if let Some(difficulty) = finish {
                let receipt = app.reviews().finish_session(session, difficulty).await?;
                if let PersistStatus::Failed(error) = &receipt.persist {
                    return Err(format!("session of #{id} was not saved: {error}").into());
                }
                println!("{difficulty}: next review {}", receipt.schedule.next_review);
            }
        }
        Command::Topics => {
            for topic in app.topics().active_topics().await? {
                println!("{}", render::topic_line(&topic));
            }
        }
        Command::Due => {
            let due = app.topics().due_topics().await?;
            if due.is_empty() {
                println!("nothing to review today");
            }
            for topic in due {
                println!("{}", render::topic_details(&topic));
            }
        }
        Command::Agenda => {
            for day in app.topics().agenda().await? {
                println!("{}", render::agenda_day(&day));
            }
        }
        Command::Library(filter) => {
            for topic in app.topics().library(&filter).await? {
                println!("{}", render::topic_line(&topic));
            }
        }
        Command::Edit { id, edit } => {
            let topic = app.topics().edit_topic(id, edit).await?;
            println!("{}", render::topic_details(&topic));
        }
        Command::Toggle { id } => {
            let topic = app.topics().toggle_active(id).await?;
            println!("{}", render::topic_line(&topic));
        }
        Command::Delete { id } => {
            let deleted = app.topics().delete_topic(id).await?;
            println!(
                "deleted #{} (removed from {} exams)",
                deleted.id, deleted.exams_updated
            );
        }
        Command::CardAdd {
            id,
            question,
            answer,
        } => {
            let (_, card) = app.topics().add_flashcard(id, question, answer).await?;
            println!("added card {card} to #{id}");
        }
        Command::CardRemove { id, card } => {
            app.topics().remove_flashcard(id, card).await?;
            println!("removed card {card} from #{id}");
        }
        Command::Streak => match app.streaks().current_streak().await {
            Ok(Some(profile)) => println!("{}", render::streak(profile.streak())),
            Ok(None) => println!("streak: none yet"),
            Err(StreakServiceError::NotSignedIn) => println!("streak: sign in with --user"),
            Err(error) => return Err(error.into()),
        },
        Command::Exams => {
            let partition = app.exams().list_exams().await?;
            for countdown in &partition.upcoming {
                println!("{}", render::countdown(countdown));
            }
            if !partition.past.is_empty() {
                println!("past:");
                for countdown in &partition.past {
                    println!("  {}", render::countdown(countdown));
                }
            }
        }
        Command::ExamAdd {
            title,
            date,
            topics,
        } => {
            let exam = app
                .exams()
                .create_exam(study_core::model::ExamDraft::new(title, date, topics))
                .await?;
            println!("added exam #{} on {}", exam.id(), exam.date());
        }
        Command::ExamTopics { id } => {
            for topic in app.exams().exam_topics(id).await? {
                println!("{}", render::topic_line(&topic));
            }
        }
        Command::ExamDelete { id } => {
            app.exams().delete_exam(id).await?;
            println!("deleted exam #{id}");
        }
        Command::Subjects => {
            for name in app.subjects().subject_names().await? {
                println!("{name}");
            }
        }
        Command::SubjectAdd { name } => {
            let subject = app.subjects().add_subject(&name).await?;
            println!("added subject {}", subject.name());
        }
        Command::SubjectDelete { name } => {
            app.subjects().remove_subject(&name).await?;
            println!("removed subject {name}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // Binary glue: print once and exit.
        if err.downcast_ref::<ArgsError>().is_none() {
            eprintln!("{err}");
        }
        std::process::exit(2);
    }
}
