use std::fmt;
use std::sync::Arc;

use exam_core::Clock;
use exam_core::model::{Answer, Exam, ExamId, ExamType, Question, QuestionId, SubjectId, UnitId};
use services::sessions::{ExamWorkflow, NavigationTarget};
use services::{
    ContentStore, FixtureContentStore, HttpContentStore, HttpResultSink, QuestionSource,
    RecordingResultSink, ResultSink, TimePressure,
};
use storage::repository::Storage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingSource,
    MissingSubject,
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingSource => write!(f, "one of --exam-id or --unit-id is required"),
            ArgsError::MissingSubject => write!(f, "--unit-id also requires --subject-id"),
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

struct Args {
    db_url: String,
    source: QuestionSource,
    content_url: Option<String>,
    results_url: Option<String>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- --exam-id <id> [options]");
    eprintln!("  cargo run -p app -- --unit-id <id> --subject-id <id> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>       progress database (default sqlite://exam.sqlite3)");
    eprintln!("  --content-url <url>     exam content API base; omit for the built-in demo exam");
    eprintln!("  --results-url <url>     results API base; omit to keep results local");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, EXAM_ID, EXAM_CONTENT_URL, EXAM_RESULTS_URL");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("EXAM_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://exam.sqlite3".into(), normalize_sqlite_url);
        let mut exam_id = std::env::var("EXAM_ID").ok().filter(|v| !v.is_empty());
        let mut unit_id: Option<String> = None;
        let mut subject_id: Option<String> = None;
        let mut content_url = std::env::var("EXAM_CONTENT_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let mut results_url = std::env::var("EXAM_RESULTS_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--exam-id" => exam_id = Some(require_value(args, "--exam-id")?),
                "--unit-id" => unit_id = Some(require_value(args, "--unit-id")?),
                "--subject-id" => subject_id = Some(require_value(args, "--subject-id")?),
                "--content-url" => content_url = Some(require_value(args, "--content-url")?),
                "--results-url" => results_url = Some(require_value(args, "--results-url")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let source = match (exam_id, unit_id) {
            (Some(id), _) => QuestionSource::Exam(ExamId::new(id)),
            (None, Some(unit)) => {
                let subject = subject_id.ok_or(ArgsError::MissingSubject)?;
                QuestionSource::Unit {
                    unit_id: UnitId::new(unit),
                    subject_id: SubjectId::new(subject),
                }
            }
            (None, None) => return Err(ArgsError::MissingSource),
        };

        Ok(Self {
            db_url,
            source,
            content_url,
            results_url,
        })
    }
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
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
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

/// Built-in exam served when no content API is configured, so the binary is
/// runnable offline out of the box.
fn demo_exam() -> Exam {
    let question = |id: &str, text: &str, options: &[&str], answer: &str| Question {
        id: QuestionId::new(id),
        text: text.to_string(),
        options: options.iter().map(ToString::to_string).collect(),
        answer: Answer::Single(answer.to_string()),
        explanation: None,
    };

    Exam {
        id: ExamId::new("demo"),
        title: "Demo exam".into(),
        duration: Some(15),
        exam_type: ExamType::Quick,
        questions: vec![
            question(
                "demo-q1",
                "What is 7 x 8?",
                &["54", "56", "63", "64"],
                "56",
            ),
            question(
                "demo-q2",
                "Which planet is closest to the sun?",
                &["Venus", "Earth", "Mercury", "Mars"],
                "Mercury",
            ),
            question(
                "demo-q3",
                "What is the capital of France?",
                &["Lyon", "Marseille", "Paris", "Nice"],
                "Paris",
            ),
        ],
    }
}

fn format_time(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn print_question(workflow: &ExamWorkflow) {
    let session = workflow.session();
    let Some(question) = session.current_question() else {
        return;
    };

    let flag = if session.is_flagged(&question.id) {
        " [flagged]"
    } else {
        ""
    };
    println!(
        "\n[{}/{}] {}{}",
        session.current_index() + 1,
        session.questions().len(),
        question.text,
        flag
    );
    for (i, option) in question.options.iter().enumerate() {
        println!("  {}. {option}", i + 1);
    }
    if let Some(current) = session.answer_for(&question.id) {
        println!("  your answer: {current}");
    }

    let reveal = session.is_review() || session.exam_type().reveals_before_submit();
    if reveal && session.answer_for(&question.id).is_some() {
        println!("  correct answer: {}", question.answer.canonical());
        if let Some(explanation) = &question.explanation {
            println!("  explanation: {explanation}");
        }
    }
}

fn print_status(workflow: &ExamWorkflow) {
    let session = workflow.session();
    let progress = session.progress();
    let pressure = match progress.pressure {
        TimePressure::Normal => "",
        TimePressure::Warning => " (under 10 minutes)",
        TimePressure::Critical => " (under 5 minutes)",
    };
    println!(
        "answered {}/{}, {} flagged, time left {}{}",
        progress.answered,
        progress.total,
        progress.flagged,
        format_time(progress.time_left_seconds),
        pressure
    );
    if progress.is_submitted {
        println!("submitted; score: {} correct", session.score());
    }
}

fn print_help() {
    println!("Commands:");
    println!("  a <answer>   answer the current question (option number or exact text)");
    println!("  n / p        next / previous question");
    println!("  g <n>        go to question n");
    println!("  f            toggle flag on the current question");
    println!("  status       progress and remaining time");
    println!("  submit       grade and submit the attempt");
    println!("  review       browse the graded attempt");
    println!("  retry        discard this attempt and start over");
    println!("  q            quit (progress is saved)");
}

/// Resolve `a 2` to the second option's text; anything else is taken verbatim.
fn resolve_answer(question: &Question, raw: &str) -> String {
    raw.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| question.options.get(i).cloned())
        .unwrap_or_else(|| raw.to_string())
}

async fn handle_command(
    workflow: &mut ExamWorkflow,
    line: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (line, ""),
    };

    match command {
        "a" | "answer" => {
            if rest.is_empty() {
                println!("usage: a <answer>");
                return Ok(true);
            }
            let target = workflow.session().current_question().cloned();
            match target {
                Some(question) => {
                    let value = resolve_answer(&question, rest);
                    workflow.record_answer(&question.id, value).await;
                    print_question(workflow);
                }
                None => println!("no current question"),
            }
        }
        "n" | "next" => {
            workflow.navigate(NavigationTarget::Delta(1)).await;
            print_question(workflow);
        }
        "p" | "prev" => {
            workflow.navigate(NavigationTarget::Delta(-1)).await;
            print_question(workflow);
        }
        "g" | "goto" => match rest.parse::<usize>() {
            Ok(n) if n >= 1 => {
                workflow.navigate(NavigationTarget::Index(n - 1)).await;
                print_question(workflow);
            }
            _ => println!("usage: g <question number>"),
        },
        "f" | "flag" => {
            let id = workflow.session().current_question().map(|q| q.id.clone());
            match id {
                Some(id) => {
                    workflow.toggle_flag(&id).await;
                    print_question(workflow);
                }
                None => println!("no current question"),
            }
        }
        "status" => print_status(workflow),
        "show" => print_question(workflow),
        "submit" => match workflow.submit().await {
            Ok(result) => {
                println!(
                    "\nsubmitted: {}% ({} correct, {} wrong) in {}",
                    result.score,
                    result.correct_answers,
                    result.wrong_answers,
                    format_time(result.time_spent)
                );
                println!("type `review` to inspect answers, `retry` to start over");
            }
            Err(err) => println!("cannot submit: {err}"),
        },
        "review" => match workflow.enter_review().await {
            Ok(()) => {
                println!("review mode: answers are read-only");
                print_question(workflow);
            }
            Err(err) => println!("cannot review: {err}"),
        },
        "retry" => {
            workflow.retry().await?;
            println!("fresh attempt started");
            print_question(workflow);
        }
        "q" | "quit" | "exit" => return Ok(false),
        "help" | "?" => print_help(),
        "" => {}
        other => println!("unknown command: {other} (try `help`)"),
    }

    Ok(true)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut iter = std::env::args().skip(1);
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    let store: Arc<dyn ContentStore> = match parsed.content_url {
        Some(url) => Arc::new(HttpContentStore::new(url)),
        None => Arc::new(FixtureContentStore::new().with_exam(demo_exam())),
    };
    let sink: Arc<dyn ResultSink> = match parsed.results_url {
        Some(url) => Arc::new(HttpResultSink::new(url)),
        None => Arc::new(RecordingResultSink::new()),
    };

    let workflow = ExamWorkflow::load_or_init(
        Clock::system(),
        store,
        Arc::clone(&storage.progress),
        sink,
        parsed.source,
    )
    .await?;

    {
        let session = workflow.session();
        println!(
            "{} ({}, {} questions, {} left)",
            session.title(),
            session.exam_type(),
            session.questions().len(),
            format_time(session.time_left_seconds())
        );
        if session.is_submitted() {
            println!("this attempt was already submitted; `review` or `retry`");
        }
    }

    let workflow = Arc::new(Mutex::new(workflow));

    // Countdown driver: one tick per second until submission.
    let ticker = {
        let workflow = Arc::clone(&workflow);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let mut guard = workflow.lock().await;
                if guard.session().is_submitted() {
                    break;
                }
                guard.tick().await;
            }
        })
    };

    {
        let guard = workflow.lock().await;
        print_question(&guard);
    }
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut guard = workflow.lock().await;
        if !handle_command(&mut guard, line.trim()).await? {
            break;
        }
    }

    ticker.abort();
    println!("bye");
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
