mod config;
mod error;
mod format;
mod mailer;
mod report;
mod store;
mod task;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use config::{AppConfig, EmailConfig};
use mailer::Mailer;
use report::{Composer, Report};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use store::TaskStore;
use task::{NewTask, Task, TaskStatus, TaskType, DATE_FORMAT};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Outer deadline around a single SMTP delivery.
const SEND_DEADLINE: Duration = Duration::from_secs(120);

#[derive(Parser)]
#[command(name = "sodeod")]
#[command(author, version, about = "start-of-day / end-of-day task tracker with email reports", long_about = None)]
struct Cli {
    /// directory holding sodeod.toml and the task database (creates if doesn't exist)
    #[arg(short, long, value_name = "DIR", global = true)]
    path: Option<String>,

    /// print task records as JSON
    #[arg(long, global = true)]
    json: bool,

    /// enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// add a batch of tasks, each as "label" or "label: description"
    Add {
        /// report the batch belongs to (sod or eod)
        #[arg(short = 't', long = "type", default_value = "sod")]
        task_type: TaskType,

        /// backdate the batch to this day (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        #[arg(required = true)]
        tasks: Vec<String>,
    },

    /// list tasks created on a day (defaults to today)
    List {
        #[arg(short, long)]
        date: Option<String>,
    },

    /// show a single task
    Show { id: i64 },

    /// set a task's status (pending, in-progress, completed)
    Status { id: i64, status: TaskStatus },

    /// delete a task
    Delete { id: i64 },

    /// list yesterday's tasks that are still pending
    Yesterday,

    /// email the start-of-day report (given tasks, or today's stored tasks)
    SendSod { tasks: Vec<String> },

    /// email the end-of-day report for a day (defaults to today)
    SendEod {
        #[arg(short, long)]
        date: Option<String>,
    },

    /// print the start-of-day report without sending it
    PreviewSod { tasks: Vec<String> },

    /// print the end-of-day report without sending it
    PreviewEod {
        #[arg(short, long)]
        date: Option<String>,
    },

    /// write a default sodeod.toml
    SetupConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("sodeod=debug,info")
    } else {
        EnvFilter::new("sodeod=info,warn")
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let work_dir = resolve_working_dir(cli.path.as_deref())?;
    let config_path = AppConfig::path_in(&work_dir);

    let config = AppConfig::load_or_default(&config_path)?;
    let db_path = config.database_path_in(&work_dir);
    let mut store = TaskStore::open(&db_path)
        .with_context(|| format!("couldn't open task database {}", db_path.display()))?;
    let composer = Composer::new(&config.report);

    match cli.command {
        Commands::Add {
            task_type,
            date,
            tasks,
        } => {
            let items: Vec<NewTask> = tasks.iter().map(|t| NewTask::parse(t)).collect();
            let created = store.create_batch(&items, task_type, date.as_deref())?;
            if !cli.json {
                println!("✓ added {} {} task(s)", created.len(), task_type);
            }
            print_tasks(&created, cli.json)?;
        }
        Commands::List { date } => {
            let date = date.unwrap_or_else(today);
            let tasks = store.find_by_date(&date)?;
            if tasks.is_empty() && !cli.json {
                println!("no tasks for {}", date);
            }
            print_tasks(&tasks, cli.json)?;
        }
        Commands::Show { id } => match store.find_by_id(id)? {
            Some(task) => print_tasks(&[task], cli.json)?,
            None => return Ok(not_found(id)),
        },
        Commands::Status { id, status } => match store.update_status(id, status)? {
            Some(task) => print_tasks(&[task], cli.json)?,
            None => return Ok(not_found(id)),
        },
        Commands::Delete { id } => {
            if !store.delete(id)? {
                return Ok(not_found(id));
            }
            println!("✓ deleted task {}", id);
        }
        Commands::Yesterday => {
            let tasks = store.find_pending_for_previous_day()?;
            if tasks.is_empty() && !cli.json {
                println!("nothing left pending from yesterday");
            }
            print_tasks(&tasks, cli.json)?;
        }
        Commands::SendSod { tasks } => {
            let report = sod_report(&store, &composer, &tasks)?;
            let config = AppConfig::load(&config_path)?;
            return Ok(deliver(&config.email, report, "SOD").await);
        }
        Commands::SendEod { date } => {
            let date = date.unwrap_or_else(today);
            let tasks = store.find_by_date(&date)?;
            let report = composer.compose_eod(&tasks, Some(date.as_str()));
            let config = AppConfig::load(&config_path)?;
            return Ok(deliver(&config.email, report, "EOD").await);
        }
        Commands::PreviewSod { tasks } => {
            print_report(&sod_report(&store, &composer, &tasks)?);
        }
        Commands::PreviewEod { date } => {
            let date = date.unwrap_or_else(today);
            let tasks = store.find_by_date(&date)?;
            print_report(&composer.compose_eod(&tasks, Some(date.as_str())));
        }
        Commands::SetupConfig => return setup_config(&config_path),
    }

    Ok(ExitCode::SUCCESS)
}

fn setup_config(config_path: &Path) -> Result<ExitCode> {
    AppConfig::write_default(config_path)?;
    println!("✓ Created {}", config_path.display());
    println!("Please edit it with your settings:");
    println!("  - For Gmail: Use app password, not regular password");
    println!("  - [email] smtp_server/smtp_port: your SMTP server, usually port 587 for STARTTLS");
    println!("  - [email] username/password: your email credentials");
    println!("  - [email] from_email/to_email: sender and recipient");
    println!("  - [report] sender_name/greeting/signature: how the letters are signed");
    Ok(ExitCode::SUCCESS)
}

fn resolve_working_dir(path: Option<&str>) -> Result<PathBuf> {
    let Some(p) = path else {
        return env::current_dir().context("couldn't read current directory");
    };

    let pb = PathBuf::from(p);
    if !pb.exists() {
        fs::create_dir_all(&pb).with_context(|| format!("couldn't create {}", pb.display()))?;
        println!("📁 Created directory: {}", pb.display());
    }
    if !pb.is_dir() {
        anyhow::bail!("Path {} is not a directory", pb.display());
    }
    Ok(pb.canonicalize()?)
}

/// Today on the same UTC calendar the store groups `created_at` by.
fn today() -> String {
    Utc::now().date_naive().format(DATE_FORMAT).to_string()
}

fn sod_report(store: &TaskStore, composer: &Composer<'_>, tasks: &[String]) -> Result<Report> {
    if tasks.is_empty() {
        let stored = store.find_by_date(&today())?;
        return Ok(composer.compose_sod(&stored));
    }

    let items: Vec<NewTask> = tasks.iter().map(|t| NewTask::parse(t)).collect();
    Ok(composer.compose_sod(&items))
}

async fn deliver(config: &EmailConfig, report: Report, label: &str) -> ExitCode {
    let mailer = Mailer::new(config);
    let to = config.to_email.clone();
    let sending = tokio::task::spawn_blocking(move || mailer.send(&report));

    let sent = match tokio::time::timeout(SEND_DEADLINE, sending).await {
        Ok(Ok(sent)) => sent,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "mail task panicked");
            false
        }
        Err(_) => {
            tracing::error!(deadline_secs = SEND_DEADLINE.as_secs(), "email delivery timed out");
            eprintln!("✗ {} email delivery timed out", label);
            // The blocked SMTP thread would keep the runtime from shutting down.
            std::process::exit(1);
        }
    };

    if sent {
        println!("✓ {} email sent successfully to {}", label, to);
        ExitCode::SUCCESS
    } else {
        eprintln!("✗ Failed to send {} email", label);
        ExitCode::FAILURE
    }
}

fn not_found(id: i64) -> ExitCode {
    eprintln!("task {} not found", id);
    ExitCode::FAILURE
}

fn print_report(report: &Report) {
    println!("Subject: {}", report.subject);
    println!();
    print!("{}", report.body);
}

fn print_tasks(tasks: &[Task], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(tasks)?);
        return Ok(());
    }

    for task in tasks {
        let checkbox = match task.status {
            TaskStatus::Pending => "☐",
            TaskStatus::InProgress => "◐",
            TaskStatus::Completed => "☑",
        };
        print!(
            "  {} #{} [{}] {}",
            checkbox, task.id, task.task_type, task.task
        );
        if let Some(ref description) = task.description {
            print!(": {}", description);
        }
        print!(" 📅 {}", task.created_at.format(DATE_FORMAT));
        if let Some(completed_at) = task.completed_at {
            print!(" ✓ {}", completed_at.format("%Y-%m-%d %H:%M"));
        }
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_add() {
        let cli = Cli::try_parse_from([
            "sodeod", "add", "--type", "eod", "--date", "2024-01-01", "Write report", "Review PR: api",
        ])
        .unwrap();

        match cli.command {
            Commands::Add {
                task_type,
                date,
                tasks,
            } => {
                assert_eq!(task_type, TaskType::Eod);
                assert_eq!(date.as_deref(), Some("2024-01-01"));
                assert_eq!(tasks, vec!["Write report", "Review PR: api"]);
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_status() {
        assert!(Cli::try_parse_from(["sodeod", "status", "3", "done"]).is_err());
        assert!(Cli::try_parse_from(["sodeod", "status", "3", "in-progress"]).is_ok());
    }

    #[test]
    fn test_working_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("reports");
        let resolved = resolve_working_dir(target.to_str()).unwrap();
        assert!(resolved.is_dir());
    }

    #[test]
    fn test_working_dir_must_be_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tasks.db");
        fs::write(&file, "").unwrap();
        assert!(resolve_working_dir(file.to_str()).is_err());
    }

    fn succeeded(code: ExitCode) -> bool {
        format!("{:?}", code) == format!("{:?}", ExitCode::SUCCESS)
    }

    async fn run_in(dir: &Path, args: &[&str]) -> ExitCode {
        let mut argv = vec!["sodeod", "--json", "--path", dir.to_str().unwrap()];
        argv.extend_from_slice(args);
        run(Cli::try_parse_from(argv).unwrap()).await.unwrap()
    }

    #[test]
    fn test_default_date_finds_undated_tasks() {
        let mut store = TaskStore::open_in_memory().unwrap();
        store
            .create_batch(&[NewTask::new("Evening work", None)], TaskType::Sod, None)
            .unwrap();

        let found = store.find_by_date(&today()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].task, "Evening work");
    }

    #[tokio::test]
    async fn test_add_then_list_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        let added = run_in(
            dir.path(),
            &["add", "--type", "eod", "--date", "2024-01-01", "Sync at 10:30", "Review PR: api"],
        )
        .await;
        assert!(succeeded(added));
        assert!(succeeded(run_in(dir.path(), &["list", "--date", "2024-01-01"]).await));

        let store = TaskStore::open(dir.path().join("tasks.db")).unwrap();
        let tasks = store.find_by_date("2024-01-01").unwrap();
        let labels: Vec<&str> = tasks.iter().map(|t| t.task.as_str()).collect();
        assert_eq!(labels, vec!["Review PR", "Sync at 10:30"]);
        assert_eq!(tasks[0].description.as_deref(), Some("api"));
        assert!(tasks.iter().all(|t| t.task_type == TaskType::Eod));

        let id = tasks[0].id.to_string();
        assert!(succeeded(run_in(dir.path(), &["status", id.as_str(), "completed"]).await));
        assert!(store.find_by_id(tasks[0].id).unwrap().unwrap().completed_at.is_some());
    }

    #[tokio::test]
    async fn test_undated_add_is_listed_by_default() {
        let dir = tempfile::tempdir().unwrap();
        assert!(succeeded(run_in(dir.path(), &["add", "Evening work"]).await));
        assert!(succeeded(run_in(dir.path(), &["list"]).await));

        let store = TaskStore::open(dir.path().join("tasks.db")).unwrap();
        assert_eq!(store.find_by_date(&today()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_task_exits_with_failure() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!succeeded(run_in(dir.path(), &["show", "99"]).await));
        assert!(!succeeded(run_in(dir.path(), &["delete", "99"]).await));
        assert!(!succeeded(run_in(dir.path(), &["status", "99", "pending"]).await));
    }

    #[tokio::test]
    async fn test_send_without_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let argv = ["sodeod", "--path", dir.path().to_str().unwrap(), "send-eod"];
        let result = run(Cli::try_parse_from(argv).unwrap()).await;
        assert!(result.unwrap_err().to_string().contains("setup-config"));
    }

    #[test]
    fn test_sod_report_uses_given_tasks() {
        let store = TaskStore::open_in_memory().unwrap();
        let report_config = config::ReportConfig::default();
        let composer = Composer::new(&report_config);

        let report = sod_report(&store, &composer, &["Write report".to_string()]).unwrap();
        assert!(report.body.contains("- Write report\n"));
    }
}
