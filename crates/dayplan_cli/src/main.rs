//! Command-line front end over `dayplan_core`.
//!
//! # Responsibility
//! - Open a database file and run one scheduling operation per invocation.
//! - Print occurrences in a stable, line-oriented format.
//!
//! Logging is enabled when `DAYPLAN_LOG_DIR` names an absolute directory.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use dayplan_core::db::open_db;
use dayplan_core::{
    init_logging, LoggingConfig, NewOccurrence, Occurrence, SchedulerConfig, SchedulingService,
    SqliteStore,
};
use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    if let Ok(log_dir) = env::var("DAYPLAN_LOG_DIR") {
        init_logging(&LoggingConfig::new("info", log_dir))?;
    }

    let conn = open_db(&cli.db).map_err(|err| err.to_string())?;
    let store = SqliteStore::try_new(&conn).map_err(|err| err.to_string())?;
    let service = SchedulingService::try_new(store, SchedulerConfig::default())
        .map_err(|err| err.to_string())?;

    match cli.command {
        Command::Agenda(args) => {
            let agenda = match args.days {
                Some(days) => service.list_upcoming_by_date(days),
                None => service.list_upcoming(),
            }
            .map_err(|err| err.to_string())?;
            for (day, occurrences) in agenda {
                println!("{day}");
                for occurrence in &occurrences {
                    println!("  {}", render(occurrence));
                }
            }
        }
        Command::Backlog(args) => {
            let active = service
                .list_active_occurrences(args.recurring)
                .map_err(|err| err.to_string())?;
            for occurrence in &active {
                println!("{}", render(occurrence));
            }
        }
        Command::Add(args) => {
            let mut request = NewOccurrence::new(args.description);
            if let Some(cadence_days) = args.every {
                request = request.recurring(cadence_days);
            }
            if let Some(due) = args.due {
                request = request.due_on(due);
            }
            let created = service
                .create_occurrence(request)
                .map_err(|err| err.to_string())?;
            println!("{}", render(&created));
        }
        Command::Commit(args) => {
            let updated = service
                .set_committed_date(args.task, Some(args.date))
                .map_err(|err| err.to_string())?;
            println!("{}", render(&updated));
        }
        Command::Uncommit(args) => {
            let updated = service
                .set_committed_date(args.task, None)
                .map_err(|err| err.to_string())?;
            println!("{}", render(&updated));
        }
        Command::Done(args) => {
            let outcome = service
                .complete_occurrence(args.task)
                .map_err(|err| err.to_string())?;
            println!("completed {}", outcome.completed.task.id);
            if let Some(successor) = outcome.successor {
                println!("next {} due={:?}", successor.id, successor.due_date);
            }
        }
        Command::Roll => {
            let rolled = service
                .roll_expired_occurrences()
                .map_err(|err| err.to_string())?;
            println!("rolled {rolled}");
        }
    }
    Ok(())
}

fn render(occurrence: &Occurrence) -> String {
    let task = &occurrence.task;
    let slot = match (task.committed_date, task.position, occurrence.item.position) {
        (Some(day), Some(position), _) => format!("{day}#{position}"),
        (None, _, Some(position)) => format!("backlog#{position}"),
        _ => "-".to_string(),
    };
    format!("{} {} {}", task.id, slot, task.description)
}
