//! Command-line argument model.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use dayplan_core::TaskId;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "dayplan",
    about = "Plan items onto days and keep each day in order",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// SQLite database file, created on first use
    #[arg(long, global = true, default_value = "dayplan.db")]
    pub db: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the upcoming agenda, rolling overdue tasks onto today first
    Agenda(AgendaArgs),
    /// List backlog occurrences and those committed past the agenda
    Backlog(BacklogArgs),
    /// Create an item with its first occurrence
    Add(AddArgs),
    /// Commit an occurrence to a date
    Commit(CommitArgs),
    /// Return a committed occurrence to its item's backlog
    Uncommit(TaskArgs),
    /// Complete an occurrence
    Done(TaskArgs),
    /// Move overdue occurrences onto today
    Roll,
}

#[derive(Debug, Args)]
pub struct AgendaArgs {
    /// Number of days to show, starting today
    #[arg(long)]
    pub days: Option<u32>,
}

#[derive(Debug, Args)]
pub struct BacklogArgs {
    /// List recurring items instead of one-off items
    #[arg(long)]
    pub recurring: bool,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub description: String,
    /// Due date (YYYY-MM-DD); the occurrence is committed to it
    #[arg(value_parser = parse_date)]
    pub due: Option<NaiveDate>,
    /// Make the item recurring with this many days between occurrences
    #[arg(long, value_name = "DAYS")]
    pub every: Option<u32>,
}

#[derive(Debug, Args)]
pub struct CommitArgs {
    #[arg(value_parser = parse_task_id)]
    pub task: TaskId,
    /// Target date (YYYY-MM-DD)
    #[arg(value_parser = parse_date)]
    pub date: NaiveDate,
}

#[derive(Debug, Args)]
pub struct TaskArgs {
    #[arg(value_parser = parse_task_id)]
    pub task: TaskId,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}

fn parse_task_id(value: &str) -> Result<TaskId, String> {
    TaskId::parse_str(value).map_err(|err| format!("expected a task UUID: {err}"))
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use chrono::NaiveDate;
    use clap::{CommandFactory, Parser};

    const TASK: &str = "6f1c2a8e-2d4b-4a3e-9f51-0c8d7b6a5e41";

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("dayplan").chain(args.iter().copied()))
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_parses_typed_due_date() {
        let cli = parse(&["--db", "p.db", "add", "renew passport", "2024-06-10"]).unwrap();
        assert_eq!(cli.db.to_str(), Some("p.db"));
        match cli.command {
            Command::Add(args) => {
                assert_eq!(args.description, "renew passport");
                assert_eq!(args.due, NaiveDate::from_ymd_opt(2024, 6, 10));
                assert_eq!(args.every, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn extra_arguments_are_rejected() {
        assert!(parse(&["add", "x", "2024-06-10", "extra"]).is_err());
        assert!(parse(&["commit", TASK, "2024-06-10", "extra"]).is_err());
        assert!(parse(&["done", TASK, "extra"]).is_err());
        assert!(parse(&["roll", "extra"]).is_err());
    }

    #[test]
    fn commit_requires_a_valid_date() {
        assert!(parse(&["commit", TASK]).is_err());
        assert!(parse(&["commit", TASK, "10/06/2024"]).is_err());
        assert!(parse(&["commit", "not-a-uuid", "2024-06-10"]).is_err());

        match parse(&["commit", TASK, "2024-06-10"]).unwrap().command {
            Command::Commit(args) => {
                assert_eq!(args.task.to_string(), TASK);
                assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn backlog_accepts_only_the_recurring_flag() {
        assert!(parse(&["backlog", "recurrring"]).is_err());
        assert!(parse(&["backlog", "--recurrring"]).is_err());

        match parse(&["backlog", "--recurring"]).unwrap().command {
            Command::Backlog(args) => assert!(args.recurring),
            other => panic!("unexpected command: {other:?}"),
        }
        match parse(&["backlog"]).unwrap().command {
            Command::Backlog(args) => assert!(!args.recurring),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
