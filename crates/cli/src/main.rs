//! giestro command-line tool.
//!
//! Snapshots the current directory into branch-scoped commits, restores
//! earlier snapshots, merges branches and re-bases the workspace on a fresh
//! clone of an external repository.

mod progress;
mod prompt;
mod style;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing_subscriber::EnvFilter;

use giestro_core::config::CONFIG_FILE;
use giestro_core::errors::{ConfigError, CoreError, FetchError, MergeError, StoreError};
use giestro_core::models::{pluralize, History};
use giestro_core::operator::{Decision, FixedOperator, Operator};
use giestro_core::store::{InitOutcome, CONTROL_DIR, DEFAULT_BRANCH};
use giestro_core::{
    GitCloner, MergeEngine, ReintegrationEngine, RepoConfig, Repository, SnapshotEngine,
};

use crate::progress::SpinnerCloner;
use crate::prompt::TerminalOperator;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Lightweight local version control.
#[derive(Parser, Debug)]
#[command(
    name = "giestro",
    version,
    about = "Lightweight local version control with branch-scoped snapshots",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the .giest control directory with a `main` branch.
    Init,

    /// Snapshot the working directory into a new commit.
    Commit {
        /// Branch to commit to.
        branch: String,
        /// Commit message.
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// List the commits of a branch.
    History {
        /// Branch to list.
        branch: String,
        /// Print the listing as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Replace the working directory with a commit (rollback).
    Get {
        /// Branch holding the commit.
        branch: String,
        /// Commit id, e.g. commit-2.
        commit_id: String,
    },

    /// Delete a single commit.
    RemoveCommit {
        /// Branch holding the commit.
        branch: String,
        /// Commit id, e.g. commit-2.
        commit_id: String,
    },

    /// Create a new, empty branch.
    Branch {
        /// Branch name.
        name: String,
    },

    /// List branches.
    Branches,

    /// Delete a branch and all of its commits.
    RemoveBranch {
        /// Branch name.
        name: String,
    },

    /// Copy the commits of one branch into another.
    Merge {
        /// Branch to take commits from.
        source: String,
        /// Branch to copy commits into.
        target: String,
        /// How to answer commit-id conflicts.
        #[arg(long, value_enum, default_value_t = Strategy::Ask)]
        strategy: Strategy,
    },

    /// Attach a merge-request note to a branch.
    MergeRequest {
        /// Branch the note is attached to.
        source: String,
        /// Branch the merge is intended for.
        target: String,
        /// Note text.
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// Replace the working directory with a clone of a remote repository,
    /// keeping giestro's branches and commits.
    Fetch {
        /// Clone URL, or a shorthand such as gh:owner/repo.
        url: String,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Conflict answering strategy for `merge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Ask for every conflicting commit.
    Ask,
    /// Overwrite every conflicting commit in the target.
    AcceptAll,
    /// Keep every conflicting commit in the target.
    SkipAll,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return report_parse_error(e),
    };

    init_tracing();
    tracing::debug!(command = ?cli.command, "dispatching");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Log filter: `GIESTRO_LOG`, then the repository config, then `warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("GIESTRO_LOG").unwrap_or_else(|_| {
        let level = std::env::current_dir()
            .ok()
            .and_then(|cwd| {
                RepoConfig::load_or_default(cwd.join(CONTROL_DIR).join(CONFIG_FILE)).ok()
            })
            .map(|config| config.core.log_level)
            .unwrap_or_else(|| "warn".to_string());
        EnvFilter::new(level)
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    // Every command except `init` needs an initialized repository.
    let open = Repository::open_current_dir;

    match cli.command {
        Commands::Init => {
            let cwd = std::env::current_dir().context("failed to resolve working directory")?;
            cmd_init(&cwd)
        }
        Commands::Commit { branch, message } => cmd_commit(&open()?, &branch, &message.join(" ")),
        Commands::History { branch, json } => cmd_history(&open()?, &branch, json),
        Commands::Get { branch, commit_id } => cmd_get(&open()?, &branch, &commit_id),
        Commands::RemoveCommit { branch, commit_id } => {
            cmd_remove_commit(&open()?, &branch, &commit_id)
        }
        Commands::Branch { name } => cmd_branch(&open()?, &name),
        Commands::Branches => cmd_branches(&open()?),
        Commands::RemoveBranch { name } => cmd_remove_branch(&open()?, &name),
        Commands::Merge {
            source,
            target,
            strategy,
        } => cmd_merge(&open()?, &source, &target, strategy),
        Commands::MergeRequest {
            source,
            target,
            message,
        } => cmd_merge_request(&open()?, &source, &target, &message.join(" ")),
        Commands::Fetch { url, yes } => cmd_fetch(&open()?, &url, yes),
    }
}

// ---------------------------------------------------------------------------
// Error reporting
// ---------------------------------------------------------------------------

/// Map clap's parse failures onto giestro's own messages.
fn report_parse_error(e: clap::Error) -> ExitCode {
    let command = std::env::args().nth(1).unwrap_or_default();
    match parse_error_lines(&e, &command) {
        Some((message, hint)) => {
            eprintln!("{}", style::error(&message));
            eprintln!("{}", style::dim(&hint));
            ExitCode::FAILURE
        }
        None => e.exit(),
    }
}

/// Message and usage hint for the parse failures giestro words itself.
/// `None` leaves the error (help, version, bad values) to clap.
fn parse_error_lines(e: &clap::Error, command: &str) -> Option<(String, String)> {
    match e.kind() {
        ErrorKind::MissingRequiredArgument => Some((
            format!("insufficient arguments for '{}'", command),
            format!("run 'giestro help {}' for usage", command),
        )),
        ErrorKind::InvalidSubcommand => {
            let name = match e.get(ContextKind::InvalidSubcommand) {
                Some(ContextValue::String(name)) => name.as_str(),
                _ => command,
            };
            Some((
                format!("unknown command '{}'", name),
                "run 'giestro help' for a list of commands".to_string(),
            ))
        }
        _ => None,
    }
}

/// A failed command as shown to the operator.
#[derive(Debug)]
struct ErrorReport {
    message: String,
    hint: Option<String>,
}

/// Known giestro errors are shown as they are, a missing control store as
/// fatal, and anything else as an internal error.
fn describe_error(e: &anyhow::Error) -> ErrorReport {
    let not_initialized = e
        .chain()
        .any(|cause| match cause.downcast_ref::<CoreError>() {
            Some(core) => core.is_not_initialized(),
            None => matches!(
                cause.downcast_ref::<StoreError>(),
                Some(StoreError::NotInitialized(_))
            ),
        });
    if not_initialized {
        return ErrorReport {
            message: format!("fatal: {:#}", e),
            hint: None,
        };
    }

    let known = e.chain().any(|cause| {
        cause.is::<CoreError>()
            || cause.is::<StoreError>()
            || cause.is::<MergeError>()
            || cause.is::<FetchError>()
            || cause.is::<ConfigError>()
    });
    let message = if known {
        format!("{:#}", e)
    } else {
        format!("internal error: {:#}", e)
    };

    let hint = e
        .chain()
        .find_map(|cause| cause.downcast_ref::<FetchError>())
        .and_then(FetchError::snapshot)
        .map(|snapshot| {
            format!(
                "The repository was not restored. Your previous files and {} are in {}",
                CONTROL_DIR,
                snapshot.display()
            )
        });

    ErrorReport { message, hint }
}

fn report_error(e: &anyhow::Error) {
    let report = describe_error(e);
    eprintln!("{}", style::error(&report.message));
    if let Some(hint) = report.hint {
        eprintln!("{}", style::warn(&hint));
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(root: &Path) -> Result<()> {
    match Repository::init(root)? {
        InitOutcome::Created => {
            println!(
                "{}",
                style::success(&format!(
                    "Initialized giestro repository in {}",
                    root.join(CONTROL_DIR).display()
                ))
            );
            println!("  Default branch: {}", style::branch(DEFAULT_BRANCH));
        }
        InitOutcome::AlreadyInitialized => {
            println!("{}", style::warn("giestro is already initialized here"));
        }
    }
    Ok(())
}

fn cmd_commit(repo: &Repository, branch: &str, message: &str) -> Result<()> {
    let _lock = repo.lock()?;
    let id = SnapshotEngine::new(repo).commit(branch, message)?;
    println!(
        "{}",
        style::success(&format!(
            "Committed as {} on {}",
            style::commit(&id),
            style::branch(branch)
        ))
    );
    Ok(())
}

fn cmd_history(repo: &Repository, branch: &str, json: bool) -> Result<()> {
    let history = SnapshotEngine::new(repo).history(branch)?;

    if json {
        let out = serde_json::to_string_pretty(&history).context("failed to encode history")?;
        println!("{}", out);
        return Ok(());
    }

    let commits = match history {
        History::Empty => {
            println!(
                "{}",
                style::info(&format!("No commits yet on {}", style::branch(branch)))
            );
            return Ok(());
        }
        History::Commits(commits) => commits,
    };

    println!();
    println!(
        "{}",
        style::header(&format!("History of {} ({})", branch, commits.len()))
    );
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Commit", "Created", "Message"]);

    for c in &commits {
        table.add_row(vec![
            Cell::new(&c.id),
            Cell::new(c.created_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::new(c.message_or_placeholder()),
        ]);
    }

    println!("{}", table);
    println!();
    Ok(())
}

fn cmd_get(repo: &Repository, branch: &str, commit_id: &str) -> Result<()> {
    let _lock = repo.lock()?;
    let restored = SnapshotEngine::new(repo).rollback(branch, commit_id)?;
    println!(
        "{}",
        style::success(&format!(
            "Rolled back to {} from {} ({} {})",
            style::commit(commit_id),
            style::branch(branch),
            restored,
            pluralize(restored, "entry", "entries")
        ))
    );
    Ok(())
}

fn cmd_remove_commit(repo: &Repository, branch: &str, commit_id: &str) -> Result<()> {
    let _lock = repo.lock()?;
    SnapshotEngine::new(repo).remove(branch, commit_id)?;
    println!(
        "{}",
        style::success(&format!(
            "Removed {} from {}",
            style::commit(commit_id),
            style::branch(branch)
        ))
    );
    Ok(())
}

fn cmd_branch(repo: &Repository, name: &str) -> Result<()> {
    let _lock = repo.lock()?;
    repo.store().create_branch(name)?;
    println!(
        "{}",
        style::success(&format!("Created branch {}", style::branch(name)))
    );
    Ok(())
}

fn cmd_branches(repo: &Repository) -> Result<()> {
    let branches = repo.store().list_branches()?;
    if branches.is_empty() {
        println!("{}", style::info("No branches"));
        return Ok(());
    }

    println!("{}", style::header("Branches"));
    for name in &branches {
        let count = repo.store().list_commits(name)?.len();
        println!(
            "  {} {}",
            style::branch(name),
            style::dim(&format!("({} {})", count, pluralize(count, "commit", "commits")))
        );
    }
    Ok(())
}

fn cmd_remove_branch(repo: &Repository, name: &str) -> Result<()> {
    let _lock = repo.lock()?;
    repo.store().remove_branch(name)?;
    println!(
        "{}",
        style::success(&format!("Removed branch {}", style::branch(name)))
    );
    Ok(())
}

fn cmd_merge(repo: &Repository, source: &str, target: &str, strategy: Strategy) -> Result<()> {
    let _lock = repo.lock()?;

    let mut operator: Box<dyn Operator> = match strategy {
        Strategy::Ask => Box::new(TerminalOperator),
        Strategy::AcceptAll => Box::new(FixedOperator::new(Decision::Accept)),
        Strategy::SkipAll => Box::new(FixedOperator::new(Decision::Skip)),
    };
    if strategy != Strategy::Ask {
        if let Some(note) = repo.store().read_merge_request(source)? {
            TerminalOperator.show_merge_request(source, &note);
        }
    }

    let report = MergeEngine::new(repo).merge(source, target, operator.as_mut())?;

    let merged = report.merged_count();
    println!(
        "{}",
        style::success(&format!(
            "Merged {} {} from {} into {}",
            merged,
            pluralize(merged, "commit", "commits"),
            style::branch(source),
            style::branch(target)
        ))
    );
    if !report.skipped.is_empty() {
        println!(
            "  {}",
            style::dim(&format!("Skipped: {}", report.skipped.join(", ")))
        );
    }
    if merged > 0 {
        println!(
            "  {}",
            style::dim(&format!(
                "Run 'giestro get {} <commit-id>' to bring a merged commit into the working directory",
                target
            ))
        );
    }
    Ok(())
}

fn cmd_merge_request(repo: &Repository, source: &str, target: &str, message: &str) -> Result<()> {
    let _lock = repo.lock()?;
    MergeEngine::new(repo).merge_request(source, target, message)?;
    println!(
        "{}",
        style::success(&format!(
            "Merge request from {} into {} recorded",
            style::branch(source),
            style::branch(target)
        ))
    );
    Ok(())
}

fn cmd_fetch(repo: &Repository, url: &str, yes: bool) -> Result<()> {
    let mut lock = repo.lock()?;

    let mut operator: Box<dyn Operator> = if yes {
        Box::new(FixedOperator::new(Decision::Accept))
    } else {
        Box::new(TerminalOperator)
    };

    let engine = ReintegrationEngine::new(repo, SpinnerCloner::new(GitCloner));
    let report = match engine.fetch(url, operator.as_mut(), &mut lock) {
        Ok(report) => report,
        Err(FetchError::Aborted) => {
            println!("{}", style::warn("Fetch cancelled. Nothing was changed."));
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for line in report.clone_output.lines() {
        println!("  {}", style::dim(line));
    }
    println!(
        "{}",
        style::success(&format!(
            "Fetched {}; branches and commits were kept",
            report.url
        ))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_commit_joins_message_words() {
        let cli = Cli::try_parse_from(["giestro", "commit", "main", "fix", "the", "bug"]).unwrap();
        match cli.command {
            Commands::Commit { branch, message } => {
                assert_eq!(branch, "main");
                assert_eq!(message.join(" "), "fix the bug");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_missing_arguments_kind() {
        let err = Cli::try_parse_from(["giestro", "get", "main"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = Cli::try_parse_from(["giestro", "commit", "main"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_unknown_command_kind() {
        let err = Cli::try_parse_from(["giestro", "rollback", "commit-1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_insufficient_arguments_message() {
        let err = Cli::try_parse_from(["giestro", "get", "main"]).unwrap_err();
        let (message, hint) = parse_error_lines(&err, "get").unwrap();
        assert_eq!(message, "insufficient arguments for 'get'");
        assert_eq!(hint, "run 'giestro help get' for usage");
    }

    #[test]
    fn test_unknown_command_message() {
        let err = Cli::try_parse_from(["giestro", "rollback", "commit-1"]).unwrap_err();
        let (message, _) = parse_error_lines(&err, "rollback").unwrap();
        assert_eq!(message, "unknown command 'rollback'");
    }

    #[test]
    fn test_help_is_left_to_clap() {
        let err = Cli::try_parse_from(["giestro", "--help"]).unwrap_err();
        assert!(parse_error_lines(&err, "--help").is_none());
    }

    #[test]
    fn test_not_initialized_is_fatal() {
        let err: anyhow::Error =
            CoreError::from(StoreError::NotInitialized("/work/.giest".into())).into();
        let report = describe_error(&err);
        assert_eq!(
            report.message,
            "fatal: not a giestro repository: /work/.giest (run 'giestro init')"
        );
        assert!(report.hint.is_none());
    }

    #[test]
    fn test_domain_error_shown_as_is() {
        let err: anyhow::Error = StoreError::BranchNotFound("dev".into()).into();
        assert_eq!(describe_error(&err).message, "branch 'dev' not found");
    }

    #[test]
    fn test_unknown_error_is_internal() {
        let err = anyhow::anyhow!("disk on fire");
        assert_eq!(describe_error(&err).message, "internal error: disk on fire");
    }

    #[test]
    fn test_clone_failure_points_at_snapshot() {
        let err: anyhow::Error = FetchError::CloneFailed {
            url: "https://example.invalid/x.git".into(),
            output: "repository not found".into(),
            snapshot: "/tmp/giestro-fetch-abc".into(),
        }
        .into();
        let report = describe_error(&err);
        assert!(!report.message.starts_with("internal error"));
        let hint = report.hint.unwrap();
        assert!(hint.contains("/tmp/giestro-fetch-abc"));
    }

    #[test]
    fn test_kebab_case_commands() {
        let cli = Cli::try_parse_from(["giestro", "remove-commit", "main", "commit-1"]).unwrap();
        assert!(matches!(cli.command, Commands::RemoveCommit { .. }));

        let cli = Cli::try_parse_from([
            "giestro",
            "merge-request",
            "dev",
            "main",
            "ready",
            "to",
            "go",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::MergeRequest { .. }));

        let cli =
            Cli::try_parse_from(["giestro", "merge", "dev", "main", "--strategy", "skip-all"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Merge {
                strategy: Strategy::SkipAll,
                ..
            }
        ));
    }
}
