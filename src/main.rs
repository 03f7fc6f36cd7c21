//! nudge - recurring yes/no check-ins for habit goals
//!
//! CLI entry point with global panic handler. The binary is the
//! composition root: it builds the store, the trigger scheduler and the
//! signal dispatcher, then runs one command against them.

use std::env;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nudge::cli::goal::GoalOptions;
use nudge::cli::list::ListOptions;
use nudge::cli::sessions::SessionsOptions;
use nudge::cli::show::ShowOptions;
use nudge::cli::signal::{parse_answer, SignalOptions};
use nudge::cli::{
    resolve_goal, GoalAction, GoalCommand, GoalEdit, ListCommand, SessionsCommand, ShowCommand,
    SignalCommand,
};
use nudge::config::{nudge_home, Config};
use nudge::core::{GoalDraft, GoalId};
use nudge::error::exit_codes;
use nudge::storage::FileGoalRepository;
use nudge::store::{GoalStore, SystemClock};
use nudge::trigger::{LogTriggerScheduler, SignalDispatcher};

// =============================================================================
// CLI Definition
// =============================================================================

/// nudge - recurring yes/no check-ins for habit goals
#[derive(Parser)]
#[command(name = "nudge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Output flags shared by every command.
#[derive(Args, Debug, Clone, Copy, Default)]
struct OutputArgs {
    /// Output as JSON
    #[arg(long, short)]
    json: bool,
    /// Suppress output
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a goal (paused until started)
    Add {
        /// Goal title
        title: String,
        /// Minutes between check-ins (1, 5, 15, 30, 60 or 120 by default)
        #[arg(long, short)]
        interval: Option<u32>,
        /// Minimum yes-percentage for a successful session
        #[arg(long, short)]
        threshold: Option<u8>,
        /// Start check-ins right away
        #[arg(long)]
        start: bool,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Change a goal's title, interval or threshold
    Edit {
        /// Goal id, id prefix or title
        goal: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New interval in minutes
        #[arg(long, short)]
        interval: Option<u32>,
        /// New success threshold
        #[arg(long, short)]
        threshold: Option<u8>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Start (or resume) check-ins for a goal
    Start {
        /// Goal id, id prefix or title
        goal: String,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Pause check-ins, closing the current session
    Pause {
        /// Goal id, id prefix or title
        goal: String,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Start a paused goal or pause a running one
    Toggle {
        /// Goal id, id prefix or title
        goal: String,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Delete a goal and cancel its check-ins
    Delete {
        /// Goal id, id prefix or title
        goal: String,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Answer a check-in (as if from the notification)
    Answer {
        /// Goal id, id prefix or title
        goal: String,
        /// yes, no, none, or a notification action id
        answer: String,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Deliver a trigger-fired signal (as if from the notification system)
    Fire {
        /// Goal id, id prefix or title
        goal: String,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Name a session; omit the title to clear it
    Title {
        /// Goal id, id prefix or title
        goal: String,
        /// Session number (oldest = 1)
        session: usize,
        /// Session title
        title: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List goals
    List {
        /// Show only active goals
        #[arg(long)]
        active: bool,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List a goal's sessions, newest first
    Sessions {
        /// Goal id, id prefix or title
        goal: String,
        /// Maximum number of sessions to show
        #[arg(long, short)]
        limit: Option<usize>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show one session with its timeline
    Show {
        /// Goal id, id prefix or title
        goal: String,
        /// Session number (oldest = 1)
        session: usize,
        #[command(flatten)]
        output: OutputArgs,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_logging();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("nudge error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Install the tracing subscriber.
///
/// `NUDGE_DEBUG_LOG=1` forces debug output; otherwise `RUST_LOG` applies,
/// defaulting to warnings only. Logs go to stderr so command output on
/// stdout stays clean.
fn init_logging() {
    let debug_enabled = env::var("NUDGE_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.nudge/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("nudge panic: {}", info);

        if let Some(home) = nudge_home() {
            let _ = std::fs::create_dir_all(&home);
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Long-lived services, built once per process.
struct App {
    store: Arc<GoalStore>,
    dispatcher: SignalDispatcher,
}

impl App {
    fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load_fail_open();
        let repository = FileGoalRepository::new(&config)?;
        tracing::debug!(path = %repository.path().display(), "opening goal store");

        let store = Arc::new(GoalStore::open(
            repository,
            LogTriggerScheduler,
            SystemClock,
            config.goals,
        ));

        let dispatcher = SignalDispatcher::new();
        dispatcher.register(&store);

        Ok(Self { store, dispatcher })
    }

    /// Resolve a goal reference, printing the error when it fails.
    fn resolve(&self, reference: &str, output: OutputArgs) -> Option<GoalId> {
        match resolve_goal(&self.store, reference) {
            Ok(id) => Some(id),
            Err(e) => {
                if output.json {
                    let body = serde_json::json!({ "success": false, "error": e.to_string() });
                    println!("{}", body);
                } else if !output.quiet {
                    eprintln!("{}", e);
                }
                None
            }
        }
    }
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let app = App::open()?;

    let code = match cli.command {
        Commands::Add {
            title,
            interval,
            threshold,
            start,
            output,
        } => run_add(&app, title, interval, threshold, start, output),
        Commands::Edit {
            goal,
            title,
            interval,
            threshold,
            output,
        } => {
            let edit = GoalEdit {
                title,
                interval_minutes: interval,
                success_threshold: threshold,
            };
            with_goal(&app, &goal, output, |id| {
                run_goal_action(&app, GoalAction::Edit(id, edit), output)
            })
        }
        Commands::Start { goal, output } => with_goal(&app, &goal, output, |id| {
            run_goal_action(&app, GoalAction::Start(id), output)
        }),
        Commands::Pause { goal, output } => with_goal(&app, &goal, output, |id| {
            run_goal_action(&app, GoalAction::Pause(id), output)
        }),
        Commands::Toggle { goal, output } => with_goal(&app, &goal, output, |id| {
            run_goal_action(&app, GoalAction::Toggle(id), output)
        }),
        Commands::Delete { goal, output } => with_goal(&app, &goal, output, |id| {
            run_goal_action(&app, GoalAction::Delete(id), output)
        }),
        Commands::Title {
            goal,
            session,
            title,
            output,
        } => with_goal(&app, &goal, output, |id| {
            let action = GoalAction::Title {
                goal_id: id,
                number: session,
                title: title.unwrap_or_default(),
            };
            run_goal_action(&app, action, output)
        }),
        Commands::Answer {
            goal,
            answer,
            output,
        } => with_goal(&app, &goal, output, |id| {
            let cmd = SignalCommand::new(&app.dispatcher);
            let result = cmd.answer(id, parse_answer(&answer), app.store.now());
            print_output(&cmd.format_output(&result, &signal_options(output)));
            success_to_exit_code(result.success)
        }),
        Commands::Fire { goal, output } => with_goal(&app, &goal, output, |id| {
            let cmd = SignalCommand::new(&app.dispatcher);
            let result = cmd.fire(id);
            print_output(&cmd.format_output(&result, &signal_options(output)));
            success_to_exit_code(result.success)
        }),
        Commands::List { active, output } => {
            let cmd = ListCommand::new(&app.store);
            let options = ListOptions {
                json: output.json,
                quiet: output.quiet,
                active_only: active,
            };
            let result = cmd.run(&options);
            print_output(&cmd.format_output(&result, &options));
            success_to_exit_code(result.success)
        }
        Commands::Sessions {
            goal,
            limit,
            output,
        } => with_goal(&app, &goal, output, |id| {
            let cmd = SessionsCommand::new(&app.store);
            let options = SessionsOptions {
                json: output.json,
                quiet: output.quiet,
                limit,
            };
            let result = cmd.run(id, &options);
            print_output(&cmd.format_output(&result, &options));
            success_to_exit_code(result.success)
        }),
        Commands::Show {
            goal,
            session,
            output,
        } => with_goal(&app, &goal, output, |id| {
            let cmd = ShowCommand::new(&app.store);
            let options = ShowOptions {
                json: output.json,
                quiet: output.quiet,
            };
            let result = cmd.run(id, session);
            print_output(&cmd.format_output(&result, &options));
            success_to_exit_code(result.success)
        }),
    };

    Ok(code)
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

fn print_output(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted.trim_end());
    }
}

fn signal_options(output: OutputArgs) -> SignalOptions {
    SignalOptions {
        json: output.json,
        quiet: output.quiet,
    }
}

fn with_goal(
    app: &App,
    reference: &str,
    output: OutputArgs,
    run: impl FnOnce(GoalId) -> ExitCode,
) -> ExitCode {
    match app.resolve(reference, output) {
        Some(id) => run(id),
        None => ExitCode::from(exit_codes::ERROR as u8),
    }
}

fn run_add(
    app: &App,
    title: String,
    interval: Option<u32>,
    threshold: Option<u8>,
    start: bool,
    output: OutputArgs,
) -> ExitCode {
    let rules = app.store.rules();
    let draft = GoalDraft::new(title, interval.unwrap_or(rules.default_interval))
        .with_threshold(threshold.unwrap_or(rules.default_success_threshold));

    let cmd = GoalCommand::new(&app.store);
    let mut result = cmd.run(&GoalAction::Add(draft));
    if start && result.success {
        if let Some(id) = result.goal_id {
            result = cmd.run(&GoalAction::Start(id));
        }
    }

    print_output(&cmd.format_output(&result, &goal_options(output)));
    success_to_exit_code(result.success)
}

fn run_goal_action(app: &App, action: GoalAction, output: OutputArgs) -> ExitCode {
    let cmd = GoalCommand::new(&app.store);
    let result = cmd.run(&action);
    print_output(&cmd.format_output(&result, &goal_options(output)));
    success_to_exit_code(result.success)
}

fn goal_options(output: OutputArgs) -> GoalOptions {
    GoalOptions {
        json: output.json,
        quiet: output.quiet,
    }
}

// =============================================================================
// Tests
// =============================================================================
