//! conjure CLI
//!
//! Main entry point for the conjure command-line tool.
//! Runs XML prompt templates through an external AI coding assistant.

mod commands;

use clap::{Parser, Subcommand};
use commands::{ListCommand, RunCommand};
use conjure_core::{config::AppConfig, logging, AppError, AppResult, ConfigOverrides};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

/// conjure - run prompt templates through an AI coding assistant
#[derive(Parser, Debug)]
#[command(name = "conjure")]
#[command(about = "Run XML prompt templates through an AI coding assistant", long_about = None)]
#[command(version)]
#[command(subcommand_value_name = "COMMAND")]
struct Cli {
    /// Directory holding <command>.xml templates
    #[arg(short, long = "promptsdir", value_name = "DIR")]
    prompts_dir: Option<PathBuf>,

    /// Path to workspace directory (default: current directory)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// composer.json used to resolve class names to files
    #[arg(long, value_name = "FILE")]
    composer_json: Option<PathBuf>,

    /// Log filter (error, warn, info, debug, trace, or a directive list)
    #[arg(long)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Fail instead of asking for missing arguments
    #[arg(long)]
    no_interactive: bool,

    /// Print the prompt and context files instead of running the assistant
    #[arg(long)]
    dry_run: bool,

    /// JSON output for --dry-run and --list
    #[arg(long)]
    json: bool,

    /// List available templates
    #[arg(long, conflicts_with = "dry_run")]
    list: bool,

    #[command(subcommand)]
    invocation: Option<Invocation>,
}

#[derive(Subcommand, Debug)]
enum Invocation {
    /// Any template name; the remaining words are the template's arguments
    #[command(external_subcommand)]
    Template(Vec<String>),
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            workspace: self.workspace.clone(),
            config_file: self.config.clone(),
            prompts_dir: self.prompts_dir.clone(),
            composer_json: self.composer_json.clone(),
            log_level: self.log_level.clone(),
            verbose: self.verbose,
            no_color: self.no_color,
        }
    }

    /// Move global flags found among the template words into `self`.
    ///
    /// Flags given after the command name win over the same flags given
    /// before it. Everything after `--` belongs to the template.
    fn hoist_trailing_globals(&mut self) -> AppResult<()> {
        let Some(Invocation::Template(words)) = self.invocation.as_mut() else {
            return Ok(());
        };
        if words.len() < 2 {
            return Ok(());
        }

        let (globals, rest) = split_global_flags(&words[1..]);
        if globals.is_empty() {
            return Ok(());
        }
        words.truncate(1);
        words.extend(rest);

        tracing::debug!("Global flags after the command: {:?}", globals);
        let trailing = Cli::try_parse_from(std::iter::once("conjure".to_string()).chain(globals))
            .map_err(|e| {
                let rendered = e.render().to_string();
                let message = rendered.trim();
                AppError::InvalidArguments(
                    message.strip_prefix("error: ").unwrap_or(message).to_string(),
                )
            })?;
        self.absorb(trailing);

        Ok(())
    }

    fn absorb(&mut self, other: Cli) {
        self.prompts_dir = other.prompts_dir.or(self.prompts_dir.take());
        self.workspace = other.workspace.or(self.workspace.take());
        self.config = other.config.or(self.config.take());
        self.composer_json = other.composer_json.or(self.composer_json.take());
        self.log_level = other.log_level.or(self.log_level.take());
        self.verbose |= other.verbose;
        self.no_color |= other.no_color;
        self.no_interactive |= other.no_interactive;
        self.dry_run |= other.dry_run;
        self.json |= other.json;
    }
}

/// Global flags accepted after the command name: long name, short name,
/// and whether the flag takes a value.
const TRAILING_GLOBALS: &[(&str, Option<char>, bool)] = &[
    ("promptsdir", Some('p'), true),
    ("workspace", Some('w'), true),
    ("config", Some('c'), true),
    ("composer-json", None, true),
    ("log-level", None, true),
    ("verbose", Some('v'), false),
    ("no-color", None, false),
    ("no-interactive", None, false),
    ("dry-run", None, false),
    ("json", None, false),
];

/// Split template words into global flags (with their values) and the rest.
fn split_global_flags(words: &[String]) -> (Vec<String>, Vec<String>) {
    let mut globals = Vec::new();
    let mut rest = Vec::new();
    let mut iter = words.iter();

    while let Some(word) = iter.next() {
        if word == "--" {
            rest.push(word.clone());
            rest.extend(iter.cloned());
            break;
        }

        match global_flag(word) {
            Some(needs_value) => {
                globals.push(word.clone());
                if needs_value {
                    if let Some(value) = iter.next() {
                        globals.push(value.clone());
                    }
                }
            }
            None => rest.push(word.clone()),
        }
    }

    (globals, rest)
}

/// If `word` is a global flag, whether a separate value word follows it.
fn global_flag(word: &str) -> Option<bool> {
    if let Some(long) = word.strip_prefix("--") {
        let (name, inline_value) = match long.split_once('=') {
            Some((name, _)) => (name, true),
            None => (long, false),
        };
        return TRAILING_GLOBALS
            .iter()
            .find(|(flag, _, _)| *flag == name)
            .map(|(_, _, takes_value)| *takes_value && !inline_value);
    }

    let mut chars = word.strip_prefix('-')?.chars();
    let short = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    TRAILING_GLOBALS
        .iter()
        .find(|(_, flag, _)| *flag == Some(short))
        .map(|(_, _, takes_value)| *takes_value)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(mut cli: Cli) -> AppResult<()> {
    // Global flags may also follow the command name
    cli.hoist_trailing_globals()?;

    // Merge defaults, config file, environment and flags
    let config = AppConfig::load(&cli.overrides())?;
    config.validate()?;

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("conjure starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Prompts: {:?}", config.prompts_path());
    tracing::debug!(
        "Assistant: {} ({})",
        config.assistant.provider.as_str(),
        config.assistant.executable
    );

    if cli.list {
        let _span = tracing::info_span!("command", name = "list").entered();
        return ListCommand { json: cli.json }.execute(&config);
    }

    let (command, words) = match cli.invocation {
        Some(Invocation::Template(words)) => match words.split_first() {
            Some((command, rest)) => (command.clone(), rest.to_vec()),
            None => return Err(no_command()),
        },
        None => return Err(no_command()),
    };

    let _span = tracing::info_span!("command", name = %command).entered();

    let run = RunCommand {
        command,
        words,
        interactive: !cli.no_interactive && std::io::stdin().is_terminal(),
        dry_run: cli.dry_run,
        json: cli.json,
    };
    let result = run.execute(&config).await;

    if result.is_ok() {
        tracing::info!("Command completed successfully");
    }

    result
}

fn no_command() -> AppError {
    AppError::InvalidArguments(
        "no command given; run `conjure --list` to see the available templates".to_string(),
    )
}
