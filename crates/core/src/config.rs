//! Configuration management for the conjure CLI.
//!
//! This module handles loading and merging configuration from multiple sources,
//! lowest precedence first:
//! - Built-in defaults
//! - Config file (`.conjure/config.yaml` in the workspace, or `--config`)
//! - Environment variables
//! - Command-line flags
//!
//! Relative paths are resolved against the workspace root.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default directory holding `<command>.xml` files.
pub const DEFAULT_PROMPTS_DIR: &str = "prompts";

/// Default location of the composer manifest used by the class path converter.
pub const DEFAULT_COMPOSER_JSON: &str = "composer.json";

/// Default assistant executable.
pub const DEFAULT_ASSISTANT: &str = "mentat";

/// Default environment variable the assistant reads its API key from.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .conjure/)
    pub workspace: PathBuf,

    /// Config file that was merged, if any
    pub config_file: Option<PathBuf>,

    /// Directory holding the command definition XML files
    pub prompts_dir: PathBuf,

    /// composer.json consulted by `resolveClassPath`
    pub composer_json: PathBuf,

    /// What to do with context paths that do not exist
    pub missing_context: MissingContextPolicy,

    /// External assistant settings
    pub assistant: AssistantConfig,

    /// Log filter override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Handling of context paths that are missing on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingContextPolicy {
    /// Warn and leave the path out of the context list
    #[default]
    Skip,
    /// Abort the invocation
    Fail,
}

/// Which assistant implementation handles the assembled prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantProvider {
    /// Spawn the configured executable
    #[default]
    Command,
    /// Print the prompt instead of dispatching it
    Preview,
}

impl AssistantProvider {
    /// Parse provider from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "command" | "cmd" => Some(Self::Command),
            "preview" | "dry-run" => Some(Self::Preview),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Preview => "preview",
        }
    }
}

/// External assistant configuration (`assistant:` section of config.yaml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssistantConfig {
    pub provider: AssistantProvider,

    /// Executable name or path
    pub executable: String,

    /// Extra arguments placed before the context files
    pub args: Vec<String>,

    /// Flag that carries the prompt; `None` writes the prompt to stdin
    pub prompt_flag: Option<String>,

    /// Flag placed before each context file; `None` passes them positionally
    pub context_flag: Option<String>,

    /// Environment variable holding the assistant's API key; `None` skips the check
    pub api_key_env: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            provider: AssistantProvider::Command,
            executable: DEFAULT_ASSISTANT.to_string(),
            args: Vec::new(),
            prompt_flag: None,
            context_flag: None,
            api_key_env: Some(DEFAULT_API_KEY_ENV.to_string()),
        }
    }
}

impl AssistantConfig {
    /// Look up the API key in the environment variable named by `api_key_env`.
    ///
    /// Returns `None` when no variable is configured or it is unset or blank.
    pub fn resolve_api_key_with<F>(&self, env: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = self.api_key_env.as_deref()?;
        env(name).filter(|value| !value.trim().is_empty())
    }

    /// Look up the API key in the process environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }
}

/// Command-line values that take precedence over every other source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workspace: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub prompts_dir: Option<PathBuf>,
    pub composer_json: Option<PathBuf>,
    pub log_level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    prompts: Option<PromptsConfig>,
    converters: Option<ConvertersConfig>,
    context: Option<ContextConfig>,
    assistant: Option<AssistantConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PromptsConfig {
    dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConvertersConfig {
    composer_json: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextConfig {
    on_missing: Option<MissingContextPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            prompts_dir: PathBuf::from(DEFAULT_PROMPTS_DIR),
            composer_json: PathBuf::from(DEFAULT_COMPOSER_JSON),
            missing_context: MissingContextPolicy::default(),
            assistant: AssistantConfig::default(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config file, environment and CLI flags.
    ///
    /// Environment variables:
    /// - `CONJURE_WORKSPACE`: Override workspace path
    /// - `CONJURE_CONFIG`: Path to config file
    /// - `CONJURE_PROMPTS_DIR`: Prompts directory
    /// - `CONJURE_ASSISTANT`: Assistant executable
    /// - `CONJURE_PROVIDER`: Assistant provider (`command` or `preview`)
    /// - `RUST_LOG`: Log filter
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use conjure_core::config::{AppConfig, ConfigOverrides};
    ///
    /// let config = AppConfig::load(&ConfigOverrides::default()).expect("Failed to load config");
    /// println!("Prompts: {:?}", config.prompts_path());
    /// ```
    pub fn load(overrides: &ConfigOverrides) -> AppResult<Self> {
        Self::load_with_env(overrides, |key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::load`], reading the environment through `env`.
    pub fn load_with_env<F>(overrides: &ConfigOverrides, env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workspace) = overrides
            .workspace
            .clone()
            .or_else(|| env("CONJURE_WORKSPACE").map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        let explicit_file = overrides
            .config_file
            .clone()
            .or_else(|| env("CONJURE_CONFIG").map(PathBuf::from));

        if !config.workspace.is_dir() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        match explicit_file {
            Some(path) => {
                let path = config.resolve_path(&path);
                if !path.is_file() {
                    return Err(AppError::Config(format!(
                        "Config file not found: {:?}",
                        path
                    )));
                }
                config.merge_yaml(&path)?;
            }
            None => {
                let path = config.default_config_path();
                if path.is_file() {
                    config.merge_yaml(&path)?;
                }
            }
        }

        config.apply_env(&env)?;
        config.apply_overrides(overrides);

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &Path) -> AppResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|e| {
                AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        };

        if let Some(dir) = file.prompts.and_then(|p| p.dir) {
            self.prompts_dir = dir;
        }

        if let Some(composer) = file.converters.and_then(|c| c.composer_json) {
            self.composer_json = composer;
        }

        if let Some(policy) = file.context.and_then(|c| c.on_missing) {
            self.missing_context = policy;
        }

        if let Some(assistant) = file.assistant {
            self.assistant = assistant;
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        self.config_file = Some(path.to_path_buf());
        tracing::debug!("Merged config file {:?}", path);

        Ok(())
    }

    fn apply_env<F>(&mut self, env: &F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = env("CONJURE_PROMPTS_DIR") {
            self.prompts_dir = PathBuf::from(dir);
        }

        if let Some(executable) = env("CONJURE_ASSISTANT") {
            self.assistant.executable = executable;
        }

        if let Some(provider) = env("CONJURE_PROVIDER") {
            self.assistant.provider = AssistantProvider::parse(&provider).ok_or_else(|| {
                AppError::Config(format!(
                    "CONJURE_PROVIDER must be 'command' or 'preview', got '{}'",
                    provider
                ))
            })?;
        }

        if let Some(level) = env("RUST_LOG") {
            self.log_level = Some(level);
        }

        if env("NO_COLOR").is_some() {
            self.no_color = true;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref dir) = overrides.prompts_dir {
            self.prompts_dir = dir.clone();
        }

        if let Some(ref composer) = overrides.composer_json {
            self.composer_json = composer.clone();
        }

        if let Some(ref level) = overrides.log_level {
            self.log_level = Some(level.clone());
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging unless a filter was given on the CLI
            if overrides.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }
    }

    /// Get the path to the .conjure directory.
    pub fn conjure_dir(&self) -> PathBuf {
        self.workspace.join(".conjure")
    }

    fn default_config_path(&self) -> PathBuf {
        self.conjure_dir().join("config.yaml")
    }

    /// Resolve `path` against the workspace unless it is absolute.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Absolute prompts directory.
    pub fn prompts_path(&self) -> PathBuf {
        self.resolve_path(&self.prompts_dir)
    }

    /// Absolute composer.json path.
    pub fn composer_path(&self) -> PathBuf {
        self.resolve_path(&self.composer_json)
    }

    /// Validate the assistant section.
    pub fn validate(&self) -> AppResult<()> {
        if self.assistant.provider == AssistantProvider::Command
            && self.assistant.executable.trim().is_empty()
        {
            return Err(AppError::Config(
                "assistant.executable cannot be empty".to_string(),
            ));
        }

        for flag in [&self.assistant.prompt_flag, &self.assistant.context_flag]
            .into_iter()
            .flatten()
        {
            if flag.trim().is_empty() {
                return Err(AppError::Config(
                    "assistant flags cannot be empty strings".to_string(),
                ));
            }
        }

        Ok(())
    }
}
