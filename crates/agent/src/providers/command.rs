//! Assistant provider that runs an external executable.
//!
//! The command line is `<executable> <args...> [<prompt-flag> <prompt>]
//! [<context-flag>] <file>...`. Without a prompt flag the prompt is written
//! to the child's stdin, which is then closed. stdout and stderr are
//! inherited so the user watches the assistant work.

use crate::client::{AssistantClient, AssistantOutcome, AssistantRequest};
use conjure_core::{AppError, AppResult, AssistantConfig};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Runs the configured assistant executable once per request.
#[derive(Debug, Clone)]
pub struct CommandAssistant {
    executable: String,
    args: Vec<String>,
    prompt_flag: Option<String>,
    context_flag: Option<String>,
}

impl CommandAssistant {
    /// Create an assistant for `executable` with default settings.
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            prompt_flag: None,
            context_flag: None,
        }
    }

    /// Create an assistant from the `assistant:` config section.
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            args: config.args.clone(),
            prompt_flag: config.prompt_flag.clone(),
            context_flag: config.context_flag.clone(),
        }
    }

    /// Extra arguments placed before the prompt and context files.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Pass the prompt behind `flag` instead of on stdin.
    pub fn with_prompt_flag(mut self, flag: impl Into<String>) -> Self {
        self.prompt_flag = Some(flag.into());
        self
    }

    /// Put `flag` before every context file.
    pub fn with_context_flag(mut self, flag: impl Into<String>) -> Self {
        self.context_flag = Some(flag.into());
        self
    }

    fn prompt_on_stdin(&self) -> bool {
        self.prompt_flag.is_none()
    }

    /// Build the process invocation for `request`.
    fn build_command(&self, request: &AssistantRequest) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(&self.args);

        if let Some(ref flag) = self.prompt_flag {
            cmd.arg(flag).arg(&request.prompt);
        }

        for file in &request.context_files {
            if let Some(ref flag) = self.context_flag {
                cmd.arg(flag);
            }
            cmd.arg(file);
        }

        if let Some(ref dir) = request.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(if self.prompt_on_stdin() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        })
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

        cmd
    }
}

#[async_trait::async_trait]
impl AssistantClient for CommandAssistant {
    fn provider_name(&self) -> &str {
        "command"
    }

    async fn dispatch(&self, request: &AssistantRequest) -> AppResult<AssistantOutcome> {
        tracing::info!("Running {} now...", self.executable);
        tracing::debug!("Request: {:?}", request);

        let mut child = self.build_command(request).spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::Dispatch(format!(
                    "assistant executable '{}' not found",
                    self.executable
                ))
            } else {
                AppError::Dispatch(format!("failed to start '{}': {}", self.executable, e))
            }
        })?;

        if self.prompt_on_stdin() {
            if let Some(mut stdin) = child.stdin.take() {
                let mut buf = request.prompt.clone().into_bytes();
                buf.push(b'\n');
                // A child that exits without reading stdin is judged by its exit status
                if let Err(e) = stdin.write_all(&buf).await {
                    tracing::warn!("Could not write prompt to {}: {}", self.executable, e);
                }
                drop(stdin);
            }
        }

        let status = child.wait().await.map_err(|e| {
            AppError::Dispatch(format!("failed waiting for '{}': {}", self.executable, e))
        })?;

        if !status.success() {
            let msg = match status.code() {
                Some(code) => format!("'{}' exited with code {}", self.executable, code),
                None => format!("'{}' terminated by signal", self.executable),
            };
            return Err(AppError::Dispatch(msg));
        }

        tracing::info!("Done. {} finished its work.", self.executable);

        Ok(AssistantOutcome {
            provider: self.provider_name().to_string(),
            exit_code: status.code(),
        })
    }
}
