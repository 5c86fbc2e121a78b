//! Assistant client abstraction and request/outcome types.
//!
//! The assistant is an external collaborator: this crate hands it a prompt
//! and a list of context files and reports whether it succeeded. It does
//! not interpret or retry failures.

use conjure_core::AppResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A prompt plus the files the assistant should load as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    /// Fully substituted prompt text
    pub prompt: String,

    /// Context files, relative to the working directory
    #[serde(default)]
    pub context_files: Vec<PathBuf>,

    /// Directory the assistant runs in (default: current directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl AssistantRequest {
    /// Create a new request with no context files.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            context_files: Vec::new(),
            working_dir: None,
        }
    }

    /// Attach context files.
    pub fn with_context_files(mut self, files: impl IntoIterator<Item = PathBuf>) -> Self {
        self.context_files.extend(files);
        self
    }

    /// Run the assistant in `dir`.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// What the assistant reported back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantOutcome {
    /// Provider that handled the request
    pub provider: String,

    /// Process exit code, when a process ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// Trait for assistant providers.
#[async_trait::async_trait]
pub trait AssistantClient: Send + Sync {
    /// Get the provider name (e.g., "command", "preview").
    fn provider_name(&self) -> &str;

    /// Hand the request to the assistant and wait until it is done.
    ///
    /// # Errors
    /// `AppError::Dispatch` when the assistant cannot be started or reports failure.
    async fn dispatch(&self, request: &AssistantRequest) -> AppResult<AssistantOutcome>;
}
