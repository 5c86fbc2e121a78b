//! Provider that prints the assembled request instead of dispatching it.
//!
//! Backs `--dry-run`: the output is exactly what the command provider would
//! have handed to the assistant.

use crate::client::{AssistantClient, AssistantOutcome, AssistantRequest};
use conjure_core::AppResult;
use std::io::Write;

#[derive(Debug, Clone, Default)]
pub struct PreviewAssistant {
    json: bool,
}

impl PreviewAssistant {
    /// Plain text preview.
    pub fn new() -> Self {
        Self::default()
    }

    /// Preview as a JSON object (`prompt`, `contextFiles`).
    pub fn json() -> Self {
        Self { json: true }
    }

    /// Render the request the way it will be printed.
    pub fn render(&self, request: &AssistantRequest) -> AppResult<String> {
        if self.json {
            let value = serde_json::json!({
                "prompt": request.prompt,
                "contextFiles": request.context_files,
            });
            return Ok(serde_json::to_string_pretty(&value)?);
        }

        let mut out = String::new();
        out.push_str(&request.prompt);
        out.push('\n');
        if !request.context_files.is_empty() {
            out.push_str("\nContext files:\n");
            for file in &request.context_files {
                out.push_str("  ");
                out.push_str(&file.display().to_string());
                out.push('\n');
            }
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl AssistantClient for PreviewAssistant {
    fn provider_name(&self) -> &str {
        "preview"
    }

    async fn dispatch(&self, request: &AssistantRequest) -> AppResult<AssistantOutcome> {
        let rendered = self.render(request)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        if self.json {
            writeln!(stdout)?;
        }
        stdout.flush()?;

        Ok(AssistantOutcome {
            provider: self.provider_name().to_string(),
            exit_code: None,
        })
    }
}
