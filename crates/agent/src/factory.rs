//! Assistant provider factory.
//!
//! Creates the assistant client for the `assistant:` config section, checking
//! the API key the external assistant needs before anything is spawned.

use crate::client::AssistantClient;
use crate::providers::{CommandAssistant, PreviewAssistant};
use conjure_core::{AssistantConfig, AssistantProvider};
use std::sync::Arc;

/// Create an assistant client.
///
/// # Arguments
/// * `config` - The `assistant:` config section
/// * `api_key` - Value of the variable named by `config.api_key_env`, if set
/// * `json` - Preview output as JSON
///
/// # Errors
/// Returns error if:
/// - The command provider has no executable
/// - The command provider needs an API key and none was found
pub fn create_assistant(
    config: &AssistantConfig,
    api_key: Option<&str>,
    json: bool,
) -> Result<Arc<dyn AssistantClient>, String> {
    match config.provider {
        AssistantProvider::Preview => Ok(Arc::new(if json {
            PreviewAssistant::json()
        } else {
            PreviewAssistant::new()
        })),
        AssistantProvider::Command => {
            if config.executable.trim().is_empty() {
                return Err("assistant executable is not configured".to_string());
            }
            if let Some(ref var) = config.api_key_env {
                if api_key.map_or(true, |key| key.trim().is_empty()) {
                    return Err(format!(
                        "{} requires an API key; set {}",
                        config.executable, var
                    ));
                }
            }
            Ok(Arc::new(CommandAssistant::from_config(config)))
        }
    }
}
