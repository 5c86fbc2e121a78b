//! Assistant dispatch crate for the conjure CLI.
//!
//! This crate hands an assembled prompt and its context files to an external
//! AI coding assistant through a provider-agnostic trait.
//!
//! # Providers
//! - **Command**: spawns the configured assistant executable (default)
//! - **Preview**: prints the request, used by `--dry-run`
//!
//! # Example
//! ```no_run
//! use conjure_agent::{AssistantClient, AssistantRequest, providers::CommandAssistant};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let assistant = CommandAssistant::new("mentat");
//! let request = AssistantRequest::new("Write unit tests").with_context_files(vec!["tests".into()]);
//! let outcome = assistant.dispatch(&request).await?;
//! println!("{:?}", outcome.exit_code);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{AssistantClient, AssistantOutcome, AssistantRequest};
pub use factory::create_assistant;
pub use providers::{CommandAssistant, PreviewAssistant};
