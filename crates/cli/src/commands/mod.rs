//! Command handlers for the conjure CLI.
//!
//! `run` executes one prompt template; `list` shows the templates available.

pub mod list;
pub mod run;

// Re-export command types for convenience
pub use list::ListCommand;
pub use run::RunCommand;
