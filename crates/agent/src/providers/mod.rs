//! Assistant provider implementations.

pub mod command;
pub mod preview;

pub use command::CommandAssistant;
pub use preview::PreviewAssistant;
