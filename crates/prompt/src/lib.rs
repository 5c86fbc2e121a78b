//! Prompt system for the conjure CLI.
//!
//! This crate turns an XML command definition plus command-line words into
//! a prompt and a list of context files:
//! - XML template loading and structural validation
//! - Per-template argument parsing
//! - Argument resolution with interactive fallback
//! - Converters (class name → file path)
//! - Placeholder substitution and context collection

pub mod arguments;
pub mod builder;
pub mod converter;
pub mod loader;
pub mod resolver;
pub mod types;

// Re-export main types
pub use arguments::{parse_arguments, template_command, ParsedArguments, SuppliedArguments};
pub use builder::{assemble_prompt, substitute, AssembleOptions};
pub use converter::{ConversionContext, Converter, Psr4Map};
pub use loader::{
    list_templates, load_template, parse_template, template_path, RESERVED_ALIASES,
};
pub use resolver::{resolve_arguments, Prompter, TerminalPrompter};
pub use types::{
    ArgumentDecl, ArgumentSource, AssembledPrompt, ContextInclude, PromptTemplate,
    ResolvedArgument, ResolvedArguments, VariableDecl,
};
