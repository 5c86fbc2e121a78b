//! Argument resolution.
//!
//! Every declared argument ends up with a value: from the command line, from
//! its declared default, from the user at the terminal, or (optional
//! arguments only) the empty string. A required argument is never silently
//! blanked.

use crate::arguments::SuppliedArguments;
use crate::types::{ArgumentDecl, ArgumentSource, PromptTemplate, ResolvedArguments};
use conjure_core::{AppError, AppResult};

/// Source of values for arguments missing from the command line.
pub trait Prompter {
    /// Ask for a value for `decl`, blocking until one is given.
    fn ask(&mut self, decl: &ArgumentDecl) -> AppResult<String>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&mut self, decl: &ArgumentDecl) -> AppResult<String> {
        let answer: String = dialoguer::Input::new()
            .with_prompt(format!("Missing --{}. {}", decl.alias, decl.question_text()))
            .interact_text()
            .map_err(|e| AppError::Io(std::io::Error::other(e)))?;
        Ok(answer.trim().to_string())
    }
}

/// Resolve every declared argument of `template`, in declaration order.
///
/// `prompter` is `None` in non-interactive mode, where a missing required
/// argument is an error.
///
/// # Example
/// ```no_run
/// use conjure_prompt::{load_template, resolve_arguments, SuppliedArguments, TerminalPrompter};
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let template = load_template(Path::new("prompts"), "generate-unit-tests")?;
/// let mut prompter = TerminalPrompter;
/// let resolved = resolve_arguments(&template, &SuppliedArguments::new(), Some(&mut prompter))?;
/// println!("{} values", resolved.len());
/// # Ok(())
/// # }
/// ```
pub fn resolve_arguments(
    template: &PromptTemplate,
    supplied: &SuppliedArguments,
    mut prompter: Option<&mut dyn Prompter>,
) -> AppResult<ResolvedArguments> {
    let mut resolved = ResolvedArguments::new();

    for decl in &template.arguments {
        if let Some(value) = supplied.get(&decl.id) {
            resolved.insert(decl.id.clone(), value, ArgumentSource::CommandLine);
            continue;
        }

        if let Some(ref default) = decl.default {
            tracing::debug!("Using default for --{}: {}", decl.alias, default);
            resolved.insert(decl.id.clone(), default.clone(), ArgumentSource::Default);
            continue;
        }

        if !decl.required {
            tracing::debug!("Optional --{} not supplied, substituting empty value", decl.alias);
            resolved.insert(decl.id.clone(), "", ArgumentSource::Empty);
            continue;
        }

        match prompter.as_deref_mut() {
            Some(prompter) => {
                let value = ask_until_answered(prompter, decl)?;
                tracing::info!("Replacing {} with {}", decl.id, value);
                resolved.insert(decl.id.clone(), value, ArgumentSource::Interactive);
            }
            None => {
                return Err(AppError::MissingArgument {
                    alias: decl.alias.clone(),
                    question: decl.question_text(),
                });
            }
        }
    }

    Ok(resolved)
}

fn ask_until_answered(prompter: &mut dyn Prompter, decl: &ArgumentDecl) -> AppResult<String> {
    loop {
        let answer = prompter.ask(decl)?;
        if !answer.trim().is_empty() {
            return Ok(answer);
        }
        tracing::warn!("--{} is required", decl.alias);
    }
}
