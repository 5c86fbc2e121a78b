//! Prompt assembly: placeholder substitution and context collection.

use crate::converter::ConversionContext;
use crate::types::{AssembledPrompt, ContextInclude, PromptTemplate, ResolvedArguments};
use conjure_core::{AppError, AppResult, MissingContextPolicy};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Settings for [`assemble_prompt`].
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Root that relative context paths are checked against
    pub workspace: PathBuf,

    /// What to do with context paths missing on disk
    pub missing_context: MissingContextPolicy,
}

impl AssembleOptions {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            missing_context: MissingContextPolicy::default(),
        }
    }

    pub fn with_missing_context(mut self, policy: MissingContextPolicy) -> Self {
        self.missing_context = policy;
        self
    }
}

/// Build the final prompt and context list from a template and resolved arguments.
///
/// This function:
/// 1. Evaluates variables by applying their converter to the source argument
/// 2. Substitutes every placeholder token in a single pass
/// 3. Collects `<include>` entries and context-flagged declarations, without duplicates
/// 4. Applies the missing-context policy
///
/// # Example
/// ```no_run
/// use conjure_prompt::{assemble_prompt, AssembleOptions, ConversionContext, PromptTemplate, ResolvedArguments};
///
/// # fn example(template: PromptTemplate, resolved: ResolvedArguments) -> Result<(), Box<dyn std::error::Error>> {
/// let mut conversions = ConversionContext::new("composer.json");
/// let assembled = assemble_prompt(&template, &resolved, &mut conversions, &AssembleOptions::new("."))?;
/// println!("{}", assembled.prompt);
/// # Ok(())
/// # }
/// ```
pub fn assemble_prompt(
    template: &PromptTemplate,
    resolved: &ResolvedArguments,
    conversions: &mut ConversionContext,
    options: &AssembleOptions,
) -> AppResult<AssembledPrompt> {
    tracing::debug!("Assembling prompt: {}", template.command);

    let mut replacements: Vec<(String, String)> = template
        .arguments
        .iter()
        .map(|decl| -> AppResult<(String, String)> {
            let value = resolved.get(&decl.id).ok_or_else(|| {
                AppError::Other(format!("argument {} was not resolved", decl.id))
            })?;
            Ok((decl.id.clone(), value.to_string()))
        })
        .collect::<AppResult<_>>()?;

    for var in &template.variables {
        let source = resolved.get(&var.argument).ok_or_else(|| {
            AppError::Other(format!("argument {} was not resolved", var.argument))
        })?;

        // An absent optional argument yields an empty variable
        let value = if source.is_empty() {
            String::new()
        } else {
            var.converter.apply(source, conversions)?
        };

        tracing::info!("Replacing {} with {}", var.id, value);
        replacements.push((var.id.clone(), value));
    }

    tracing::info!("Raw prompt: {}", template.prompt);
    let prompt = substitute(&template.prompt, &replacements)?;
    tracing::info!("{}", prompt);

    let context_files = collect_context(template, &replacements, options)?;
    tracing::info!("Files to include as context: {:?}", context_files);

    Ok(AssembledPrompt {
        command: template.command.clone(),
        prompt,
        context_files,
        replacements,
    })
}

/// Replace every token in `text` by its value in one left-to-right pass.
///
/// When tokens overlap at a position the longest one wins. Replaced text is
/// never scanned again, so values containing tokens are inserted verbatim.
pub fn substitute(text: &str, replacements: &[(String, String)]) -> AppResult<String> {
    let mut tokens: Vec<&(String, String)> = replacements
        .iter()
        .filter(|(token, _)| !token.is_empty())
        .collect();
    if tokens.is_empty() {
        return Ok(text.to_string());
    }

    // Longest first so the leftmost-first alternation prefers the longest token
    tokens.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let pattern = tokens
        .iter()
        .map(|(token, _)| regex::escape(token))
        .collect::<Vec<_>>()
        .join("|");
    let matcher = Regex::new(&pattern)
        .map_err(|e| AppError::Other(format!("Failed to build placeholder matcher: {}", e)))?;

    let rendered = matcher.replace_all(text, |caps: &regex::Captures<'_>| {
        let token = &caps[0];
        tokens
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| token.to_string())
    });

    Ok(rendered.into_owned())
}

fn collect_context(
    template: &PromptTemplate,
    replacements: &[(String, String)],
    options: &AssembleOptions,
) -> AppResult<Vec<PathBuf>> {
    let lookup = |token: &str| {
        replacements
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    };

    let mut candidates: Vec<String> = Vec::new();

    for include in &template.context {
        match include {
            ContextInclude::Path(path) => candidates.push(path.to_string_lossy().into_owned()),
            ContextInclude::Placeholder(token) => match lookup(token.as_str()) {
                Some(value) => candidates.push(value.to_string()),
                None => tracing::warn!(
                    "Couldn't determine value of ${}. Not adding to context.",
                    token
                ),
            },
        }
    }

    let flagged = template
        .arguments
        .iter()
        .filter(|a| a.context)
        .map(|a| a.id.as_str())
        .chain(
            template
                .variables
                .iter()
                .filter(|v| v.context)
                .map(|v| v.id.as_str()),
        );
    for token in flagged {
        if let Some(value) = lookup(token) {
            candidates.push(value.to_string());
        }
    }

    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for candidate in candidates {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            continue;
        }

        let path = normalize(Path::new(candidate));
        if !seen.insert(path.clone()) {
            tracing::debug!("Skipping duplicate context path {:?}", path);
            continue;
        }

        let on_disk = if path.is_absolute() {
            path.clone()
        } else {
            options.workspace.join(&path)
        };

        if !on_disk.exists() {
            match options.missing_context {
                MissingContextPolicy::Skip => {
                    tracing::warn!("Context path {:?} does not exist. Not adding to context.", path);
                    continue;
                }
                MissingContextPolicy::Fail => return Err(AppError::MissingContextFile(path)),
            }
        }

        files.push(path);
    }

    Ok(files)
}

/// Drop `.` components so `./src/a.php` and `src/a.php` compare equal.
fn normalize(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}
