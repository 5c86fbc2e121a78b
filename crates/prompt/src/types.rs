//! Prompt types for the conjure CLI.
//!
//! This module defines the domain entities for the prompt system. The XML
//! document shapes live in the loader; everything here has already passed
//! structural validation.

use crate::converter::Converter;
use serde::Serialize;
use std::path::PathBuf;

/// A validated prompt template loaded from `<command>.xml`.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    /// Command name (file stem of the template)
    pub command: String,

    /// Optional one-line description shown by `--list` and `--help`
    pub description: Option<String>,

    /// Argument declarations in declaration order
    pub arguments: Vec<ArgumentDecl>,

    /// Converted placeholders derived from arguments
    pub variables: Vec<VariableDecl>,

    /// Template text with placeholder tokens, trimmed
    pub prompt: String,

    /// Explicit `<include>` entries in document order
    pub context: Vec<ContextInclude>,
}

impl PromptTemplate {
    /// Find an argument by its placeholder token.
    pub fn argument(&self, id: &str) -> Option<&ArgumentDecl> {
        self.arguments.iter().find(|a| a.id == id)
    }

    /// Whether `id` names an argument or a variable.
    pub fn declares(&self, id: &str) -> bool {
        self.argument(id).is_some() || self.variables.iter().any(|v| v.id == id)
    }

    /// All placeholder tokens, arguments first, in declaration order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.arguments
            .iter()
            .map(|a| a.id.as_str())
            .chain(self.variables.iter().map(|v| v.id.as_str()))
    }
}

/// A declared template argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDecl {
    /// Placeholder token replaced in the prompt text (e.g. `%CLASS%`)
    pub id: String,

    /// Name of the `--alias` flag
    pub alias: String,

    /// Question asked when the value is missing
    pub question: Option<String>,

    pub required: bool,

    /// Fallback when the argument is absent
    pub default: Option<String>,

    /// Add the value to the context file list
    pub context: bool,
}

impl ArgumentDecl {
    /// Question text for interactive prompts and help output.
    pub fn question_text(&self) -> String {
        match self.question {
            Some(ref q) if !q.trim().is_empty() => q.trim().to_string(),
            _ => format!("Value for --{}?", self.alias),
        }
    }
}

/// A placeholder whose value is a converter applied to an argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDecl {
    pub id: String,

    /// Placeholder token of the source argument
    pub argument: String,

    pub converter: Converter,

    /// Add the converted value to the context file list
    pub context: bool,
}

/// One `<include path="..."/>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextInclude {
    /// Literal path, relative to the workspace
    Path(PathBuf),
    /// `$<token>`: the resolved value of an argument or variable
    Placeholder(String),
}

impl ContextInclude {
    /// Parse the raw `path` attribute.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('$') {
            Some(token) => Self::Placeholder(token.to_string()),
            None => Self::Path(PathBuf::from(raw)),
        }
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ArgumentSource {
    CommandLine,
    Default,
    Interactive,
    /// Optional argument without default that nobody supplied
    Empty,
}

/// A concrete value for one declared argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArgument {
    pub id: String,
    pub value: String,
    pub source: ArgumentSource,
}

/// Resolved values for every declared argument, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedArguments {
    values: Vec<ResolvedArgument>,
}

impl ResolvedArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value; a later value for the same id replaces the earlier one.
    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<String>, source: ArgumentSource) {
        let id = id.into();
        let value = value.into();
        match self.values.iter_mut().find(|r| r.id == id) {
            Some(existing) => {
                existing.value = value;
                existing.source = source;
            }
            None => self.values.push(ResolvedArgument { id, value, source }),
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedArgument> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A fully assembled prompt ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledPrompt {
    /// Source command name
    pub command: String,

    /// Prompt text after substitution
    pub prompt: String,

    /// Ordered, de-duplicated context files
    pub context_files: Vec<PathBuf>,

    /// Token → value table used for substitution, in declaration order
    pub replacements: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_include_parse() {
        assert_eq!(
            ContextInclude::parse("$%CLASS_PATH%"),
            ContextInclude::Placeholder("%CLASS_PATH%".to_string())
        );
        assert_eq!(
            ContextInclude::parse("tests"),
            ContextInclude::Path(PathBuf::from("tests"))
        );
    }

    #[test]
    fn test_question_text_fallback() {
        let mut decl = ArgumentDecl {
            id: "%CLASS%".to_string(),
            alias: "class".to_string(),
            question: None,
            required: true,
            default: None,
            context: false,
        };
        assert_eq!(decl.question_text(), "Value for --class?");

        decl.question = Some("  Which class?  ".to_string());
        assert_eq!(decl.question_text(), "Which class?");
    }

    #[test]
    fn test_resolved_arguments_replace() {
        let mut resolved = ResolvedArguments::new();
        resolved.insert("%A%", "one", ArgumentSource::Default);
        resolved.insert("%B%", "two", ArgumentSource::CommandLine);
        resolved.insert("%A%", "three", ArgumentSource::Interactive);

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.get("%A%"), Some("three"));
        assert_eq!(resolved.iter().next().unwrap().source, ArgumentSource::Interactive);
        assert_eq!(resolved.get("%C%"), None);
    }
}
