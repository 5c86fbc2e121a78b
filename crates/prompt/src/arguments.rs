//! Command-line parsing for template arguments.
//!
//! The CLI only knows the command name up front; the remaining words are
//! parsed with a grammar generated from the template. Every declared
//! argument accepts `--<alias> <value>` and a positional slot in declaration
//! order.

use crate::types::PromptTemplate;
use clap::{error::ErrorKind, Arg, ArgAction, Command};
use conjure_core::{AppError, AppResult};
use std::collections::HashMap;

/// Values given on the command line, keyed by placeholder token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppliedArguments {
    values: HashMap<String, String>,
}

impl SuppliedArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<String>) {
        self.values.insert(id.into(), value.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.values.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of parsing the words after the command name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedArguments {
    Supplied(SuppliedArguments),
    /// `--help` was requested; holds the rendered help text
    Help(String),
}

fn positional_id(alias: &str) -> String {
    format!("{}@position", alias)
}

/// Build the clap grammar for `template`.
pub fn template_command(template: &PromptTemplate) -> Command {
    let mut command = Command::new(template.command.clone())
        .bin_name(format!("conjure {}", template.command))
        .no_binary_name(true)
        .disable_version_flag(true);

    if let Some(ref description) = template.description {
        command = command.about(description.clone());
    }

    for (index, decl) in template.arguments.iter().enumerate() {
        let mut help = decl.question_text();
        if let Some(ref default) = decl.default {
            help.push_str(&format!(" [default: {}]", default));
        } else if decl.required {
            help.push_str(" (required)");
        }

        command = command
            .arg(
                Arg::new(decl.alias.clone())
                    .long(decl.alias.clone())
                    .value_name("VALUE")
                    .action(ArgAction::Set)
                    .help(help),
            )
            .arg(
                Arg::new(positional_id(&decl.alias))
                    .index(index + 1)
                    .value_name(decl.alias.to_uppercase())
                    .action(ArgAction::Set)
                    .conflicts_with(decl.alias.clone())
                    .hide(true),
            );
    }

    command
}

/// Parse the words following the command name.
///
/// # Errors
/// `InvalidArguments` for unknown flags, surplus positionals, or an argument
/// given both positionally and by flag.
pub fn parse_arguments<I, S>(template: &PromptTemplate, words: I) -> AppResult<ParsedArguments>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let words: Vec<String> = words.into_iter().map(Into::into).collect();

    let matches = match template_command(template).try_get_matches_from(&words) {
        Ok(matches) => matches,
        Err(e) if e.kind() == ErrorKind::DisplayHelp => {
            return Ok(ParsedArguments::Help(e.render().to_string()));
        }
        Err(e) => {
            let rendered = e.render().to_string();
            let message = rendered.trim();
            return Err(AppError::InvalidArguments(
                message.strip_prefix("error: ").unwrap_or(message).to_string(),
            ));
        }
    };

    let mut supplied = SuppliedArguments::new();
    for decl in &template.arguments {
        let value = matches
            .get_one::<String>(&decl.alias)
            .or_else(|| matches.get_one::<String>(&positional_id(&decl.alias)));

        if let Some(value) = value {
            tracing::info!("Replacing {} with {}", decl.id, value);
            supplied.insert(decl.id.clone(), value.clone());
        }
    }

    Ok(ParsedArguments::Supplied(supplied))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArgumentDecl;

    fn decl(id: &str, alias: &str) -> ArgumentDecl {
        ArgumentDecl {
            id: id.to_string(),
            alias: alias.to_string(),
            question: Some(format!("Which {}?", alias)),
            required: true,
            default: None,
            context: false,
        }
    }

    fn template() -> PromptTemplate {
        PromptTemplate {
            command: "test-arguments".to_string(),
            description: Some("Test a method".to_string()),
            arguments: vec![decl("%CLASS%", "class"), decl("%METHOD%", "method")],
            variables: Vec::new(),
            prompt: "Test method `%METHOD%` in class `%CLASS%`.".to_string(),
            context: Vec::new(),
        }
    }

    fn supplied(words: &[&str]) -> SuppliedArguments {
        match parse_arguments(&template(), words.iter().copied()).unwrap() {
            ParsedArguments::Supplied(s) => s,
            ParsedArguments::Help(_) => panic!("unexpected help"),
        }
    }

    #[test]
    fn test_named_arguments() {
        let s = supplied(&["--class", "TestClass", "--method", "start"]);
        assert_eq!(s.get("%CLASS%"), Some("TestClass"));
        assert_eq!(s.get("%METHOD%"), Some("start"));
    }

    #[test]
    fn test_equals_syntax() {
        let s = supplied(&["--class=App\\Foo"]);
        assert_eq!(s.get("%CLASS%"), Some("App\\Foo"));
        assert_eq!(s.get("%METHOD%"), None);
    }

    #[test]
    fn test_positional_arguments_follow_declaration_order() {
        let s = supplied(&["TestClass", "start"]);
        assert_eq!(s.get("%CLASS%"), Some("TestClass"));
        assert_eq!(s.get("%METHOD%"), Some("start"));
    }

    #[test]
    fn test_mixed_positional_and_named() {
        let s = supplied(&["TestClass", "--method", "start"]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.get("%METHOD%"), Some("start"));
    }

    #[test]
    fn test_nothing_supplied() {
        assert!(supplied(&[]).is_empty());
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let result = parse_arguments(&template(), ["--colour", "red"]);
        assert!(matches!(result, Err(AppError::InvalidArguments(_))));
    }

    #[test]
    fn test_surplus_positional_is_rejected() {
        let result = parse_arguments(&template(), ["A", "b", "c"]);
        assert!(matches!(result, Err(AppError::InvalidArguments(_))));
    }

    #[test]
    fn test_same_argument_twice_is_rejected() {
        let result = parse_arguments(&template(), ["TestClass", "--class", "Other"]);
        assert!(matches!(result, Err(AppError::InvalidArguments(_))));
    }

    #[test]
    fn test_help_lists_aliases_and_questions() {
        match parse_arguments(&template(), ["--help"]).unwrap() {
            ParsedArguments::Help(text) => {
                assert!(text.contains("--class"));
                assert!(text.contains("Which method?"));
                assert!(text.contains("Test a method"));
            }
            other => panic!("expected help, got {:?}", other),
        }
    }

    #[test]
    fn test_generated_command_is_consistent() {
        template_command(&template()).debug_assert();
    }
}
