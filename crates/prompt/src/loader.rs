//! Template loader for XML command definitions.
//!
//! A command `foo` is defined by `<prompts_dir>/foo.xml`:
//!
//! ```xml
//! <command>
//!   <description>Generate unit tests</description>
//!   <argument id="%CLASS%" alias="class" question="Which class?"/>
//!   <variable id="%CLASS_PATH%" argument="%CLASS%" converter="resolveClassPath"/>
//!   <prompt>Write unit tests for `%CLASS%`.</prompt>
//!   <context>
//!     <include path="tests"/>
//!     <include path="$%CLASS_PATH%"/>
//!   </context>
//! </command>
//! ```
//!
//! Structural problems are reported at load time so that nothing fails
//! halfway through substitution.

use crate::converter::Converter;
use crate::types::{ArgumentDecl, ContextInclude, PromptTemplate, VariableDecl};
use conjure_core::{AppError, AppResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// File extension of command definitions.
pub const TEMPLATE_EXTENSION: &str = "xml";

/// Aliases owned by the CLI itself; global flags may follow the command name.
pub const RESERVED_ALIASES: &[&str] = &[
    "help",
    "list",
    "promptsdir",
    "workspace",
    "config",
    "composer-json",
    "log-level",
    "verbose",
    "no-color",
    "no-interactive",
    "dry-run",
    "json",
];

#[derive(Debug, Deserialize)]
struct TemplateDocument {
    #[serde(default)]
    description: Option<String>,

    #[serde(rename = "argument", default)]
    arguments: Vec<ArgumentElement>,

    #[serde(rename = "variable", default)]
    variables: Vec<VariableElement>,

    #[serde(default)]
    prompt: Option<String>,

    #[serde(default)]
    context: Option<ContextElement>,
}

#[derive(Debug, Deserialize)]
struct ArgumentElement {
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(rename = "@alias", default)]
    alias: String,
    #[serde(rename = "@question")]
    question: Option<String>,
    #[serde(rename = "@required")]
    required: Option<bool>,
    #[serde(rename = "@default")]
    default: Option<String>,
    #[serde(rename = "@context")]
    context: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct VariableElement {
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(rename = "@argument", default)]
    argument: String,
    #[serde(rename = "@converter", default)]
    converter: String,
    #[serde(rename = "@context")]
    context: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ContextElement {
    #[serde(rename = "include", default)]
    includes: Vec<IncludeElement>,
}

#[derive(Debug, Deserialize)]
struct IncludeElement {
    #[serde(rename = "@path", default)]
    path: String,
}

/// Path of the definition file for `command`.
pub fn template_path(prompts_dir: &Path, command: &str) -> PathBuf {
    prompts_dir.join(format!("{}.{}", command, TEMPLATE_EXTENSION))
}

/// Load and validate the template for `command`.
///
/// # Errors
/// - `TemplateNotFound` when the file does not exist or `command` is not a plain name
/// - `MalformedTemplate` on XML or structural errors
/// - `UnknownConverter` when a variable names a converter outside the registry
///
/// # Example
/// ```no_run
/// use conjure_prompt::load_template;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let template = load_template(Path::new("prompts"), "generate-unit-tests")?;
/// println!("{} arguments", template.arguments.len());
/// # Ok(())
/// # }
/// ```
pub fn load_template(prompts_dir: &Path, command: &str) -> AppResult<PromptTemplate> {
    let path = template_path(prompts_dir, command);

    tracing::debug!("Loading template from: {:?}", path);

    if !is_plain_command_name(command) || !path.is_file() {
        return Err(AppError::TemplateNotFound {
            command: command.to_string(),
            path,
        });
    }

    let contents = std::fs::read_to_string(&path)?;
    let template = parse_template(&path, command, &contents)?;

    tracing::info!(
        "Loaded template {} ({} arguments, {} variables)",
        template.command,
        template.arguments.len(),
        template.variables.len()
    );

    Ok(template)
}

/// Parse and validate template XML. `path` is only used in error messages.
pub fn parse_template(path: &Path, command: &str, xml: &str) -> AppResult<PromptTemplate> {
    let malformed = |reason: String| AppError::MalformedTemplate {
        path: path.to_path_buf(),
        reason,
    };

    let document: TemplateDocument = quick_xml::de::from_str(xml)
        .map_err(|e| malformed(format!("Error parsing XML: {}", e)))?;

    let prompt = document
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| malformed("missing or empty <prompt>".to_string()))?
        .to_string();

    let arguments = document
        .arguments
        .into_iter()
        .map(|a| ArgumentDecl {
            id: a.id,
            alias: a.alias.trim().to_string(),
            question: a.question,
            required: a.required.unwrap_or(true),
            default: a.default,
            context: a.context.unwrap_or(false),
        })
        .collect::<Vec<_>>();

    let variables = document
        .variables
        .into_iter()
        .map(|v| -> AppResult<VariableDecl> {
            Ok(VariableDecl {
                converter: v.converter.parse::<Converter>()?,
                id: v.id,
                argument: v.argument,
                context: v.context.unwrap_or(false),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let context = document
        .context
        .unwrap_or_default()
        .includes
        .into_iter()
        .map(|i| ContextInclude::parse(i.path.trim()))
        .collect::<Vec<_>>();

    let template = PromptTemplate {
        command: command.to_string(),
        description: document
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        arguments,
        variables,
        prompt,
        context,
    };

    validate_template(&template).map_err(malformed)?;

    Ok(template)
}

/// List all command names in `prompts_dir`, sorted.
pub fn list_templates(prompts_dir: &Path) -> AppResult<Vec<String>> {
    if !prompts_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut commands = Vec::new();

    for entry in walkdir::WalkDir::new(prompts_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some(TEMPLATE_EXTENSION)
        {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                commands.push(stem.to_string());
            }
        }
    }

    commands.sort();
    Ok(commands)
}

fn is_plain_command_name(command: &str) -> bool {
    !command.is_empty()
        && !command.starts_with('.')
        && !command.contains(['/', '\\'])
        && !command.chars().any(char::is_whitespace)
}

/// Structural checks; returns the reason on failure.
fn validate_template(template: &PromptTemplate) -> Result<(), String> {
    let mut ids = HashSet::new();
    let mut aliases = HashSet::new();

    for arg in &template.arguments {
        if arg.id.is_empty() {
            return Err("argument without id".to_string());
        }
        if arg.alias.is_empty() {
            return Err(format!("argument {} has no alias", arg.id));
        }
        if arg.alias.starts_with('-')
            || arg.alias.chars().any(char::is_whitespace)
            || RESERVED_ALIASES.contains(&arg.alias.as_str())
        {
            return Err(format!("invalid alias '{}' for argument {}", arg.alias, arg.id));
        }
        if !ids.insert(arg.id.as_str()) {
            return Err(format!("duplicate placeholder {}", arg.id));
        }
        if !aliases.insert(arg.alias.as_str()) {
            return Err(format!("duplicate alias --{}", arg.alias));
        }
    }

    for var in &template.variables {
        if var.id.is_empty() {
            return Err("variable without id".to_string());
        }
        if !ids.insert(var.id.as_str()) {
            return Err(format!("duplicate placeholder {}", var.id));
        }
        if template.argument(&var.argument).is_none() {
            return Err(format!(
                "variable {} refers to undeclared argument '{}'",
                var.id, var.argument
            ));
        }
    }

    for include in &template.context {
        match include {
            ContextInclude::Path(path) if path.as_os_str().is_empty() => {
                return Err("<include> without path".to_string());
            }
            ContextInclude::Placeholder(token) if !template.declares(token) => {
                return Err(format!("<include> refers to undeclared placeholder ${}", token));
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ARGUMENTS_AND_CONTEXT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<command>
    <description>Test a method</description>
    <argument id="%CLASS%" alias="class" question="Which class?"/>
    <variable id="%CLASS_PATH%" argument="%CLASS%" converter="resolveClassPath"/>
    <argument id="%METHOD%" alias="method" question="Which method?" required="false" default="run"/>
    <prompt>
        Test method `%METHOD%` in class `%CLASS%`.
    </prompt>
    <context>
        <include path="tests"/>
        <include path="$%CLASS_PATH%"/>
    </context>
</command>
"#;

    fn write_template(dir: &Path, command: &str, contents: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(template_path(dir, command), contents).unwrap();
    }

    fn parse(xml: &str) -> AppResult<PromptTemplate> {
        parse_template(Path::new("test.xml"), "test", xml)
    }

    #[test]
    fn test_load_valid_template() {
        let temp_dir = TempDir::new().unwrap();
        write_template(temp_dir.path(), "test-arguments", ARGUMENTS_AND_CONTEXT);

        let template = load_template(temp_dir.path(), "test-arguments").unwrap();
        assert_eq!(template.command, "test-arguments");
        assert_eq!(template.description.as_deref(), Some("Test a method"));
        assert_eq!(template.prompt, "Test method `%METHOD%` in class `%CLASS%`.");

        assert_eq!(template.arguments.len(), 2);
        assert_eq!(template.arguments[0].alias, "class");
        assert!(template.arguments[0].required);
        assert!(!template.arguments[1].required);
        assert_eq!(template.arguments[1].default.as_deref(), Some("run"));

        assert_eq!(template.variables.len(), 1);
        assert_eq!(template.variables[0].converter, Converter::ResolveClassPath);

        assert_eq!(
            template.context,
            vec![
                ContextInclude::Path(PathBuf::from("tests")),
                ContextInclude::Placeholder("%CLASS_PATH%".to_string()),
            ]
        );
    }

    #[test]
    fn test_load_nonexistent_template() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_template(temp_dir.path(), "not-existing");
        match result {
            Err(AppError::TemplateNotFound { command, path }) => {
                assert_eq!(command, "not-existing");
                assert!(path.ends_with("not-existing.xml"));
            }
            other => panic!("expected TemplateNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_command_name_cannot_escape_prompts_dir() {
        let temp_dir = TempDir::new().unwrap();
        let prompts = temp_dir.path().join("prompts");
        write_template(temp_dir.path(), "secret", ARGUMENTS_AND_CONTEXT);
        fs::create_dir_all(&prompts).unwrap();

        let result = load_template(&prompts, "../secret");
        assert!(matches!(result, Err(AppError::TemplateNotFound { .. })));
    }

    #[test]
    fn test_invalid_xml_structure() {
        let temp_dir = TempDir::new().unwrap();
        write_template(temp_dir.path(), "broken", "<command><prompt>unclosed</command>");

        let result = load_template(temp_dir.path(), "broken");
        match result {
            Err(AppError::MalformedTemplate { reason, .. }) => {
                assert!(reason.contains("Error parsing XML"));
            }
            other => panic!("expected MalformedTemplate, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_prompt() {
        let result = parse(r#"<command><argument id="%A%" alias="a"/></command>"#);
        assert!(matches!(result, Err(AppError::MalformedTemplate { .. })));

        let result = parse("<command><prompt>   </prompt></command>");
        assert!(matches!(result, Err(AppError::MalformedTemplate { .. })));
    }

    #[test]
    fn test_unknown_converter() {
        let result = parse(
            r#"<command>
                <argument id="%A%" alias="a"/>
                <variable id="%B%" argument="%A%" converter="rot13"/>
                <prompt>%B%</prompt>
            </command>"#,
        );
        assert!(matches!(result, Err(AppError::UnknownConverter(name)) if name == "rot13"));
    }

    #[test]
    fn test_duplicate_alias_and_id() {
        let result = parse(
            r#"<command>
                <argument id="%A%" alias="a"/>
                <argument id="%B%" alias="a"/>
                <prompt>%A% %B%</prompt>
            </command>"#,
        );
        assert!(matches!(result, Err(AppError::MalformedTemplate { reason, .. }) if reason.contains("duplicate alias")));

        let result = parse(
            r#"<command>
                <argument id="%A%" alias="a"/>
                <variable id="%A%" argument="%A%" converter="resolveClassPath"/>
                <prompt>%A%</prompt>
            </command>"#,
        );
        assert!(matches!(result, Err(AppError::MalformedTemplate { reason, .. }) if reason.contains("duplicate placeholder")));
    }

    #[test]
    fn test_invalid_alias() {
        for alias in ["", "--a", "two words", "help", "verbose", "dry-run"] {
            let xml = format!(
                r#"<command><argument id="%A%" alias="{}"/><prompt>%A%</prompt></command>"#,
                alias
            );
            assert!(
                matches!(parse(&xml), Err(AppError::MalformedTemplate { .. })),
                "alias {:?} should be rejected",
                alias
            );
        }
    }

    #[test]
    fn test_variable_with_undeclared_argument() {
        let result = parse(
            r#"<command>
                <variable id="%P%" argument="%NOPE%" converter="resolveClassPath"/>
                <prompt>%P%</prompt>
            </command>"#,
        );
        assert!(matches!(result, Err(AppError::MalformedTemplate { reason, .. }) if reason.contains("undeclared argument")));
    }

    #[test]
    fn test_include_with_undeclared_placeholder() {
        let result = parse(
            r#"<command>
                <prompt>Hello</prompt>
                <context><include path="$%MISSING%"/></context>
            </command>"#,
        );
        assert!(matches!(result, Err(AppError::MalformedTemplate { reason, .. }) if reason.contains("undeclared placeholder")));
    }

    #[test]
    fn test_template_without_context_or_arguments() {
        let template = parse("<command><prompt>Tidy up the README.</prompt></command>").unwrap();
        assert!(template.arguments.is_empty());
        assert!(template.context.is_empty());
        assert_eq!(template.description, None);
    }

    #[test]
    fn test_context_flags_on_declarations() {
        let template = parse(
            r#"<command>
                <argument id="%FILE%" alias="file" context="true"/>
                <argument id="%CLASS%" alias="class"/>
                <variable id="%PATH%" argument="%CLASS%" converter="resolveClassPath" context="true"/>
                <prompt>%FILE% %CLASS%</prompt>
            </command>"#,
        )
        .unwrap();
        assert!(template.arguments[0].context);
        assert!(!template.arguments[1].context);
        assert!(template.variables[0].context);
    }

    #[test]
    fn test_list_templates() {
        let temp_dir = TempDir::new().unwrap();
        write_template(temp_dir.path(), "zeta", ARGUMENTS_AND_CONTEXT);
        write_template(temp_dir.path(), "alpha", ARGUMENTS_AND_CONTEXT);
        fs::write(temp_dir.path().join("notes.txt"), "ignore me").unwrap();

        let commands = list_templates(temp_dir.path()).unwrap();
        assert_eq!(commands, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn test_list_templates_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let commands = list_templates(&temp_dir.path().join("absent")).unwrap();
        assert!(commands.is_empty());
    }

    #[test]
    fn test_bundled_templates_load() {
        let prompts_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../prompts");
        let commands = list_templates(&prompts_dir).unwrap();
        assert!(commands.contains(&"generate-unit-tests".to_string()));

        for command in commands {
            let template = load_template(&prompts_dir, &command).unwrap();
            assert!(template.description.is_some(), "{} has no description", command);
        }
    }
}
