//! Template command handler.
//!
//! Loads `<prompts>/<command>.xml`, parses the words after the command name
//! against it, resolves missing values, assembles the prompt and hands it to
//! the assistant.

use conjure_agent::{create_assistant, AssistantRequest};
use conjure_core::{config::AppConfig, AppError, AppResult, AssistantProvider};
use conjure_prompt::{
    assemble_prompt, load_template, parse_arguments, resolve_arguments, AssembleOptions,
    ConversionContext, ParsedArguments, Prompter, TerminalPrompter,
};

/// One invocation of a prompt template.
#[derive(Debug, Clone)]
pub struct RunCommand {
    /// Template name (file stem in the prompts directory)
    pub command: String,

    /// Words following the command name
    pub words: Vec<String>,

    /// Ask for missing required arguments on the terminal
    pub interactive: bool,

    /// Print instead of dispatching
    pub dry_run: bool,

    /// Dry-run output as JSON
    pub json: bool,
}

impl RunCommand {
    /// Execute the template command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing command: {}", self.command);
        tracing::debug!("Run options: {:?}", self);

        // 1. Load and validate the command definition
        let template = load_template(&config.prompts_path(), &self.command)?;

        // 2. Parse the remaining words with the template's grammar
        let supplied = match parse_arguments(&template, &self.words)? {
            ParsedArguments::Help(help) => {
                print!("{}", help);
                return Ok(());
            }
            ParsedArguments::Supplied(supplied) => supplied,
        };

        // 3. Fill in defaults and ask for what is still missing
        let mut terminal = TerminalPrompter;
        let prompter: Option<&mut dyn Prompter> = if self.interactive {
            Some(&mut terminal)
        } else {
            None
        };
        let resolved = resolve_arguments(&template, &supplied, prompter)?;

        // 4. Convert, substitute and collect context
        let mut conversions = ConversionContext::new(config.composer_path());
        let options = AssembleOptions::new(config.workspace.clone())
            .with_missing_context(config.missing_context);
        let assembled = assemble_prompt(&template, &resolved, &mut conversions, &options)?;

        // 5. Hand off to the assistant
        let mut assistant_config = config.assistant.clone();
        if self.dry_run {
            assistant_config.provider = AssistantProvider::Preview;
        }
        let api_key = assistant_config.resolve_api_key();
        let assistant = create_assistant(&assistant_config, api_key.as_deref(), self.json)
            .map_err(AppError::Config)?;

        let request = AssistantRequest::new(assembled.prompt)
            .with_context_files(assembled.context_files)
            .with_working_dir(config.workspace.clone());

        let outcome = assistant.dispatch(&request).await?;
        tracing::debug!("Assistant outcome: {:?}", outcome);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = r#"<command>
    <description>Generate unit tests</description>
    <argument id="%CLASS%" alias="class" question="Which class?" required="true"/>
    <prompt>Write tests for `%CLASS%`.</prompt>
</command>"#;

    fn workspace() -> (TempDir, AppConfig) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("prompts")).unwrap();
        std::fs::write(dir.path().join("prompts/generate-unit-tests.xml"), TEMPLATE).unwrap();
        let config = AppConfig {
            workspace: dir.path().to_path_buf(),
            ..Default::default()
        };
        (dir, config)
    }

    fn run(command: &str, words: &[&str]) -> RunCommand {
        RunCommand {
            command: command.to_string(),
            words: words.iter().map(|w| w.to_string()).collect(),
            interactive: false,
            dry_run: true,
            json: false,
        }
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let (_dir, config) = workspace();
        let result = run("nope", &[]).execute(&config).await;
        assert!(matches!(result, Err(AppError::TemplateNotFound { .. })));
    }

    #[tokio::test]
    async fn test_missing_argument_non_interactive() {
        let (_dir, config) = workspace();
        let result = run("generate-unit-tests", &[]).execute(&config).await;
        assert!(matches!(result, Err(AppError::MissingArgument { .. })));
    }

    #[tokio::test]
    async fn test_dry_run_succeeds() {
        let (_dir, config) = workspace();
        run("generate-unit-tests", &["App\\Foo"])
            .execute(&config)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_api_key_blocks_dispatch() {
        let (_dir, mut config) = workspace();
        config.assistant.api_key_env = Some("CONJURE_TEST_UNSET_API_KEY".to_string());

        let mut command = run("generate-unit-tests", &["--class", "App\\Foo"]);
        command.dry_run = false;

        let result = command.execute(&config).await;
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("CONJURE_TEST_UNSET_API_KEY")));
    }
}
