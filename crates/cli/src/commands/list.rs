//! List command handler.

use conjure_core::{config::AppConfig, AppResult};
use conjure_prompt::{list_templates, load_template};

/// Show every template in the prompts directory.
#[derive(Debug, Clone, Default)]
pub struct ListCommand {
    /// Output as JSON
    pub json: bool,
}

/// One row of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TemplateSummary {
    name: String,
    description: String,
    valid: bool,
}

impl ListCommand {
    /// Execute the list command.
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let prompts_dir = config.prompts_path();
        tracing::debug!("Listing templates in {:?}", prompts_dir);

        let summaries = summarize(config)?;

        if self.json {
            let items: Vec<serde_json::Value> = summaries
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "name": s.name,
                        "description": s.description,
                        "valid": s.valid,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
            return Ok(());
        }

        if summaries.is_empty() {
            println!("No templates found in {}", prompts_dir.display());
            return Ok(());
        }

        let width = summaries.iter().map(|s| s.name.len()).max().unwrap_or(0);
        for s in &summaries {
            println!("{:<width$}  {}", s.name, s.description, width = width);
        }

        Ok(())
    }
}

fn summarize(config: &AppConfig) -> AppResult<Vec<TemplateSummary>> {
    let prompts_dir = config.prompts_path();

    let summaries = list_templates(&prompts_dir)?
        .into_iter()
        .map(|name| match load_template(&prompts_dir, &name) {
            Ok(template) => TemplateSummary {
                description: template.description.unwrap_or_default(),
                name,
                valid: true,
            },
            Err(e) => {
                tracing::warn!("Skipping invalid template {}: {}", name, e);
                TemplateSummary {
                    name,
                    description: format!("(invalid: {})", e),
                    valid: false,
                }
            }
        })
        .collect();

    Ok(summaries)
}
