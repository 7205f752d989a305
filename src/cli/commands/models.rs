//! Model catalog command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::openrouter::{models, ClientConfig, ModelInfo, OpenRouterClient};

#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Only models with free prompt and completion tokens
    #[arg(long)]
    pub free: bool,

    /// Case-insensitive substring match on id or name
    #[arg(short, long)]
    pub search: Option<String>,

    /// Maximum number of models to show
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Print the built-in model identifiers without calling the API
    #[arg(long)]
    pub builtin: bool,
}

#[derive(Debug, Serialize)]
pub struct ModelRow {
    pub id: String,
    pub name: String,
    pub context_length: Option<u64>,
    pub prompt_price: String,
    pub completion_price: String,
}

impl From<&ModelInfo> for ModelRow {
    fn from(model: &ModelInfo) -> Self {
        Self {
            id: model.id.clone(),
            name: model.name.clone(),
            context_length: model.context_length,
            prompt_price: model.pricing.prompt.clone(),
            completion_price: model.pricing.completion.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModelListOutput {
    pub models: Vec<ModelRow>,
    pub total: usize,
}

impl CommandOutput for ModelListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "context", "prompt", "completion"]);
        for model in &self.models {
            table.add_row(vec![
                model.id.clone(),
                truncate(&model.name, 40),
                model
                    .context_length
                    .map_or_else(|| "-".to_string(), |c| c.to_string()),
                model.prompt_price.clone(),
                model.completion_price.clone(),
            ]);
        }
        render_list("model", &table, self.total)
    }
}

#[derive(Debug, Serialize)]
pub struct BuiltinModelsOutput {
    pub default_model: String,
    pub models: Vec<String>,
}

impl CommandOutput for BuiltinModelsOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "free", "default"]);
        for id in &self.models {
            table.add_row(vec![
                id.clone(),
                if models::is_free(id) { "yes" } else { "" }.to_string(),
                if *id == self.default_model { "*" } else { "" }.to_string(),
            ]);
        }
        render_list("model", &table, self.models.len())
    }
}

pub async fn execute(args: ModelsArgs, config: &Config, json_mode: bool) -> Result<()> {
    if args.builtin {
        let out = BuiltinModelsOutput {
            default_model: config.api.default_model.clone(),
            models: models::ALL.iter().map(ToString::to_string).collect(),
        };
        output(&out, json_mode);
        return Ok(());
    }

    let client = OpenRouterClient::new(ClientConfig::from_config(&config.api, &config.retry)?)?;
    let listing = client
        .list_models()
        .await
        .context("Failed to list models")?;

    let rows = filter_models(&listing.data, &args);
    let out = ModelListOutput {
        total: rows.len(),
        models: rows,
    };
    output(&out, json_mode);
    Ok(())
}

fn filter_models(all: &[ModelInfo], args: &ModelsArgs) -> Vec<ModelRow> {
    let needle = args.search.as_deref().map(str::to_lowercase);
    all.iter()
        .filter(|m| !args.free || m.pricing.is_free())
        .filter(|m| {
            needle.as_deref().is_none_or(|n| {
                m.id.to_lowercase().contains(n) || m.name.to_lowercase().contains(n)
            })
        })
        .take(args.limit.unwrap_or(usize::MAX))
        .map(ModelRow::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::openrouter::catalog::PricingInfo;

    fn model(id: &str, name: &str, price: &str) -> ModelInfo {
        ModelInfo {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            context_length: Some(8192),
            pricing: PricingInfo {
                prompt: price.to_string(),
                completion: price.to_string(),
                request: None,
                image: None,
            },
            top_provider: None,
            architecture: None,
            per_request_limits: None,
        }
    }

    #[test]
    fn test_filter_models() {
        let all = vec![
            model("google/gemini-2.5-flash", "Gemini Flash", "0.0000003"),
            model("meta-llama/llama-4-scout:free", "Llama 4 Scout", "0"),
            model("meta-llama/llama-4-maverick:free", "Llama 4 Maverick", "0"),
        ];
        let args = ModelsArgs {
            free: true,
            search: Some("LLAMA".to_string()),
            limit: Some(1),
            builtin: false,
        };
        let rows = filter_models(&all, &args);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "meta-llama/llama-4-scout:free");

        let args = ModelsArgs {
            free: false,
            search: None,
            limit: None,
            builtin: false,
        };
        assert_eq!(filter_models(&all, &args).len(), 3);
    }
}
