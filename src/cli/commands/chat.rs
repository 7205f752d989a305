//! Chat completion command.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::openrouter::media::{self, mime_for_extension};
use crate::infrastructure::openrouter::{
    ChatCompletionRequest, ClientConfig, Message, OpenRouterClient, Role,
};

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Prompt text
    pub prompt: String,

    /// Model to use instead of the configured default
    #[arg(short, long)]
    pub model: Option<String>,

    /// System message sent before the prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Image to attach (jpeg, png, gif, webp or bmp)
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// PDF to attach
    #[arg(long)]
    pub pdf: Option<PathBuf>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    #[arg(long)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ChatOutput {
    pub id: String,
    pub model: String,
    pub content: String,
    pub finish_reason: Option<String>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub cost: Option<f64>,
}

impl CommandOutput for ChatOutput {
    fn to_human(&self) -> String {
        let mut text = self.content.clone();
        if let (Some(prompt), Some(completion)) = (self.prompt_tokens, self.completion_tokens) {
            text.push_str(&format!(
                "\n\n[{}: {prompt} prompt + {completion} completion tokens]",
                self.model
            ));
        }
        text
    }
}

pub async fn execute(args: ChatArgs, config: &Config, json_mode: bool) -> Result<()> {
    let client_config = ClientConfig::from_config(&config.api, &config.retry)?;
    let client = OpenRouterClient::new(client_config)?;

    let mut messages = Vec::new();
    if let Some(system) = &args.system {
        messages.push(Message::text(Role::System, system.as_str()));
    }
    messages.push(user_message(&args).await?);

    let mut request = ChatCompletionRequest::new(messages);
    request.model = args.model;
    request.max_tokens = args.max_tokens;
    request.temperature = args.temperature;

    let response = client
        .create_completion(request)
        .await
        .context("Chat completion failed")?;

    let choice = response.choices.first();
    let out = ChatOutput {
        id: response.id.clone(),
        model: response.model.clone(),
        content: response.first_text().unwrap_or_default(),
        finish_reason: choice.and_then(|c| c.finish_reason.clone()),
        prompt_tokens: response.usage.as_ref().map(|u| u.prompt_tokens),
        completion_tokens: response.usage.as_ref().map(|u| u.completion_tokens),
        cost: response.usage.as_ref().and_then(|u| u.cost),
    };
    output(&out, json_mode);
    Ok(())
}

async fn user_message(args: &ChatArgs) -> Result<Message> {
    if args.image.is_none() && args.pdf.is_none() {
        return Ok(Message::text(Role::User, args.prompt.as_str()));
    }

    let image = match &args.image {
        Some(path) => {
            let mime = attachment_mime(path)?;
            if !media::is_supported_image_mime(mime) {
                bail!("Not a supported image: {}", path.display());
            }
            Some((read_attachment(path).await?, mime))
        }
        None => None,
    };
    let pdf = match &args.pdf {
        Some(path) => Some(read_attachment(path).await?),
        None => None,
    };

    let message = Message::multimodal(
        Role::User,
        args.prompt.as_str(),
        image.as_ref().map(|(bytes, mime)| (bytes.as_slice(), *mime)),
        pdf.as_deref(),
    )?;
    Ok(message)
}

fn attachment_mime(path: &Path) -> Result<&'static str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(mime_for_extension)
        .with_context(|| format!("Unknown file type: {}", path.display()))
}

async fn read_attachment(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
