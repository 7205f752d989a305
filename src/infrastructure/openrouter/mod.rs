//! `OpenRouter` chat-completion API client
//!
//! - Bearer auth and app attribution headers on every request
//! - Exponential backoff with jitter on 408/429/502/503/504
//! - Structured error envelopes decoded into [`ApiError`]

pub mod account;
pub mod catalog;
pub mod client;
pub mod errors;
pub mod media;
pub mod response;
pub mod retry;
pub mod types;

pub use account::{CreditsBalance, CryptoChargeRequest, KeyStatus, RateLimitInfo, SupportedChain};
pub use catalog::{models, ModelInfo, ModelsResponse};
pub use client::{ClientConfig, OpenRouterClient};
pub use errors::ApiError;
pub use response::handle_response;
pub use retry::{RetryMode, RetryPolicy};
pub use types::{
    ChatCompletionRequest, ChatCompletionResponse, Choice, ContentItem, Message, MessageContent,
    ProviderConfig, ResponseFormat, Role, Tool, Usage,
};
