use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, Response};
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::account::{
    AuthStatusResponse, CreditsBalance, CreditsResponse, CryptoChargeRequest,
    CryptoChargeResponse, GenerationDetails, GenerationResponse, KeyStatus, RateLimitInfo,
};
use super::catalog::{ModelInfo, ModelResponse, ModelsResponse};
use super::errors::ApiError;
use super::response::handle_response;
use super::retry::{RetryMode, RetryPolicy};
use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::codec;
use crate::domain::models::config::{ApiConfig, RetryConfig};
use crate::infrastructure::logging::SecretScrubber;

const SEND_ONCE: RetryPolicy = RetryPolicy::disabled();

/// Configuration for the `OpenRouter` HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    /// Sent as `HTTP-Referer`
    pub app_url: Option<String>,
    /// Sent as `X-Title`
    pub app_name: Option<String>,
    /// Used when a completion request names no model
    pub default_model: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub enable_retries: bool,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        let api = ApiConfig::default();
        Self {
            api_key: api_key.into(),
            base_url: api.base_url,
            app_url: None,
            app_name: None,
            default_model: api.default_model,
            connect_timeout: Duration::from_secs(api.connect_timeout_secs),
            read_timeout: Duration::from_secs(api.read_timeout_secs),
            enable_retries: api.enable_retries,
            retry: RetryPolicy::default(),
        }
    }

    /// Build from the `api` and `retry` config sections.
    ///
    /// # Errors
    /// Returns an `invalid_request` error when no API key is configured.
    pub fn from_config(api: &ApiConfig, retry: &RetryConfig) -> Result<Self, ApiError> {
        let api_key = api.resolve_api_key().ok_or_else(|| {
            ApiError::invalid_request("No API key: set api.api_key or OPENROUTER_API_KEY")
        })?;

        Ok(Self {
            api_key,
            base_url: api.base_url.clone(),
            app_url: api.app_url.clone(),
            app_name: api.app_name.clone(),
            default_model: api.default_model.clone(),
            connect_timeout: Duration::from_secs(api.connect_timeout_secs),
            read_timeout: Duration::from_secs(api.read_timeout_secs),
            enable_retries: api.enable_retries,
            retry: RetryPolicy::from(retry),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_app(mut self, app_url: Option<String>, app_name: Option<String>) -> Self {
        self.app_url = app_url;
        self.app_name = app_name;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_retries_enabled(mut self, enabled: bool) -> Self {
        self.enable_retries = enabled;
        self
    }
}

/// HTTP client for the `OpenRouter` API.
///
/// Every request carries the auth and app headers. Retryable statuses are
/// re-issued under the configured [`RetryPolicy`] and every response is
/// decoded through [`handle_response`]. Cloning shares the connection pool.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: ReqwestClient,
    base_url: String,
    default_model: String,
    retry: RetryPolicy,
}

impl OpenRouterClient {
    /// # Errors
    /// Returns an `invalid_request` error when a header value is not valid
    /// ASCII, or a `network_error` when the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let headers = default_headers(&config)?;

        let http = ReqwestClient::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ApiError::network_error(&e))?;

        let retry = if config.enable_retries {
            config.retry
        } else {
            RetryPolicy::disabled()
        };

        info!(
            base_url = %config.base_url,
            api_key = %SecretScrubber::new().scrub_message(&config.api_key),
            max_retries = retry.max_retries(),
            default_model = %config.default_model,
            "OpenRouter client initialized"
        );

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_model: config.default_model,
            retry,
        })
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// `POST /chat/completions`
    ///
    /// The configured default model is filled in when the request names
    /// neither `model` nor `models`.
    #[instrument(skip(self, request), fields(model = ?request.model, messages = request.messages.len()))]
    pub async fn create_completion(
        &self,
        mut request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ApiError> {
        if !request.names_model() {
            request.model = Some(self.default_model.clone());
        }
        request.stream = false;

        let body = codec::to_payload(&request)?;
        let response = self
            .execute(Method::POST, "chat/completions", Some(body), RetryMode::Retry)
            .await?;
        handle_response(response).await
    }

    /// `GET /models`
    #[instrument(skip(self))]
    pub async fn list_models(&self) -> Result<ModelsResponse, ApiError> {
        let response = self.execute(Method::GET, "models", None, RetryMode::Retry).await?;
        handle_response(response).await
    }

    /// `GET /models/{id}`
    #[instrument(skip(self))]
    pub async fn get_model(&self, model_id: &str) -> Result<ModelInfo, ApiError> {
        let path = format!("models/{model_id}");
        let response = self.execute(Method::GET, &path, None, RetryMode::Retry).await?;
        handle_response::<ModelResponse>(response)
            .await
            .map(|wrapped| wrapped.data)
    }

    /// `GET /auth/key`, with the rate limit headers of the same response.
    #[instrument(skip(self))]
    pub async fn key_status(&self) -> Result<KeyStatus, ApiError> {
        let response = self.execute(Method::GET, "auth/key", None, RetryMode::Retry).await?;
        let rate_limit = RateLimitInfo::from_headers(response.headers());
        let status: AuthStatusResponse = handle_response(response).await?;
        Ok(KeyStatus {
            key: status.data,
            rate_limit,
        })
    }

    /// `GET /generation?id=`
    #[instrument(skip(self))]
    pub async fn get_generation(&self, generation_id: &str) -> Result<GenerationDetails, ApiError> {
        let request = || {
            self.http
                .get(self.url("generation"))
                .query(&[("id", generation_id)])
                .send()
        };
        let response = self.send_with(request, RetryMode::Retry).await?;
        handle_response::<GenerationResponse>(response)
            .await
            .map(|wrapped| wrapped.data)
    }

    /// `GET /credits`
    #[instrument(skip(self))]
    pub async fn credits_balance(&self) -> Result<CreditsBalance, ApiError> {
        let response = self.execute(Method::GET, "credits", None, RetryMode::Retry).await?;
        handle_response::<CreditsResponse>(response)
            .await
            .map(|wrapped| wrapped.data)
    }

    /// `POST /credits/coinbase`. Validated locally and never retried.
    #[instrument(skip(self))]
    pub async fn create_crypto_charge(
        &self,
        amount: f64,
        sender: &str,
        chain_id: u64,
    ) -> Result<CryptoChargeResponse, ApiError> {
        let request = CryptoChargeRequest::new(amount, sender, chain_id)?;
        let body = codec::to_payload(&request)?;
        let response = self
            .execute(Method::POST, "credits/coinbase", Some(body), RetryMode::Once)
            .await?;
        handle_response(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        mode: RetryMode,
    ) -> Result<Response, ApiError> {
        let url = self.url(path);
        debug!(method = %method, url = %url, "sending request");

        let request = || {
            let mut builder = self.http.request(method.clone(), url.as_str());
            if let Some(bytes) = &body {
                builder = builder.body(bytes.clone());
            }
            builder.send()
        };
        self.send_with(request, mode).await
    }

    async fn send_with<F, Fut>(&self, request: F, mode: RetryMode) -> Result<Response, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
    {
        let policy = match mode {
            RetryMode::Retry => &self.retry,
            RetryMode::Once => &SEND_ONCE,
        };
        policy
            .send(request)
            .await
            .map_err(|e| ApiError::network_error(&e))
    }
}

fn default_headers(config: &ClientConfig) -> Result<HeaderMap, ApiError> {
    fn value(name: &str, raw: &str) -> Result<HeaderValue, ApiError> {
        HeaderValue::from_str(raw)
            .map_err(|_| ApiError::invalid_request(format!("Invalid value for header {name}")))
    }

    let mut headers = HeaderMap::new();
    let mut auth = value("Authorization", &format!("Bearer {}", config.api_key))?;
    auth.set_sensitive(true);
    headers.insert(header::AUTHORIZATION, auth);
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(app_url) = config.app_url.as_deref() {
        headers.insert(HeaderName::from_static("http-referer"), value("HTTP-Referer", app_url)?);
    }
    if let Some(app_name) = config.app_name.as_deref() {
        headers.insert(HeaderName::from_static("x-title"), value("X-Title", app_name)?);
    }

    Ok(headers)
}
