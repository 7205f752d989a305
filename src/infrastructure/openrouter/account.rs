//! Key, usage, generation and credit types.

use regex::Regex;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::errors::ApiError;

static ETHEREUM_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("ETHEREUM_ADDRESS regex is valid")
});

const MAX_CHARGE_USD: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthStatusResponse {
    pub data: AuthData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthData {
    pub label: String,
    pub usage: f64,
    #[serde(default)]
    pub limit: Option<f64>,
    #[serde(default)]
    pub is_free_tier: bool,
    #[serde(default)]
    pub rate_limit: Option<RateLimitData>,
}

impl AuthData {
    /// Credit left under the key's limit; `None` for unlimited keys.
    pub fn remaining(&self) -> Option<f64> {
        self.limit.map(|limit| limit - self.usage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitData {
    pub requests: u32,
    pub interval: String,
}

/// Rate limit state reported in response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Unix time in milliseconds
    pub reset_at_ms: i64,
}

impl RateLimitInfo {
    /// Read `X-RateLimit-{Limit,Remaining,Reset}`; `None` unless all three parse.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        fn header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
            headers.get(name)?.to_str().ok()?.trim().parse().ok()
        }

        let limit = header(headers, "x-ratelimit-limit")?;
        let remaining = header(headers, "x-ratelimit-remaining")?;
        let reset: i64 = header(headers, "x-ratelimit-reset")?;

        Some(Self {
            limit,
            remaining,
            reset_at_ms: reset.saturating_mul(1000),
        })
    }
}

/// Key status plus the rate limit headers of the same response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyStatus {
    pub key: AuthData,
    pub rate_limit: Option<RateLimitInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub data: GenerationDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationDetails {
    pub id: String,
    pub model: String,
    #[serde(default)]
    pub streamed: Option<bool>,
    #[serde(default)]
    pub generation_time: Option<f64>,
    pub created_at: String,
    #[serde(default)]
    pub tokens_prompt: Option<u32>,
    #[serde(default)]
    pub tokens_completion: Option<u32>,
    #[serde(default)]
    pub native_tokens_prompt: Option<u32>,
    #[serde(default)]
    pub native_tokens_completion: Option<u32>,
    #[serde(default)]
    pub num_media_prompt: Option<u32>,
    #[serde(default)]
    pub app_id: Option<i64>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub usage: Option<f64>,
    #[serde(default)]
    pub total_cost: Option<f64>,
    #[serde(default)]
    pub cancelled: Option<bool>,
    #[serde(default)]
    pub moderation_latency: Option<f64>,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditsResponse {
    pub data: CreditsBalance,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditsBalance {
    pub total_credits: f64,
    pub total_usage: f64,
}

impl CreditsBalance {
    pub fn current_balance(&self) -> f64 {
        self.total_credits - self.total_usage
    }

    pub fn is_below(&self, threshold: f64) -> bool {
        self.current_balance() < threshold
    }
}

/// EVM chains accepted for crypto credit purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedChain {
    Ethereum,
    Polygon,
    /// Lowest fees; the default for new charges.
    Base,
}

impl SupportedChain {
    pub const ALL: [Self; 3] = [Self::Ethereum, Self::Polygon, Self::Base];

    pub const fn chain_id(self) -> u64 {
        match self {
            Self::Ethereum => 1,
            Self::Polygon => 137,
            Self::Base => 8453,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|chain| chain.chain_id() == chain_id)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Ethereum => "Ethereum",
            Self::Polygon => "Polygon",
            Self::Base => "Base",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoChargeRequest {
    /// Credit amount in USD
    pub amount: f64,
    /// Sending Ethereum address
    pub sender: String,
    pub chain_id: u64,
}

impl CryptoChargeRequest {
    /// Build a validated charge request.
    ///
    /// # Errors
    /// Returns an `invalid_request` error when the amount is outside
    /// `(0, 100000]`, the chain is unsupported, or the sender is not a
    /// `0x`-prefixed 40-hex-digit address.
    pub fn new(amount: f64, sender: impl Into<String>, chain_id: u64) -> Result<Self, ApiError> {
        let sender = sender.into();

        if !(amount > 0.0 && amount <= MAX_CHARGE_USD) {
            return Err(ApiError::invalid_request(format!(
                "Amount must be greater than 0 and at most {MAX_CHARGE_USD}, got {amount}"
            )));
        }
        if SupportedChain::from_chain_id(chain_id).is_none() {
            let supported: Vec<u64> = SupportedChain::ALL.iter().map(|c| c.chain_id()).collect();
            return Err(ApiError::invalid_request(format!(
                "Unsupported chain ID {chain_id}, expected one of {supported:?}"
            )));
        }
        if !ETHEREUM_ADDRESS.is_match(&sender) {
            return Err(ApiError::invalid_request(format!(
                "Invalid Ethereum address: {sender}"
            )));
        }

        Ok(Self {
            amount,
            sender,
            chain_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoChargeResponse {
    pub data: CryptoChargeData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoChargeData {
    pub id: String,
    pub created_at: String,
    pub expires_at: String,
    pub web3_data: Web3Data,
}

impl CryptoChargeData {
    /// Whether `expires_at` is in the past; unparseable timestamps count as expired.
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        chrono::DateTime::parse_from_rfc3339(&self.expires_at)
            .map_or(true, |expiry| expiry <= now)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Web3Data {
    pub transfer_intent: TransferIntent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferIntent {
    pub metadata: TransferMetadata,
    pub call_data: TransferCallData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferMetadata {
    pub chain_id: u64,
    pub contract_address: String,
    pub sender: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferCallData {
    pub recipient_amount: String,
    pub deadline: String,
    pub recipient: String,
    pub recipient_currency: String,
    pub refund_destination: String,
    pub fee_amount: String,
    pub id: String,
    pub operator: String,
    pub signature: String,
    pub prefix: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use reqwest::header::HeaderValue;

    const SENDER: &str = "0x1234567890abcdefABCDEF1234567890abcdef12";

    #[test]
    fn test_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("X-RateLimit-Limit", HeaderValue::from_static("200"));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("199"));
        headers.insert("X-RateLimit-Reset", HeaderValue::from_static("1700000000"));

        let info = RateLimitInfo::from_headers(&headers).unwrap();
        assert_eq!(info.limit, 200);
        assert_eq!(info.remaining, 199);
        assert_eq!(info.reset_at_ms, 1_700_000_000_000);

        headers.remove("X-RateLimit-Reset");
        assert!(RateLimitInfo::from_headers(&headers).is_none());
    }

    #[test]
    fn test_charge_validation() {
        assert!(CryptoChargeRequest::new(10.0, SENDER, 8453).is_ok());
        assert!(CryptoChargeRequest::new(100_000.0, SENDER, 1).is_ok());

        for (amount, sender, chain) in [
            (0.0, SENDER, 8453),
            (-1.0, SENDER, 8453),
            (100_000.01, SENDER, 8453),
            (f64::NAN, SENDER, 8453),
            (10.0, SENDER, 10),
            (10.0, "0x123", 137),
            (10.0, "1234567890abcdefABCDEF1234567890abcdef1234", 137),
        ] {
            let err = CryptoChargeRequest::new(amount, sender, chain).unwrap_err();
            assert_eq!(err.code, 400, "{amount} {sender} {chain}");
            assert!(err.is_type(super::super::errors::INVALID_REQUEST));
        }
    }

    #[test]
    fn test_chains() {
        assert_eq!(SupportedChain::from_chain_id(137), Some(SupportedChain::Polygon));
        assert_eq!(SupportedChain::Base.name(), "Base");
        assert_eq!(SupportedChain::from_chain_id(56), None);
    }

    #[test]
    fn test_balance_and_expiry() {
        let balance = CreditsBalance {
            total_credits: 25.0,
            total_usage: 21.5,
        };
        assert!((balance.current_balance() - 3.5).abs() < f64::EPSILON);
        assert!(balance.is_below(5.0));

        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut data: CryptoChargeData = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "created_at": "2024-12-31T23:00:00Z",
            "expires_at": "2025-01-01T01:00:00Z",
            "web3_data": {"transfer_intent": {
                "metadata": {"chain_id": 8453, "contract_address": "0xabc", "sender": SENDER},
                "call_data": {
                    "recipient_amount": "1", "deadline": "2025-01-01T01:00:00Z",
                    "recipient": "0xdef", "recipient_currency": "0xusdc",
                    "refund_destination": SENDER, "fee_amount": "0", "id": "0x01",
                    "operator": "0x02", "signature": "0x03", "prefix": "0x04"
                }
            }}
        }))
        .unwrap();
        assert!(!data.is_expired(now));
        data.expires_at = "not a date".to_string();
        assert!(data.is_expired(now));
    }
}
