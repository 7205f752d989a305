use regex::{Captures, Regex};
use std::fmt;
use std::sync::LazyLock;

// API keys: sk-or-v1-..., sk-...
static API_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sk-(?:or-)?[a-zA-Z0-9_-]{16,}").expect("api key pattern"));

static BEARER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9_.-]+").expect("bearer pattern"));

static TOKEN_FIELD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"["']?(?:api_key|apikey|token|secret)["']?\s*[:=]\s*["']?([a-zA-Z0-9_.-]{12,})["']?"#,
    )
    .expect("token field pattern")
});

static PASSWORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?password["']?\s*[:=]\s*["']?([^"'\s,}]+)["']?"#).expect("password pattern")
});

/// Redacts credentials from text before it is logged.
#[derive(Clone, Copy, Default)]
pub struct SecretScrubber;

impl SecretScrubber {
    pub const fn new() -> Self {
        Self
    }

    /// Scrub a message of sensitive data
    pub fn scrub_message(&self, message: &str) -> String {
        let scrubbed = API_KEY_PATTERN.replace_all(message, "[API_KEY_REDACTED]");
        let scrubbed = BEARER_PATTERN.replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]");
        let scrubbed = TOKEN_FIELD_PATTERN.replace_all(&scrubbed, |caps: &Captures| {
            let full_match = &caps[0];
            match full_match.find([':', '=']) {
                Some(pos) => format!("{}{}[REDACTED]", &full_match[..pos], &full_match[pos..=pos]),
                None => "[REDACTED]".to_string(),
            }
        });
        PASSWORD_PATTERN
            .replace_all(&scrubbed, "password=[REDACTED]")
            .into_owned()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}
