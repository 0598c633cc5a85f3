use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.replicate.com/v1";
pub const DEFAULT_MODEL: &str = "black-forest-labs/flux-1.1-pro";

const TOKEN_ENV_KEYS: &[&str] = &["REPLICATE_API_TOKEN", "REPLICATE_API_KEY"];
const API_BASE_ENV_KEY: &str = "REPLICATE_API_BASE";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(200);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MIN_POLL_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_POLL_TIMEOUT: Duration = Duration::from_secs(600);

/// Settings handed to the dispatcher at construction.
///
/// Explicit values win over the environment; blank strings count as unset.
#[derive(Clone, PartialEq)]
pub struct DispatcherConfig {
    pub api_token: Option<String>,
    pub api_base: String,
    pub model: String,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub user_agent: String,
    pub dry_run: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(120),
            user_agent: format!("fluxpipe/{}", env!("CARGO_PKG_VERSION")),
            dry_run: false,
        }
    }
}

impl DispatcherConfig {
    pub fn from_env(explicit_token: Option<String>, explicit_api_base: Option<String>) -> Self {
        Self::resolve(explicit_token, explicit_api_base, non_empty_env)
    }

    pub fn resolve(
        explicit_token: Option<String>,
        explicit_api_base: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let api_token = non_blank(explicit_token)
            .or_else(|| TOKEN_ENV_KEYS.iter().find_map(|key| non_blank(lookup(key))));
        let api_base = non_blank(explicit_api_base)
            .or_else(|| non_blank(lookup(API_BASE_ENV_KEY)))
            .map(|value| value.trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Self {
            api_token,
            api_base,
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        let trimmed = model.trim();
        if !trimmed.is_empty() {
            self.model = trimmed.to_string();
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL);
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout.clamp(MIN_POLL_TIMEOUT, MAX_POLL_TIMEOUT);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl fmt::Debug for DispatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("poll_interval", &self.poll_interval)
            .field("poll_timeout", &self.poll_timeout)
            .field("user_agent", &self.user_agent)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn non_empty_env(key: &str) -> Option<String> {
    non_blank(env::var(key).ok())
}
