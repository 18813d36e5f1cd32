//! Configuration parsing and validation for caregate.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: Option<DatabaseConfig>,
    pub llm: LlmConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub cost: CostConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8080")
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Call audit database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "./caregate.db".to_string()
}

/// System-wide model defaults, used when no routing rule matches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    pub default_provider: String,
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.7
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value. Every call site is auditable via `grep expose_secret`.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> serde::Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiKey(SecretString::from(s)))
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// How a provider's API key was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySource {
    /// Key was a literal string in config (no ${} references)
    Literal,
    /// Key contained ${VAR} references expanded from environment
    EnvExpanded,
    /// Key was auto-discovered from convention env var (holds var name)
    Convention(String),
    /// No key available
    None,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Literal => write!(f, "config-literal"),
            KeySource::EnvExpanded => write!(f, "env-expanded"),
            KeySource::Convention(var) => write!(f, "convention ({})", var),
            KeySource::None => write!(f, "none"),
        }
    }
}

/// Provider endpoint configuration for the built-in OpenAI-compatible adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Provider name referenced by `llm.default_provider` and routing rules
    pub name: String,
    /// Base URL for the provider's API (e.g., "https://api.openai.com/v1")
    pub url: String,
    pub api_key: Option<ApiKey>,
    /// Input token price in USD per million tokens
    #[serde(default)]
    pub input_cost_per_1m: f64,
    /// Output token price in USD per million tokens
    #[serde(default)]
    pub output_cost_per_1m: f64,
}

/// Routing rules, matched against the request topic in declaration order.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RoutingConfig {
    #[serde(default)]
    pub rules: Vec<RouteRule>,
}

/// How a route executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStrategy {
    /// Single attempt against the route's provider/model.
    #[default]
    Default,
    /// Try each candidate in order until one succeeds.
    Fallback,
}

impl std::fmt::Display for RouteStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteStrategy::Default => write!(f, "default"),
            RouteStrategy::Fallback => write!(f, "fallback"),
        }
    }
}

/// Per-route soft bounds. Both are observational: exceeding them logs a warning.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct RouteBudget {
    pub max_cost_usd: Option<f64>,
    pub max_latency_ms: Option<u64>,
}

/// One entry of a fallback chain.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Candidate {
    pub provider: String,
    pub model: String,
    pub temperature: Option<f32>,
}

/// A declarative routing rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteRule {
    /// Rule name, reported back as the route name
    pub name: String,
    /// Topic pattern; `*` matches any sequence, everything else is literal
    #[serde(rename = "match")]
    pub match_pattern: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    #[serde(default)]
    pub strategy: RouteStrategy,
    pub budget: Option<RouteBudget>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Cost governance configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CostConfig {
    #[serde(default)]
    pub hard_limits: HardLimits,
}

/// Spend ceilings in USD. A missing ceiling means no limit.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Default)]
pub struct HardLimits {
    pub daily: Option<f64>,
    pub monthly: Option<f64>,
    pub per_tenant: Option<f64>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to mirror recorded calls to the audit database
    #[serde(default = "default_true")]
    pub log_calls: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_calls: true,
        }
    }
}

impl Config {
    /// Parse configuration from a TOML string.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.default_provider.trim().is_empty() {
            return Err(ConfigError::Validation(
                "llm.default_provider must not be empty".to_string(),
            ));
        }
        if self.llm.default_model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "llm.default_model must not be empty".to_string(),
            ));
        }
        if !is_valid_temperature(self.llm.temperature) {
            return Err(ConfigError::Validation(format!(
                "llm.temperature must be a finite non-negative number, got {}",
                self.llm.temperature
            )));
        }

        for provider in &self.providers {
            if provider.url.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Provider '{}' has empty URL",
                    provider.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for rule in &self.routing.rules {
            if !seen.insert(rule.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate routing rule name '{}'",
                    rule.name
                )));
            }
            let temperatures = std::iter::once(rule.temperature)
                .chain(rule.candidates.iter().map(|c| c.temperature));
            if temperatures.flatten().any(|t| !is_valid_temperature(t)) {
                return Err(ConfigError::Validation(format!(
                    "Rule '{}' has a negative or non-finite temperature",
                    rule.name
                )));
            }
            if rule.strategy == RouteStrategy::Fallback && rule.candidates.is_empty() {
                tracing::warn!(
                    rule = %rule.name,
                    "Fallback rule has no candidates - it will execute as a single route"
                );
            }
            for provider in self.rule_providers(rule) {
                if !self.providers.iter().any(|p| p.name == provider) {
                    tracing::warn!(
                        rule = %rule.name,
                        provider = %provider,
                        "Rule references a provider with no configured endpoint"
                    );
                }
            }
        }

        let limits = &self.cost.hard_limits;
        for (name, value) in [
            ("daily", limits.daily),
            ("monthly", limits.monthly),
            ("per_tenant", limits.per_tenant),
        ] {
            if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
                return Err(ConfigError::Validation(format!(
                    "cost.hard_limits.{} must be a finite non-negative number",
                    name
                )));
            }
        }

        if self.providers.is_empty() {
            tracing::warn!("No provider endpoints configured - only registered adapters can serve calls");
        }

        Ok(())
    }

    /// Provider names a rule can dispatch to.
    fn rule_providers<'a>(&'a self, rule: &'a RouteRule) -> Vec<&'a str> {
        let mut names: Vec<&str> = rule.candidates.iter().map(|c| c.provider.as_str()).collect();
        names.push(
            rule.provider
                .as_deref()
                .unwrap_or(self.llm.default_provider.as_str()),
        );
        names
    }
}

fn is_valid_temperature(t: f32) -> bool {
    t.is_finite() && t >= 0.0
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable '{var}' not set for provider '{provider}': {message}")]
    EnvVar {
        var: String,
        provider: String,
        message: String,
    },
}

/// Raw provider config deserialized directly from TOML.
/// api_key is `Option<String>` so it may contain `${VAR}` references not yet expanded.
#[derive(Deserialize)]
pub struct RawProviderConfig {
    name: String,
    url: String,
    api_key: Option<String>,
    #[serde(default)]
    input_cost_per_1m: f64,
    #[serde(default)]
    output_cost_per_1m: f64,
}

/// Raw configuration deserialized directly from TOML.
#[derive(Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    server: ServerConfig,
    database: Option<DatabaseConfig>,
    llm: LlmConfig,
    #[serde(default)]
    providers: Vec<RawProviderConfig>,
    #[serde(default)]
    routing: RoutingConfig,
    #[serde(default)]
    cost: CostConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// Supports multiple `${VAR}` in one string (e.g., `${SCHEME}://${HOST}/v1`).
/// Fails on first missing variable, unclosed `${`, or empty variable name.
fn expand_env_vars_with<F>(
    input: &str,
    provider_name: &str,
    lookup: F,
) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            provider: provider_name.to_string(),
            message: format!("Unclosed '${{' in config value: {}", input),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                provider: provider_name.to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVar {
            var: var_name.to_string(),
            provider: provider_name.to_string(),
            message: format!(
                "Environment variable '{}' is not set (referenced in provider '{}')",
                var_name, provider_name
            ),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

fn expand_env_vars(input: &str, provider_name: &str) -> Result<String, ConfigError> {
    expand_env_vars_with(input, provider_name, |name| std::env::var(name).ok())
}

/// Derive the convention-based env var name for a provider.
///
/// - "openai" -> "CAREGATE_OPENAI_API_KEY"
/// - "azure-east" -> "CAREGATE_AZURE_EAST_API_KEY"
pub fn convention_env_var_name(provider_name: &str) -> String {
    let upper_snake = provider_name.to_uppercase().replace(['-', ' '], "_");
    format!("CAREGATE_{}_API_KEY", upper_snake)
}

fn convention_key_lookup(provider_name: &str) -> Option<(String, String)> {
    let var_name = convention_env_var_name(provider_name);
    std::env::var(&var_name).ok().map(|value| (var_name, value))
}

impl Config {
    /// Convert raw (deserialized) config to final config with env var expansion.
    ///
    /// For each provider:
    /// - `api_key` containing `${VAR}` is expanded from the environment (`EnvExpanded`)
    /// - a literal `api_key` is wrapped directly (`Literal`)
    /// - an absent `api_key` falls back to `CAREGATE_<NAME>_API_KEY` (`Convention`)
    pub fn from_raw(raw: RawConfig) -> Result<(Self, Vec<(String, KeySource)>), ConfigError> {
        let mut providers = Vec::with_capacity(raw.providers.len());
        let mut key_sources = Vec::with_capacity(raw.providers.len());

        for rp in raw.providers {
            let (api_key, source) = match rp.api_key {
                Some(ref raw_key) if raw_key.contains("${") => {
                    let expanded = expand_env_vars(raw_key, &rp.name)?;
                    (Some(ApiKey::from(expanded)), KeySource::EnvExpanded)
                }
                Some(ref raw_key) => (Some(ApiKey::from(raw_key.as_str())), KeySource::Literal),
                None => match convention_key_lookup(&rp.name) {
                    Some((var_name, value)) => {
                        (Some(ApiKey::from(value)), KeySource::Convention(var_name))
                    }
                    None => (None, KeySource::None),
                },
            };

            key_sources.push((rp.name.clone(), source));

            providers.push(ProviderConfig {
                name: rp.name,
                url: rp.url,
                api_key,
                input_cost_per_1m: rp.input_cost_per_1m,
                output_cost_per_1m: rp.output_cost_per_1m,
            });
        }

        let config = Config {
            server: raw.server,
            database: raw.database,
            llm: raw.llm,
            providers,
            routing: raw.routing,
            cost: raw.cost,
            logging: raw.logging,
        };

        Ok((config, key_sources))
    }

    /// Load configuration from a TOML file with environment variable expansion.
    ///
    /// Returns the config and per-provider key source information.
    pub fn from_file_with_env(
        path: impl AsRef<Path>,
    ) -> Result<(Self, Vec<(String, KeySource)>), ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        let raw: RawConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;
        let (config, key_sources) = Self::from_raw(raw)?;
        config.validate()?;

        Ok((config, key_sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [llm]
        default_provider = "openai"
        default_model = "gpt-4o-mini"
    "#;

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::parse_str(MINIMAL).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.llm.default_provider, "openai");
        assert_eq!(config.llm.temperature, 0.7);
        assert!(config.routing.rules.is_empty());
        assert_eq!(config.cost.hard_limits, HardLimits::default());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [server]
            listen = "0.0.0.0:9090"

            [database]
            path = "./test.db"

            [llm]
            default_provider = "openai"
            default_model = "gpt-4o-mini"
            temperature = 0.3

            [[providers]]
            name = "openai"
            url = "https://api.openai.com/v1"
            input_cost_per_1m = 0.15
            output_cost_per_1m = 0.60

            [[providers]]
            name = "anthropic"
            url = "https://anthropic.example.com/v1"

            [[routing.rules]]
            name = "risk"
            match = "healthcare.risk_*"
            provider = "anthropic"
            model = "claude-3-5-sonnet"
            temperature = 0.1
            budget = { max_cost_usd = 0.5, max_latency_ms = 8000 }

            [[routing.rules]]
            name = "care-plans"
            match = "healthcare.*"
            strategy = "fallback"
            candidates = [
                { provider = "anthropic", model = "claude-3-5-sonnet", temperature = 0.2 },
                { provider = "openai", model = "gpt-4o" },
            ]

            [cost.hard_limits]
            daily = 10.0
            monthly = 200.0
            per_tenant = 25.0

            [logging]
            level = "debug"
            log_calls = false
        "#;

        let config = Config::parse_str(toml).unwrap();
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[0].input_cost_per_1m, 0.15);
        assert_eq!(config.routing.rules.len(), 2);

        let risk = &config.routing.rules[0];
        assert_eq!(risk.match_pattern, "healthcare.risk_*");
        assert_eq!(risk.strategy, RouteStrategy::Default);
        assert_eq!(risk.budget.unwrap().max_latency_ms, Some(8000));

        let plans = &config.routing.rules[1];
        assert_eq!(plans.strategy, RouteStrategy::Fallback);
        assert_eq!(plans.candidates.len(), 2);
        assert_eq!(plans.candidates[1].temperature, None);

        assert_eq!(config.cost.hard_limits.daily, Some(10.0));
        assert_eq!(config.cost.hard_limits.per_tenant, Some(25.0));
        assert!(!config.logging.log_calls);
    }

    #[test]
    fn test_missing_llm_section_fails() {
        let result = Config::parse_str("[server]\nlisten = \"127.0.0.1:1\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_empty_default_model_fails() {
        let toml = r#"
            [llm]
            default_provider = "openai"
            default_model = ""
        "#;
        let err = Config::parse_str(toml).unwrap_err().to_string();
        assert!(err.contains("default_model"), "{}", err);
    }

    #[test]
    fn test_duplicate_rule_names_fail() {
        let toml = format!(
            "{}{}",
            MINIMAL,
            r#"
            [[routing.rules]]
            name = "a"
            match = "x.*"

            [[routing.rules]]
            name = "a"
            match = "y.*"
            "#
        );
        let err = Config::parse_str(&toml).unwrap_err().to_string();
        assert!(err.contains("Duplicate routing rule name 'a'"), "{}", err);
    }

    #[test]
    fn test_negative_ceiling_fails() {
        let toml = format!("{}\n[cost.hard_limits]\ndaily = -1.0\n", MINIMAL);
        let err = Config::parse_str(&toml).unwrap_err().to_string();
        assert!(err.contains("cost.hard_limits.daily"), "{}", err);
    }

    #[test]
    fn test_non_finite_ceiling_fails() {
        for value in ["nan", "inf", "-inf"] {
            let toml = format!("{}\n[cost.hard_limits]\nmonthly = {}\n", MINIMAL, value);
            let err = Config::parse_str(&toml).unwrap_err().to_string();
            assert!(err.contains("cost.hard_limits.monthly"), "{}: {}", value, err);
        }
    }

    #[test]
    fn test_non_finite_temperatures_fail() {
        let llm = MINIMAL.replace("gpt-4o-mini\"", "gpt-4o-mini\"\n        temperature = nan");
        assert!(matches!(
            Config::parse_str(&llm),
            Err(ConfigError::Validation(_))
        ));

        let rule = format!(
            "{}\n[[routing.rules]]\nname = \"a\"\nmatch = \"*\"\ntemperature = inf\n",
            MINIMAL
        );
        let err = Config::parse_str(&rule).unwrap_err().to_string();
        assert!(err.contains("Rule 'a'"), "{}", err);

        let candidate = format!(
            "{}\n[[routing.rules]]\nname = \"b\"\nmatch = \"*\"\nstrategy = \"fallback\"\n\n\
             [[routing.rules.candidates]]\nprovider = \"openai\"\nmodel = \"gpt-4o\"\ntemperature = nan\n",
            MINIMAL
        );
        let err = Config::parse_str(&candidate).unwrap_err().to_string();
        assert!(err.contains("Rule 'b'"), "{}", err);
    }

    #[test]
    fn test_unknown_strategy_fails() {
        let toml = format!(
            "{}\n[[routing.rules]]\nname = \"a\"\nmatch = \"*\"\nstrategy = \"round_robin\"\n",
            MINIMAL
        );
        assert!(matches!(
            Config::parse_str(&toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_api_key_debug_redaction() {
        let key = ApiKey::from("sk-super-secret");
        let debug_output = format!("{:?}", key);
        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("super-secret"));
    }

    #[test]
    fn test_api_key_serialize_redaction() {
        let key = ApiKey::from("real-secret-value");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"[REDACTED]\"");
    }

    #[test]
    fn test_provider_config_debug_redaction() {
        let toml = format!(
            "{}\n[[providers]]\nname = \"openai\"\nurl = \"https://x.test/v1\"\napi_key = \"sk-abc123secret\"\n",
            MINIMAL
        );
        let config = Config::parse_str(&toml).unwrap();
        let provider = &config.providers[0];
        assert_eq!(
            provider.api_key.as_ref().unwrap().expose_secret(),
            "sk-abc123secret"
        );
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("sk-abc123secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    // ── Expansion tests (using expand_env_vars_with, no global env state) ──

    #[test]
    fn test_expand_multiple_vars() {
        let lookup = |name: &str| match name {
            "SCHEME" => Some("https".to_string()),
            "HOST" => Some("example.com".to_string()),
            _ => None,
        };
        let result = expand_env_vars_with("${SCHEME}://${HOST}/v1", "test", lookup).unwrap();
        assert_eq!(result, "https://example.com/v1");
    }

    #[test]
    fn test_expand_no_vars_passthrough() {
        let lookup = |_: &str| -> Option<String> { panic!("should not be called") };
        let result = expand_env_vars_with("$NOT_A_VAR", "test", lookup).unwrap();
        assert_eq!(result, "$NOT_A_VAR");
    }

    #[test]
    fn test_expand_missing_var_fails() {
        let lookup = |_: &str| None;
        let err = expand_env_vars_with("${MISSING}", "openai", lookup)
            .unwrap_err()
            .to_string();
        assert!(err.contains("MISSING"));
        assert!(err.contains("openai"));
    }

    #[test]
    fn test_expand_unclosed_brace_fails() {
        let lookup = |_: &str| -> Option<String> { panic!("should not be called") };
        let err = expand_env_vars_with("${UNCLOSED", "test", lookup)
            .unwrap_err()
            .to_string()
            .to_lowercase();
        assert!(err.contains("unclosed"));
    }

    #[test]
    fn test_expand_empty_var_name_fails() {
        let lookup = |_: &str| -> Option<String> { panic!("should not be called") };
        let err = expand_env_vars_with("${}", "test", lookup)
            .unwrap_err()
            .to_string()
            .to_lowercase();
        assert!(err.contains("empty"));
    }

    #[test]
    fn test_convention_env_var_name() {
        assert_eq!(convention_env_var_name("openai"), "CAREGATE_OPENAI_API_KEY");
        assert_eq!(
            convention_env_var_name("azure-east"),
            "CAREGATE_AZURE_EAST_API_KEY"
        );
    }

    fn make_raw_config(provider_name: &str, api_key: Option<String>) -> RawConfig {
        RawConfig {
            server: ServerConfig::default(),
            database: None,
            llm: LlmConfig {
                default_provider: provider_name.to_string(),
                default_model: "gpt-4o-mini".to_string(),
                temperature: 0.7,
            },
            providers: vec![RawProviderConfig {
                name: provider_name.to_string(),
                url: "https://example.com/v1".to_string(),
                api_key,
                input_cost_per_1m: 0.0,
                output_cost_per_1m: 0.0,
            }],
            routing: RoutingConfig::default(),
            cost: CostConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_from_raw_literal_key() {
        let raw = make_raw_config("test-literal", Some("literal-key-value".to_string()));
        let (config, key_sources) = Config::from_raw(raw).unwrap();

        assert_eq!(key_sources[0].1, KeySource::Literal);
        assert_eq!(
            config.providers[0].api_key.as_ref().unwrap().expose_secret(),
            "literal-key-value"
        );
    }

    #[test]
    fn test_from_raw_env_expanded_key() {
        let var_name = "CAREGATE_TEST_CFG_EXPAND_KEY";
        unsafe { std::env::set_var(var_name, "sk-expanded") };

        let raw = make_raw_config("test-env-expand", Some(format!("${{{}}}", var_name)));
        let (config, key_sources) = Config::from_raw(raw).unwrap();

        assert_eq!(key_sources[0].1, KeySource::EnvExpanded);
        assert_eq!(
            config.providers[0].api_key.as_ref().unwrap().expose_secret(),
            "sk-expanded"
        );

        unsafe { std::env::remove_var(var_name) };
    }

    #[test]
    fn test_from_raw_convention_key() {
        let provider_name = "test-conv-cfg";
        let var_name = convention_env_var_name(provider_name);
        unsafe { std::env::set_var(&var_name, "sk-convention") };

        let raw = make_raw_config(provider_name, None);
        let (config, key_sources) = Config::from_raw(raw).unwrap();

        assert_eq!(key_sources[0].1, KeySource::Convention(var_name.clone()));
        assert_eq!(
            config.providers[0].api_key.as_ref().unwrap().expose_secret(),
            "sk-convention"
        );

        unsafe { std::env::remove_var(&var_name) };
    }

    #[test]
    fn test_from_raw_no_key() {
        let provider_name = "test-nokey-cfg-unique";
        unsafe { std::env::remove_var(convention_env_var_name(provider_name)) };

        let raw = make_raw_config(provider_name, None);
        let (config, key_sources) = Config::from_raw(raw).unwrap();

        assert_eq!(key_sources[0].1, KeySource::None);
        assert!(config.providers[0].api_key.is_none());
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse_str(include_str!("../config.example.toml")).unwrap();
        assert_eq!(config.routing.rules.len(), 2);
        assert_eq!(config.routing.rules[1].strategy, RouteStrategy::Fallback);
        assert_eq!(config.routing.rules[1].candidates.len(), 2);
        assert_eq!(config.cost.hard_limits.per_tenant, Some(100.0));
    }
}
