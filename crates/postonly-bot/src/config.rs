//! Application configuration.
//!
//! Loaded from TOML; secrets are taken from the environment and never read
//! from the file.

use crate::error::{AppError, AppResult};
use postonly_arbiter::ArbiterConfig;
use postonly_core::{Price, Size, Symbol, SymbolSpec};
use postonly_exchange::{ApiCredentials, BinanceConfig};
use postonly_executor::{ExecutorConfig, ExitPolicy};
use postonly_webhook::WebhookConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config path used when neither `--config` nor `POSTONLY_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

pub const ENV_CONFIG_PATH: &str = "POSTONLY_CONFIG";
pub const ENV_API_KEY: &str = "BINANCE_API_KEY";
pub const ENV_API_SECRET: &str = "BINANCE_API_SECRET";
pub const ENV_WEBHOOK_SECRET: &str = "TV_WEBHOOK_SECRET";
pub const ENV_BASE_URL: &str = "BINANCE_BASE_URL";

/// Account and symbol settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Symbols the bot trades. Specs are loaded for these at startup.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    /// Leverage applied to every symbol at startup.
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    /// Switch symbols to isolated margin at startup.
    #[serde(default = "default_true")]
    pub isolated_margin: bool,
}

fn default_symbols() -> Vec<String> {
    vec!["ETHUSDT".to_string()]
}

fn default_leverage() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            leverage: default_leverage(),
            isolated_margin: default_true(),
        }
    }
}

/// One simulated market for `run --paper`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperMarket {
    pub symbol: String,
    #[serde(default = "default_paper_tick")]
    pub tick_size: Decimal,
    #[serde(default = "default_paper_step")]
    pub step_size: Decimal,
    #[serde(default = "default_paper_notional")]
    pub min_notional: Decimal,
    #[serde(default = "default_paper_bid")]
    pub bid: Decimal,
    #[serde(default = "default_paper_ask")]
    pub ask: Decimal,
}

fn default_paper_tick() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_paper_step() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

fn default_paper_notional() -> Decimal {
    Decimal::new(5, 0)
}

fn default_paper_bid() -> Decimal {
    Decimal::new(300_000, 2) // 3000.00
}

fn default_paper_ask() -> Decimal {
    Decimal::new(300_001, 2) // 3000.01
}

impl PaperMarket {
    /// Market with default spec and book.
    pub fn with_defaults(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            tick_size: default_paper_tick(),
            step_size: default_paper_step(),
            min_notional: default_paper_notional(),
            bid: default_paper_bid(),
            ask: default_paper_ask(),
        }
    }

    pub fn spec(&self) -> SymbolSpec {
        SymbolSpec::new(
            Price::new(self.tick_size),
            Size::new(self.step_size),
            self.min_notional,
        )
    }
}

/// Simulated exchange markets. Symbols without an entry get the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaperConfig {
    #[serde(default)]
    pub markets: Vec<PaperMarket>,
}

impl PaperConfig {
    pub fn market(&self, symbol: &Symbol) -> PaperMarket {
        self.markets
            .iter()
            .find(|m| m.symbol.eq_ignore_ascii_case(symbol.as_str()))
            .cloned()
            .unwrap_or_else(|| PaperMarket::with_defaults(symbol.as_str()))
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub binance: BinanceConfig,
    #[serde(default)]
    pub arbiter: ArbiterConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub exits: ExitPolicy,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub paper: PaperConfig,
}

impl AppConfig {
    /// Resolve the config path: CLI arg > `POSTONLY_CONFIG` > default.
    pub fn resolve_path(cli: Option<String>) -> String {
        cli.or_else(|| std::env::var(ENV_CONFIG_PATH).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load configuration, falling back to defaults when the default path
    /// does not exist. An explicitly named file must exist.
    pub fn load(path: &str) -> AppResult<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else if path == DEFAULT_CONFIG_PATH {
            tracing::warn!(path, "Config file not found, using defaults");
            Self::default()
        } else {
            return Err(AppError::Config(format!("Config file not found: {path}")));
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Apply environment overrides. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(secret) = get(ENV_WEBHOOK_SECRET) {
            self.webhook.secret = secret;
        }
        if let Some(url) = get(ENV_BASE_URL) {
            self.binance.base_url = url;
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        let symbols = self.symbols()?;
        if symbols.is_empty() {
            return Err(AppError::Config("bot.symbols must not be empty".to_string()));
        }
        let default_symbol = Symbol::new(&self.webhook.default_symbol)
            .map_err(|e| AppError::Config(format!("webhook.default_symbol: {e}")))?;
        if !symbols.contains(&default_symbol) {
            return Err(AppError::Config(format!(
                "webhook.default_symbol {default_symbol} is not listed in bot.symbols"
            )));
        }
        if !(1..=125).contains(&self.bot.leverage) {
            return Err(AppError::Config(format!(
                "bot.leverage must be within 1..=125, got {}",
                self.bot.leverage
            )));
        }
        if self.executor.default_quantity <= Decimal::ZERO {
            return Err(AppError::Config(
                "executor.default_quantity must be positive".to_string(),
            ));
        }
        if self.executor.fill_ratio <= Decimal::ZERO || self.executor.fill_ratio > Decimal::ONE {
            return Err(AppError::Config(
                "executor.fill_ratio must be within (0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed, de-duplicated trading symbols in configured order.
    pub fn symbols(&self) -> AppResult<Vec<Symbol>> {
        let mut out: Vec<Symbol> = Vec::with_capacity(self.bot.symbols.len());
        for raw in &self.bot.symbols {
            let symbol = Symbol::new(raw)
                .map_err(|e| AppError::Config(format!("bot.symbols: {e}")))?;
            if !out.contains(&symbol) {
                out.push(symbol);
            }
        }
        Ok(out)
    }
}

/// Read the API key pair from the environment.
pub fn credentials_from_env(lookup: impl Fn(&str) -> Option<String>) -> AppResult<ApiCredentials> {
    let key = lookup(ENV_API_KEY).unwrap_or_default();
    let secret = lookup(ENV_API_SECRET).unwrap_or_default();
    let credentials = ApiCredentials::new(key.trim(), secret.trim());
    if credentials.is_empty() {
        return Err(AppError::Config(format!(
            "{ENV_API_KEY} and {ENV_API_SECRET} must be set (or use --paper)"
        )));
    }
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.bot.symbols, vec!["ETHUSDT"]);
        assert_eq!(config.bot.leverage, 10);
        assert!(config.bot.isolated_margin);
        assert_eq!(config.webhook.port, 8000);
        assert_eq!(config.webhook.default_symbol, "ETHUSDT");
        assert_eq!(config.binance.base_url, "https://fapi.binance.com");
        assert_eq!(config.executor.default_quantity, dec!(0.01));
        assert_eq!(config.executor.max_retries, 25);
        assert_eq!(config.arbiter.window_secs, 90);
        assert_eq!(config.exits.take_profit_pct, dec!(0.01));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = AppConfig::from_toml(include_str!("../../../config/default.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.executor.fill_ratio, dec!(0.999));
        assert_eq!(config.exits.stop_loss_pct, dec!(0.005));
        assert_eq!(config.paper.markets.len(), 1);
    }

    #[test]
    fn test_sections_override_defaults() {
        let toml = r#"
            [bot]
            symbols = ["ethusdt", "BTCUSDT", "ETHUSDT"]
            leverage = 5

            [executor]
            default_quantity = "0.02"
            close_timeout_ms = 1000

            [arbiter]
            enabled = false

            [exits]
            stop_loss_enabled = false

            [webhook]
            port = 9000

            [[paper.markets]]
            symbol = "BTCUSDT"
            tick_size = "0.1"
            bid = "60000.0"
            ask = "60000.1"
        "#;
        let config = AppConfig::from_toml(toml).unwrap();
        assert_eq!(config.bot.leverage, 5);
        assert_eq!(config.executor.default_quantity, dec!(0.02));
        assert_eq!(config.executor.close_timeout_ms, 1000);
        assert_eq!(config.executor.max_retries, 25);
        assert!(!config.arbiter.enabled);
        assert!(!config.exits.stop_loss_enabled);
        assert!(config.exits.take_profit_enabled);
        assert_eq!(config.webhook.port, 9000);

        let symbols = config.symbols().unwrap();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].as_str(), "ETHUSDT");

        let btc = config.paper.market(&symbols[1]);
        assert_eq!(btc.tick_size, dec!(0.1));
        assert_eq!(btc.step_size, dec!(0.001));
        assert_eq!(btc.bid, dec!(60000.0));
        let eth = config.paper.market(&symbols[0]);
        assert_eq!(eth.ask, dec!(3000.01));
    }

    #[test]
    fn test_secret_in_file_is_ignored_for_serialization() {
        let config = AppConfig::from_toml("[webhook]\nsecret = \"abc\"").unwrap();
        assert!(config.webhook.auth_enabled());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("abc"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            (ENV_WEBHOOK_SECRET, "tv-secret"),
            (ENV_BASE_URL, "https://testnet.binancefuture.com"),
        ]));
        assert_eq!(config.webhook.secret, "tv-secret");
        assert_eq!(config.binance.base_url, "https://testnet.binancefuture.com");

        let mut config = AppConfig::default();
        config.apply_env(env(&[(ENV_WEBHOOK_SECRET, "  ")]));
        assert!(!config.webhook.auth_enabled());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.bot.symbols.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.webhook.default_symbol = "BTCUSDT".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.bot.leverage = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.bot.symbols = vec!["ETH/USDT".to_string()];
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.executor.fill_ratio = dec!(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credentials_from_env() {
        let creds = credentials_from_env(env(&[
            (ENV_API_KEY, "key"),
            (ENV_API_SECRET, "secret"),
        ]))
        .unwrap();
        assert_eq!(creds.api_key(), "key");

        assert!(credentials_from_env(env(&[(ENV_API_KEY, "key")])).is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        assert!(AppConfig::load("/nonexistent/postonly.toml").is_err());
    }
}
