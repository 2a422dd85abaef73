use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::types::TradingMode;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub gateway: GatewaySettings,
    pub polling: PollingSettings,
    pub refresh: RefreshSettings,
    pub server: ServerSettings,
    pub defaults: CommandDefaults,
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Gateway validation
        if self.gateway.base_url.trim().is_empty() {
            errors.push("gateway.base_url must not be empty".to_string());
        } else if !self.gateway.base_url.starts_with("http://")
            && !self.gateway.base_url.starts_with("https://")
        {
            errors.push("gateway.base_url must start with http:// or https://".to_string());
        }
        if self.gateway.request_timeout_secs == 0 {
            errors.push("gateway.request_timeout_secs must be > 0".to_string());
        }

        // Polling validation
        for (name, secs) in [
            ("status_interval_secs", self.polling.status_interval_secs),
            ("portfolio_interval_secs", self.polling.portfolio_interval_secs),
            ("holdings_interval_secs", self.polling.holdings_interval_secs),
            ("trades_interval_secs", self.polling.trades_interval_secs),
            ("system_interval_secs", self.polling.system_interval_secs),
        ] {
            if secs == 0 {
                errors.push(format!("polling.{} must be > 0", name));
            }
        }

        // Command defaults validation
        if self.defaults.reset_balance <= Decimal::ZERO {
            errors.push("defaults.reset_balance must be > 0".to_string());
        }
        if self.defaults.days == 0 {
            errors.push("defaults.days must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Where the session token is persisted between CLI invocations.
    pub token_file: Option<PathBuf>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 30,
            token_file: None,
        }
    }
}

impl GatewaySettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Configured token file, else `$HOME/.bot_dashboard/token`, else `.dashboard_token`.
    pub fn token_path(&self) -> PathBuf {
        if let Some(path) = &self.token_file {
            return path.clone();
        }
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".bot_dashboard").join("token"))
            .unwrap_or_else(|| PathBuf::from(".dashboard_token"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub status_interval_secs: u64,
    pub portfolio_interval_secs: u64,
    pub holdings_interval_secs: u64,
    pub trades_interval_secs: u64,
    /// Upstream price API connectivity changes rarely.
    pub system_interval_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            status_interval_secs: 5,
            portfolio_interval_secs: 30,
            holdings_interval_secs: 10,
            trades_interval_secs: 10,
            system_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Second fan-out after a lifecycle transition, for gateway-side settling.
    pub followup_delay_ms: u64,
    /// Fan-out delay after a run command.
    pub command_followup_delay_ms: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            followup_delay_ms: 1000,
            command_followup_delay_ms: 2000,
        }
    }
}

impl RefreshSettings {
    pub fn followup_delay(&self) -> Option<Duration> {
        (self.followup_delay_ms > 0).then(|| Duration::from_millis(self.followup_delay_ms))
    }

    pub fn command_followup_delay(&self) -> Duration {
        Duration::from_millis(self.command_followup_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandDefaults {
    pub reset_balance: Decimal,
    pub symbols: Vec<String>,
    pub training_symbols: Vec<String>,
    pub days: u32,
    pub mode: TradingMode,
}

impl Default for CommandDefaults {
    fn default() -> Self {
        Self {
            reset_balance: dec!(1000),
            symbols: vec![
                "bitcoin".to_string(),
                "ethereum".to_string(),
                "solana".to_string(),
            ],
            training_symbols: vec!["bitcoin".to_string(), "ethereum".to_string()],
            days: 365,
            mode: TradingMode::Trading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(DashboardConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = DashboardConfig::default();
        config.gateway.base_url = "localhost:8080".to_string();
        config.polling.trades_interval_secs = 0;
        config.defaults.reset_balance = Decimal::ZERO;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("trades_interval_secs")));
    }

    #[test]
    fn test_explicit_token_file_wins() {
        let gateway = GatewaySettings {
            token_file: Some(PathBuf::from("/tmp/session")),
            ..GatewaySettings::default()
        };
        assert_eq!(gateway.token_path(), PathBuf::from("/tmp/session"));
        assert!(GatewaySettings::default().token_path().to_string_lossy().contains("token"));
    }

    #[test]
    fn test_zero_followup_disables_second_fanout() {
        let refresh = RefreshSettings {
            followup_delay_ms: 0,
            ..RefreshSettings::default()
        };
        assert!(refresh.followup_delay().is_none());
        assert_eq!(
            RefreshSettings::default().followup_delay(),
            Some(Duration::from_millis(1000))
        );
    }
}
