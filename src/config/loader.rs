use std::path::Path;
use tracing::{debug, info};

use super::settings::DashboardConfig;
use crate::error::DashboardError;

pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";
const ENV_PREFIX: &str = "DASHBOARD";

/// Layers defaults, an optional TOML file and `DASHBOARD_*` environment
/// variables (`__` separates nested keys).
pub fn load_config(path: Option<&str>) -> Result<DashboardConfig, DashboardError> {
    dotenvy::dotenv().ok();

    let file = path.unwrap_or(DEFAULT_CONFIG_FILE);
    let required = path.is_some();
    if Path::new(file).exists() {
        info!("Loading configuration from {}", file);
    } else {
        debug!("No configuration file at {}, using defaults", file);
    }

    let defaults = config::Config::try_from(&DashboardConfig::default())?;
    let settings = config::Config::builder()
        .add_source(defaults)
        .add_source(config::File::with_name(file).required(required))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("defaults.symbols")
                .with_list_parse_key("defaults.training_symbols")
                .try_parsing(true),
        )
        .build()?;

    let config: DashboardConfig = settings.try_deserialize()?;
    config
        .validate()
        .map_err(|errors| DashboardError::Config(errors.join(", ")))?;

    Ok(config)
}

pub fn render_default_config() -> Result<String, DashboardError> {
    toml::to_string_pretty(&DashboardConfig::default())
        .map_err(|e| DashboardError::Config(e.to_string()))
}
