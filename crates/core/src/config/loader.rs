use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for namespaced environment overrides, e.g. `LECTERN_STORAGE__BUCKET`.
pub const ENV_PREFIX: &str = "LECTERN_";

/// Load configuration from an optional TOML file with environment overrides.
///
/// `CHROME_WS_ENDPOINT` is honored as `session.endpoint`; a namespaced
/// `LECTERN_SESSION__ENDPOINT` takes precedence over it.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::new();

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        figment = figment.merge(Toml::file(path));
    }

    let config: Config = figment
        .merge(
            Env::raw()
                .only(&["CHROME_WS_ENDPOINT"])
                .map(|_| "session.endpoint".into()),
        )
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
