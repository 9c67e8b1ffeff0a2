use std::path::Path;

use cmsis_swd::{ProbeSelector, SessionConfig};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use super::logging::LevelFilter;

/// Prefix of the environment variables overriding the configuration.
///
/// Nested keys are separated with `__`, e.g. `CMSIS_SWD_SESSION__SWJ_CLOCK_HZ`.
const ENV_PREFIX: &str = "CMSIS_SWD_";

/// Settings of the command line tool.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub log_level: Option<LevelFilter>,
    /// The probe to use when none is given on the command line.
    pub probe: Option<ProbeSelector>,
    pub session: SessionConfig,
}

/// Load the configuration: built-in defaults, then the TOML file if one is
/// given, then the environment.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut figment = Figment::new();

    if let Some(path) = path {
        if !path.is_file() {
            anyhow::bail!("Config file {} does not exist.", path.display());
        }
        figment = figment.merge(Toml::file(path));
    }

    let config = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract::<Config>()
        .map_err(|errors| {
            anyhow::anyhow!(
                "Failed to parse the configuration:\n{}",
                errors
                    .into_iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        })?;

    Ok(config)
}
