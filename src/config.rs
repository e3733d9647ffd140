use crate::utils::{check_non_empty, check_num};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

/// Working directory configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data: DataConfig,
    pub weather: WeatherConfig,
}

/// Historical data source.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// CSV file, relative to the working directory unless absolute.
    pub file: PathBuf,
}

/// Live weather service.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherConfig {
    /// Current-weather endpoint.
    pub base_url: String,
    /// Unit system requested from the service.
    pub units: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Environment variable holding the access key.
    pub api_key_env: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("temperature_data.csv"),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            units: "metric".to_string(),
            timeout_secs: 10,
            api_key_env: "OPENWEATHERMAP_API_KEY".to_string(),
        }
    }
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded. Missing sections and keys take their
    /// default values. Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        check_non_empty("data file", &self.data.file.to_string_lossy())
            .context("invalid data file")?;

        check_non_empty("base url", &self.weather.base_url).context("invalid base url")?;
        check_non_empty("units", &self.weather.units).context("invalid units")?;
        check_num(self.weather.timeout_secs, 1..=120).context("invalid timeout")?;
        check_non_empty("api key env", &self.weather.api_key_env)
            .context("invalid api key variable")?;

        Ok(())
    }
}
