//! Current-weather client for an OpenWeatherMap-compatible service.
//!
//! Request: `GET <base_url>?q=<city>&appid=<key>&units=<units>`.
//! A successful response carries the temperature at `main.temp`.

use crate::config::WeatherConfig;
use anyhow::{Context, Result};
use std::time::Duration;
use thiserror::Error;

/// Failure to obtain a live reading.
///
/// Service responses are kept verbatim so they can be shown to the user.
#[derive(Debug, Error, PartialEq)]
pub enum WeatherError {
    #[error("no API key provided")]
    MissingCredential,

    #[error("weather service unavailable: {0}")]
    Unavailable(String),

    #[error("weather service returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("weather service returned no temperature: {0}")]
    NoData(String),
}

pub struct WeatherClient {
    client: reqwest::blocking::Client,
    base_url: String,
    units: String,
}

impl WeatherClient {
    pub fn new(cfg: &WeatherConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            units: cfg.units.clone(),
        })
    }

    /// Fetch the current temperature of a city.
    pub fn current_temperature(&self, city: &str, api_key: &str) -> Result<f64, WeatherError> {
        if api_key.trim().is_empty() {
            return Err(WeatherError::MissingCredential);
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", city), ("appid", api_key), ("units", self.units.as_str())])
            .header("Accept", "application/json")
            .send()
            .map_err(|e| WeatherError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| WeatherError::Unavailable(e.to_string()))?;

        if status != reqwest::StatusCode::OK {
            return Err(WeatherError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        parse_current_temperature(&body)
    }
}

/// Extract `main.temp` from a current-weather response body.
pub fn parse_current_temperature(body: &str) -> Result<f64, WeatherError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|_| WeatherError::NoData(body.to_string()))?;
    value
        .get("main")
        .and_then(|main| main.get("temp"))
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| WeatherError::NoData(body.to_string()))
}
