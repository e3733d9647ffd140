use crate::model::Observation;
use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use sha2::{Digest, Sha256};
use std::{fs, path::Path};

const REQUIRED_COLUMNS: [&str; 3] = ["city", "timestamp", "temperature"];

/// Historical observations loaded from a CSV file.
///
/// The digest identifies the raw file content and keys cached results.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub digest: String,
    pub observations: Vec<Observation>,
}

impl Dataset {
    /// Load a [`Dataset`] from a CSV file with a header line.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, a required column is
    /// missing, or any row cannot be parsed.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let text = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::parse(&text).with_context(|| format!("failed to parse {file:?}"))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().enumerate();

        let (_, header) = lines.next().context("input is empty")?;
        let header: Vec<&str> = header
            .trim_start_matches('\u{feff}')
            .split(',')
            .map(str::trim)
            .collect();
        let mut col_idxs = [0; REQUIRED_COLUMNS.len()];
        for (col_idx, name) in col_idxs.iter_mut().zip(REQUIRED_COLUMNS) {
            *col_idx = header
                .iter()
                .position(|&col| col == name)
                .with_context(|| format!("missing required column {name:?}"))?;
        }
        let [city_idx, timestamp_idx, temperature_idx] = col_idxs;

        let mut observations = Vec::new();
        for (line_idx, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let line_num = line_idx + 1;
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != header.len() {
                bail!(
                    "line {line_num}: expected {} fields, found {}",
                    header.len(),
                    fields.len()
                );
            }

            let city = fields[city_idx];
            if city.is_empty() {
                bail!("line {line_num}: empty city");
            }
            let timestamp = parse_date(fields[timestamp_idx])
                .with_context(|| format!("line {line_num}: invalid timestamp"))?;
            let temperature: f64 = fields[temperature_idx]
                .parse()
                .with_context(|| format!("line {line_num}: invalid temperature"))?;
            if !temperature.is_finite() {
                bail!("line {line_num}: non-finite temperature");
            }

            observations.push(Observation::new(city, timestamp, temperature));
        }

        Ok(Self {
            digest: content_digest(text),
            observations,
        })
    }
}

/// Hex-encoded SHA-256 of the given content.
pub fn content_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Parse a day from `YYYY-MM-DD`, ignoring an optional time of day.
fn parse_date(field: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(field, "%Y-%m-%d") {
        return Ok(date);
    }
    let date_time = NaiveDateTime::parse_from_str(field, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(field, "%Y-%m-%dT%H:%M:%S"))
        .with_context(|| format!("{field:?} is not a date"))?;
    Ok(date_time.date())
}
