use crate::anomaly::{self, Baseline, Verdict};
use crate::cache::EnrichmentCache;
use crate::config::Config;
use crate::data::{Dataset, content_digest};
use crate::engine::{self, Description};
use crate::model::{EnrichedObservation, Season};
use crate::utils::{check_num, slug};
use crate::weather::WeatherClient;
use anyhow::{Context, Result, anyhow, bail};
use chrono::{Datelike, NaiveDate};
use glob::glob;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    thread,
};

/// Trend window requested for an analysis report.
#[derive(Debug, Clone, Copy)]
pub struct TrendWindow {
    pub start: Option<NaiveDate>,
    pub days: i64,
}

/// Source of the live temperature for an anomaly check.
#[derive(Debug, Clone)]
pub enum LiveSource {
    /// Reading supplied directly.
    Reading(f64),
    /// Reading fetched from the weather service with the given key.
    Fetch(Option<String>),
}

#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub city: &'a str,
    pub description: Description,
    pub seasons: BTreeMap<Season, f64>,
    pub rows: Vec<&'a EnrichedObservation>,
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub city: String,
    pub season: Season,
    pub baseline: Option<Baseline>,
    /// Typical range `(down, up)` for the season.
    pub interval: Option<(f64, f64)>,
    pub temperature: Option<f64>,
    pub verdict: Option<Verdict>,
    /// Reason the reading could not be obtained or classified.
    pub error: Option<String>,
}

pub struct Manager {
    work_dir: PathBuf,
    cfg: Config,
    cache: EnrichmentCache,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Result<Self> {
        let work_dir = work_dir.as_ref().to_path_buf();

        let cfg_file = work_dir.join("config.toml");
        let cfg = if cfg_file.is_file() {
            Config::from_file(&cfg_file).context("failed to construct cfg")?
        } else {
            log::info!("{cfg_file:?} not found, using defaults");
            Config::default()
        };
        log::info!("{cfg:#?}");

        let cache = EnrichmentCache::new(work_dir.join("cache"));

        Ok(Self {
            work_dir,
            cfg,
            cache,
        })
    }

    pub fn list_cities(&self) -> Result<Vec<String>> {
        let dataset = self.load_dataset()?;
        Ok(engine::cities(&dataset.observations))
    }

    /// Enrich the history of one city and write a report for presentation.
    pub fn analyze_city(&self, city: &str, trend: Option<TrendWindow>) -> Result<String> {
        let dataset = self.load_dataset()?;
        let enriched = self.enrich_city(&dataset, city)?;

        let rows = match trend {
            None => enriched.iter().collect(),
            Some(TrendWindow { start, days }) => {
                check_num(days, 50..=365).context("invalid number of days")?;
                let start = match start {
                    Some(start) => start,
                    None => engine::default_window_start(&enriched, days)
                        .context("no observations to window")?,
                };
                log::info!("trend window starts {start} and spans {days} days");
                engine::window(&enriched, start, days)
            }
        };

        let report = AnalysisReport {
            city,
            description: engine::describe(&enriched),
            seasons: engine::summarize_by_season(&enriched, city),
            rows,
        };

        let file = self.results_file(city);
        let writer = BufWriter::new(
            File::create(&file).with_context(|| format!("failed to create {file:?}"))?,
        );
        serde_json::to_writer_pretty(writer, &report).context("failed to write results")?;
        log::info!("saved {file:?}");

        serde_json::to_string_pretty(&report).context("failed to serialize report")
    }

    /// Compare a live temperature against the city's seasonal baseline.
    ///
    /// Failing to obtain the live reading is reported, not returned as an error.
    pub fn check_city(&self, city: &str, month: u32, source: LiveSource) -> Result<CheckReport> {
        let season = Season::from_month(month).with_context(|| format!("invalid month {month}"))?;

        let (reading, fetch) = match source {
            LiveSource::Reading(temp) => (Some(temp), None),
            LiveSource::Fetch(api_key) => {
                let api_key = api_key
                    .or_else(|| std::env::var(&self.cfg.weather.api_key_env).ok())
                    .unwrap_or_default();
                let client =
                    WeatherClient::new(&self.cfg.weather).context("failed to construct client")?;
                let city = city.to_string();
                let handle = thread::spawn(move || client.current_temperature(&city, &api_key));
                (None, Some(handle))
            }
        };

        let dataset = self.load_dataset()?;
        let enriched = self.enrich_city(&dataset, city)?;

        let mut report = CheckReport {
            city: city.to_string(),
            season,
            baseline: None,
            interval: None,
            temperature: None,
            verdict: None,
            error: None,
        };

        let live = match (reading, fetch) {
            (Some(temp), _) => Ok(temp),
            (None, Some(handle)) => handle
                .join()
                .map_err(|_| anyhow!("weather request thread panicked"))?
                .map_err(|error| error.to_string()),
            (None, None) => bail!("no source for the live reading"),
        };

        let base = match anomaly::baseline(&enriched, city, season) {
            Ok(base) => base,
            Err(error) => {
                log::error!("{error}");
                report.temperature = live.ok();
                report.error = Some(error.to_string());
                return Ok(report);
            }
        };
        report.baseline = Some(base);
        report.interval = base.interval();

        match live {
            Ok(temp) => {
                report.temperature = Some(temp);
                match anomaly::classify(&base, temp) {
                    Ok(verdict) => report.verdict = Some(verdict),
                    Err(error) => {
                        log::warn!("{error}");
                        report.error = Some(error.to_string());
                    }
                }
            }
            Err(message) => {
                log::error!("live reading unavailable: {message}");
                report.error = Some(message);
            }
        }

        Ok(report)
    }

    /// Remove cached series and result files.
    pub fn clean(&self) -> Result<()> {
        let n_entries = self.cache.clear().context("failed to clear cache")?;
        log::info!("removed {n_entries} cache entries");

        let pattern = self.work_dir.join("results-*.json");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        for file in glob(pattern)
            .context("failed to glob results files")?
            .filter_map(Result::ok)
        {
            fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
            log::info!("removed {file:?}");
        }

        Ok(())
    }

    fn load_dataset(&self) -> Result<Dataset> {
        let file = self.work_dir.join(&self.cfg.data.file);
        let dataset = Dataset::from_file(&file).context("failed to load dataset")?;
        log::info!(
            "loaded {} observations from {file:?}",
            dataset.observations.len()
        );
        Ok(dataset)
    }

    fn enrich_city(&self, dataset: &Dataset, city: &str) -> Result<Vec<EnrichedObservation>> {
        let series = engine::city_series(&dataset.observations, city);
        if series.is_empty() {
            bail!("no observations for city {city:?}");
        }
        self.cache
            .get_or_compute(dataset, city, || engine::enrich(&series))
    }

    fn results_file(&self, city: &str) -> PathBuf {
        self.work_dir.join(format!(
            "results-{}-{}.json",
            slug(city),
            &content_digest(city)[..8]
        ))
    }
}

/// Current calendar month in local time.
pub fn current_month() -> u32 {
    chrono::Local::now().month()
}
