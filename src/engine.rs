use crate::model::{EnrichedObservation, Observation, Season};
use crate::stats::{Accumulator, AccumulatorReport, quantile, rolling_mean};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Number of observations in the trailing moving average.
pub const ROLLING_WINDOW: usize = 30;

/// Half-width of the 95% interval in units of standard deviation.
pub const CI_MULTIPLIER: f64 = 1.96;

/// Enrich a series with rolling averages, seasonal baselines and outlier flags.
///
/// The series may hold several cities. Rolling windows and seasonal aggregates
/// are computed per city, each city's rows ordered by timestamp first. The
/// output has one row per input row, in input order.
pub fn enrich(series: &[Observation]) -> Vec<EnrichedObservation> {
    let mut moving_avgs = vec![None; series.len()];
    for idxs in partition_by_city(series).into_values() {
        let temps: Vec<f64> = idxs.iter().map(|&idx| series[idx].temperature).collect();
        for (idx, avg) in idxs.into_iter().zip(rolling_mean(&temps, ROLLING_WINDOW)) {
            moving_avgs[idx] = avg;
        }
    }

    let baselines = seasonal_baselines(series);

    series
        .iter()
        .zip(moving_avgs)
        .map(|(obs, moving_average)| {
            let season = Season::of_date(obs.timestamp);
            let baseline = &baselines[&(obs.city.as_str(), season)];
            let seasonal_mean = baseline.mean;
            let seasonal_std = baseline.std_dev;

            let half_width = seasonal_std.map(|std| CI_MULTIPLIER * std);
            let ci_up = moving_average.zip(half_width).map(|(avg, hw)| avg + hw);
            let ci_down = moving_average.zip(half_width).map(|(avg, hw)| avg - hw);

            let is_outlier =
                half_width.is_some_and(|hw| outside_band(obs.temperature, seasonal_mean, hw));

            EnrichedObservation {
                city: obs.city.clone(),
                timestamp: obs.timestamp,
                temperature: obs.temperature,
                season,
                moving_average,
                seasonal_mean,
                seasonal_std,
                ci_up,
                ci_down,
                is_outlier,
            }
        })
        .collect()
}

/// Value lies strictly outside `[center - half_width, center + half_width]`.
pub fn outside_band(value: f64, center: f64, half_width: f64) -> bool {
    value < center - half_width || value > center + half_width
}

/// Row indices of each city, sorted by timestamp (stable for equal dates).
fn partition_by_city(series: &[Observation]) -> HashMap<&str, Vec<usize>> {
    let mut partitions: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, obs) in series.iter().enumerate() {
        partitions.entry(obs.city.as_str()).or_default().push(idx);
    }
    for idxs in partitions.values_mut() {
        idxs.sort_by_key(|&idx| series[idx].timestamp);
    }
    partitions
}

fn seasonal_baselines(series: &[Observation]) -> HashMap<(&str, Season), AccumulatorReport> {
    let mut acc_map: HashMap<(&str, Season), Accumulator> = HashMap::new();
    for obs in series {
        acc_map
            .entry((obs.city.as_str(), Season::of_date(obs.timestamp)))
            .or_default()
            .add(obs.temperature);
    }
    acc_map
        .into_iter()
        .map(|(key, acc)| (key, acc.report()))
        .collect()
}

/// Typical temperature per season for one city.
///
/// Seasons without observations are absent.
pub fn summarize_by_season(enriched: &[EnrichedObservation], city: &str) -> BTreeMap<Season, f64> {
    let mut summary: BTreeMap<Season, f64> = BTreeMap::new();
    for obs in enriched.iter().filter(|obs| obs.city == city) {
        summary
            .entry(obs.season)
            .and_modify(|max| *max = max.max(obs.seasonal_mean))
            .or_insert(obs.seasonal_mean);
    }
    summary
}

/// Sorted unique city names.
pub fn cities(series: &[Observation]) -> Vec<String> {
    let names: BTreeSet<&str> = series.iter().map(|obs| obs.city.as_str()).collect();
    names.into_iter().map(String::from).collect()
}

/// Observations of one city, in input order.
pub fn city_series(series: &[Observation], city: &str) -> Vec<Observation> {
    series.iter().filter(|obs| obs.city == city).cloned().collect()
}

/// Rows with `start <= timestamp <= start + days`.
pub fn window(
    enriched: &[EnrichedObservation],
    start: NaiveDate,
    days: i64,
) -> Vec<&EnrichedObservation> {
    let stop = start + Duration::days(days);
    enriched
        .iter()
        .filter(|obs| obs.timestamp >= start && obs.timestamp <= stop)
        .collect()
}

/// Start of the window ending at the latest observation.
pub fn default_window_start(enriched: &[EnrichedObservation], days: i64) -> Option<NaiveDate> {
    enriched
        .iter()
        .map(|obs| obs.timestamp)
        .max()
        .map(|latest| latest - Duration::days(days))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Description {
    pub temperature: TemperatureSummary,
    pub timestamp: TimestampSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub q50: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimestampSummary {
    pub count: usize,
    pub mean: Option<NaiveDateTime>,
    pub min: Option<NaiveDateTime>,
    #[serde(rename = "25%")]
    pub q25: Option<NaiveDateTime>,
    #[serde(rename = "50%")]
    pub q50: Option<NaiveDateTime>,
    #[serde(rename = "75%")]
    pub q75: Option<NaiveDateTime>,
    pub max: Option<NaiveDateTime>,
}

/// Descriptive statistics over temperature and timestamp.
pub fn describe(enriched: &[EnrichedObservation]) -> Description {
    let mut temps: Vec<f64> = enriched.iter().map(|obs| obs.temperature).collect();
    temps.sort_by(f64::total_cmp);

    let mut acc = Accumulator::new();
    temps.iter().for_each(|&val| acc.add(val));
    let report = acc.report();
    let count = temps.len();

    let temperature = TemperatureSummary {
        count,
        mean: (count > 0).then_some(report.mean),
        std: report.std_dev,
        min: temps.first().copied(),
        q25: quantile(&temps, 0.25),
        q50: quantile(&temps, 0.5),
        q75: quantile(&temps, 0.75),
        max: temps.last().copied(),
    };

    let mut days: Vec<f64> = enriched
        .iter()
        .map(|obs| f64::from(obs.timestamp.num_days_from_ce()))
        .collect();
    days.sort_by(f64::total_cmp);
    let mean_day = (count > 0).then(|| days.iter().sum::<f64>() / count as f64);

    let timestamp = TimestampSummary {
        count,
        mean: mean_day.and_then(day_to_datetime),
        min: days.first().copied().and_then(day_to_datetime),
        q25: quantile(&days, 0.25).and_then(day_to_datetime),
        q50: quantile(&days, 0.5).and_then(day_to_datetime),
        q75: quantile(&days, 0.75).and_then(day_to_datetime),
        max: days.last().copied().and_then(day_to_datetime),
    };

    Description {
        temperature,
        timestamp,
    }
}

/// Convert a fractional day count (days from CE) to a date-time.
fn day_to_datetime(day: f64) -> Option<NaiveDateTime> {
    let whole = day.floor();
    let date = NaiveDate::from_num_days_from_ce_opt(whole as i32)?;
    let secs = ((day - whole) * 86_400.0).round() as i64;
    Some(date.and_hms_opt(0, 0, 0)? + Duration::seconds(secs))
}
