use crate::engine::{CI_MULTIPLIER, outside_band};
use crate::model::{EnrichedObservation, Season};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AnomalyError {
    #[error("no historical baseline for {city} in {season}")]
    NoBaseline { city: String, season: Season },

    #[error("baseline for {season} has a single observation, no interval available")]
    NoInterval { season: Season },

    #[error("cannot classify a non-finite value against the {season} baseline")]
    NonFinite { season: Season },
}

/// Long-run temperature statistics for one city and season.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baseline {
    pub season: Season,
    pub mean: f64,
    pub std: Option<f64>,
}

impl Baseline {
    /// Interval `(down, up)` of typical temperatures, if the spread is defined.
    pub fn interval(&self) -> Option<(f64, f64)> {
        self.std.map(|std| {
            let half_width = CI_MULTIPLIER * std;
            (self.mean - half_width, self.mean + half_width)
        })
    }
}

/// Classification of a live reading against its seasonal baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    pub season: Season,
    pub observed: f64,
    pub down: f64,
    pub up: f64,
    pub anomalous: bool,
}

/// Look up the seasonal baseline of a city in an enriched series.
pub fn baseline(
    enriched: &[EnrichedObservation],
    city: &str,
    season: Season,
) -> Result<Baseline, AnomalyError> {
    enriched
        .iter()
        .find(|obs| obs.city == city && obs.season == season)
        .map(|obs| Baseline {
            season,
            mean: obs.seasonal_mean,
            std: obs.seasonal_std,
        })
        .ok_or_else(|| AnomalyError::NoBaseline {
            city: city.to_string(),
            season,
        })
}

/// Classify `observed` as anomalous when it lies strictly outside the interval.
///
/// A NaN or infinite reading or baseline is an error, never a verdict.
pub fn classify(baseline: &Baseline, observed: f64) -> Result<Verdict, AnomalyError> {
    let season = baseline.season;
    let std = baseline.std.ok_or(AnomalyError::NoInterval { season })?;
    if !(observed.is_finite() && baseline.mean.is_finite() && std.is_finite()) {
        return Err(AnomalyError::NonFinite { season });
    }
    let half_width = CI_MULTIPLIER * std;
    Ok(Verdict {
        season,
        observed,
        down: baseline.mean - half_width,
        up: baseline.mean + half_width,
        anomalous: outside_band(observed, baseline.mean, half_width),
    })
}
