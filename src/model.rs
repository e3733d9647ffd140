//! Temperature data types.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Meteorological season of the northern-hemisphere calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

/// Season of each calendar month, January first.
const MONTH_SEASONS: [Season; 12] = [
    Season::Winter,
    Season::Winter,
    Season::Spring,
    Season::Spring,
    Season::Spring,
    Season::Summer,
    Season::Summer,
    Season::Summer,
    Season::Autumn,
    Season::Autumn,
    Season::Autumn,
    Season::Winter,
];

impl Season {
    /// Map a calendar month (1-12) to its season.
    pub fn from_month(month: u32) -> Option<Self> {
        let idx = month.checked_sub(1)?;
        MONTH_SEASONS.get(idx as usize).copied()
    }

    /// Season containing the given date.
    pub fn of_date(date: NaiveDate) -> Self {
        // month0 is always in 0..12
        MONTH_SEASONS[date.month0() as usize]
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
        };
        f.write_str(name)
    }
}

/// Daily temperature reading for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub city: String,
    pub timestamp: NaiveDate,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
}

impl Observation {
    pub fn new(city: impl Into<String>, timestamp: NaiveDate, temperature: f64) -> Self {
        Self {
            city: city.into(),
            timestamp,
            temperature,
        }
    }
}

/// Observation augmented with rolling and seasonal statistics.
///
/// Undefined statistics are `None` (serialized as `null`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedObservation {
    pub city: String,
    pub timestamp: NaiveDate,
    pub temperature: f64,
    pub season: Season,

    /// Trailing mean over the city's last 30 observations.
    pub moving_average: Option<f64>,

    /// Mean over all observations of the same city and season.
    pub seasonal_mean: f64,
    /// Sample standard deviation over the same group (undefined for a single row).
    pub seasonal_std: Option<f64>,

    /// Upper bound of the band centered on `moving_average`.
    pub ci_up: Option<f64>,
    /// Lower bound of the band centered on `moving_average`.
    pub ci_down: Option<f64>,

    /// Temperature lies outside the interval centered on `seasonal_mean`.
    pub is_outlier: bool,
}
