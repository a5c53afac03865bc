use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::error::{ProcessingError, Result};
use crate::models::CleaningStats;

/// Grouping key for monthly buckets. Year and month are the literal values
/// from the source, not validated calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i64,
    pub month: i64,
}

impl MonthKey {
    pub fn new(year: i64, month: i64) -> Self {
        Self { year, month }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBand {
    Heavy,
    Medium,
    Light,
    Good,
}

impl SeverityBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityBand::Heavy => "heavy",
            SeverityBand::Medium => "medium",
            SeverityBand::Light => "light",
            SeverityBand::Good => "good",
        }
    }

    fn index(&self) -> usize {
        match self {
            SeverityBand::Heavy => 0,
            SeverityBand::Medium => 1,
            SeverityBand::Light => 2,
            SeverityBand::Good => 3,
        }
    }
}

impl fmt::Display for SeverityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-band hour counts, accumulated before the fractions are taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandCounts {
    counts: [usize; 4],
}

impl BandCounts {
    pub fn add(&mut self, band: SeverityBand) {
        self.counts[band.index()] += 1;
    }

    pub fn get(&self, band: SeverityBand) -> usize {
        self.counts[band.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Fraction of hours in each severity band for one city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub heavy: f64,
    pub medium: f64,
    pub light: f64,
    pub good: f64,
    pub total_hours: usize,
}

impl SeveritySummary {
    /// Fails with `EmptyDataset` when no hours were counted.
    pub fn from_counts(counts: &BandCounts) -> Result<Self> {
        let total = counts.total();
        if total == 0 {
            return Err(ProcessingError::EmptyDataset);
        }

        let fraction = |band| counts.get(band) as f64 / total as f64;
        Ok(Self {
            heavy: fraction(SeverityBand::Heavy),
            medium: fraction(SeverityBand::Medium),
            light: fraction(SeverityBand::Light),
            good: fraction(SeverityBand::Good),
            total_hours: total,
        })
    }

    pub fn fraction(&self, band: SeverityBand) -> f64 {
        match band {
            SeverityBand::Heavy => self.heavy,
            SeverityBand::Medium => self.medium,
            SeverityBand::Light => self.light,
            SeverityBand::Good => self.good,
        }
    }

    /// Fractions in (heavy, medium, light, good) order.
    pub fn fractions(&self) -> [f64; 4] {
        [self.heavy, self.medium, self.light, self.good]
    }
}

/// Per-station means for one (year, month) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    pub key: MonthKey,
    pub averages: Vec<f64>,
}

impl MonthlyBucket {
    pub fn year(&self) -> i64 {
        self.key.year
    }

    pub fn month(&self) -> i64 {
        self.key.month
    }
}

/// Everything produced for one city in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct CityResult {
    pub city: String,
    pub station_names: Vec<String>,
    pub stats: CleaningStats,
    pub severity: SeveritySummary,
    pub monthly: Vec<MonthlyBucket>,
}

/// Cross-city severity line kept after a city's result has been emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitySummary {
    pub city: String,
    pub stats: CleaningStats,
    pub severity: SeveritySummary,
}

#[derive(Debug, Serialize)]
pub struct CityFailure {
    pub city: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: ProcessingError,
}

fn serialize_display<S: Serializer>(
    error: &ProcessingError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Cross-city outcome of a pipeline run, in configuration order.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub cities: Vec<CitySummary>,
    pub failures: Vec<CityFailure>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            cities: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn push_city(&mut self, result: &CityResult) {
        self.cities.push(CitySummary {
            city: result.city.clone(),
            stats: result.stats,
            severity: result.severity,
        });
    }

    pub fn push_failure(&mut self, error: ProcessingError) {
        let city = error.city().unwrap_or("unknown").to_string();
        self.failures.push(CityFailure { city, error });
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Generate a console summary
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Pollution Severity Report ===\n");
        summary.push_str(&format!(
            "{:<12} {:>10} {:>8} {:>8} {:>8} {:>8} {:>8}\n",
            "City", "Valid rows", "Valid %", "Heavy", "Medium", "Light", "Good"
        ));

        for city in &self.cities {
            summary.push_str(&format!(
                "{:<12} {:>10} {:>7.1}% {:>7.1}% {:>7.1}% {:>7.1}% {:>7.1}%\n",
                city.city,
                city.stats.valid_rows,
                city.stats.valid_percentage(),
                100.0 * city.severity.heavy,
                100.0 * city.severity.medium,
                100.0 * city.severity.light,
                100.0 * city.severity.good,
            ));
        }

        if !self.failures.is_empty() {
            summary.push_str(&format!("\nFailed Cities: {}\n", self.failures.len()));
            for failure in &self.failures {
                summary.push_str(&format!("  {}: {}\n", failure.city, failure.error));
            }
        }

        summary
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
