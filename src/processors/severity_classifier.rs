use crate::error::Result;
use crate::models::{BandCounts, Dataset, NumericRecord, SeverityBand, SeveritySummary};
use crate::utils::constants::{HEAVY_THRESHOLD, LIGHT_THRESHOLD, MEDIUM_THRESHOLD};

/// Buckets each hour's station-average into a severity band.
///
/// | Band   | Station-average     |
/// |--------|---------------------|
/// | heavy  | > 150               |
/// | medium | > 75 and <= 150     |
/// | light  | > 35 and <= 75      |
/// | good   | <= 35               |
#[derive(Debug, Clone, Copy)]
pub struct SeverityClassifier {
    heavy_threshold: f64,
    medium_threshold: f64,
    light_threshold: f64,
}

impl SeverityClassifier {
    pub fn new() -> Self {
        Self {
            heavy_threshold: HEAVY_THRESHOLD,
            medium_threshold: MEDIUM_THRESHOLD,
            light_threshold: LIGHT_THRESHOLD,
        }
    }

    /// First matching band wins; each threshold belongs to the band below it.
    pub fn band_for(&self, station_average: f64) -> SeverityBand {
        if station_average > self.heavy_threshold {
            SeverityBand::Heavy
        } else if station_average > self.medium_threshold {
            SeverityBand::Medium
        } else if station_average > self.light_threshold {
            SeverityBand::Light
        } else {
            SeverityBand::Good
        }
    }

    pub fn classify(&self, dataset: &Dataset) -> Result<SeveritySummary> {
        self.classify_records(dataset.records())
    }

    /// Fails with `EmptyDataset` when there are no records.
    pub fn classify_records(&self, records: &[NumericRecord]) -> Result<SeveritySummary> {
        let mut counts = BandCounts::default();
        for record in records {
            counts.add(self.band_for(record.station_average()));
        }
        SeveritySummary::from_counts(&counts)
    }
}

impl Default for SeverityClassifier {
    fn default() -> Self {
        Self::new()
    }
}
