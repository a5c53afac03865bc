use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ProcessingError, Result};
use crate::models::MonthKey;

/// One source row as read from the tabular source: column name to raw text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawRow
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A cleaned row: year, month, any further common columns, then one value
/// per station. Every value is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericRecord {
    values: Vec<f64>,
    station_offset: usize,
}

impl NumericRecord {
    /// Build a record with exactly `[year, month]` as the common columns.
    pub fn new(year: i64, month: i64, stations: &[f64]) -> Result<Self> {
        let mut values = Vec::with_capacity(stations.len() + 2);
        values.push(year as f64);
        values.push(month as f64);
        values.extend_from_slice(stations);
        Self::from_values(values, 2)
    }

    /// Build a record from values laid out as common columns followed by
    /// station columns, where the first two common columns are year and month.
    pub fn from_values(values: Vec<f64>, station_offset: usize) -> Result<Self> {
        if station_offset < 2 {
            return Err(ProcessingError::InvalidRecord(format!(
                "expected at least year and month before station values, got {} common columns",
                station_offset
            )));
        }

        if values.len() <= station_offset {
            return Err(ProcessingError::InvalidRecord(format!(
                "record has {} values but no station columns after offset {}",
                values.len(),
                station_offset
            )));
        }

        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ProcessingError::InvalidRecord(format!(
                "non-finite value {} at position {}",
                values[pos], pos
            )));
        }

        if values[0].fract() != 0.0 || values[1].fract() != 0.0 {
            return Err(ProcessingError::InvalidRecord(format!(
                "year/month must be whole numbers, got {} and {}",
                values[0], values[1]
            )));
        }

        Ok(Self {
            values,
            station_offset,
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn year(&self) -> i64 {
        self.values[0] as i64
    }

    pub fn month(&self) -> i64 {
        self.values[1] as i64
    }

    pub fn month_key(&self) -> MonthKey {
        MonthKey::new(self.year(), self.month())
    }

    pub fn stations(&self) -> &[f64] {
        &self.values[self.station_offset..]
    }

    /// Mean of the station readings, excluding year/month.
    pub fn station_average(&self) -> f64 {
        let stations = self.stations();
        stations.iter().sum::<f64>() / stations.len() as f64
    }
}

/// Row counts from one cleaning pass over a city's source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub missing_value_rows: usize,
    pub malformed_rows: usize,
}

impl CleaningStats {
    pub fn rejected_rows(&self) -> usize {
        self.missing_value_rows + self.malformed_rows
    }

    pub fn valid_percentage(&self) -> f64 {
        if self.total_rows == 0 {
            return 0.0;
        }
        100.0 * self.valid_rows as f64 / self.total_rows as f64
    }
}

/// All complete records for one city.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    station_names: Vec<String>,
    records: Vec<NumericRecord>,
    stats: CleaningStats,
}

impl Dataset {
    pub fn new(station_names: Vec<String>) -> Self {
        Self {
            station_names,
            records: Vec::new(),
            stats: CleaningStats::default(),
        }
    }

    /// Build a dataset from already-clean records, checking that every record
    /// carries one value per station.
    pub fn from_records(station_names: Vec<String>, records: Vec<NumericRecord>) -> Result<Self> {
        let mut dataset = Self::new(station_names);
        for record in records {
            dataset.push(record)?;
        }
        Ok(dataset)
    }

    pub fn push(&mut self, record: NumericRecord) -> Result<()> {
        if record.stations().len() != self.station_names.len() {
            return Err(ProcessingError::InvalidRecord(format!(
                "record has {} station values, dataset expects {}",
                record.stations().len(),
                self.station_names.len()
            )));
        }

        self.stats.total_rows += 1;
        self.stats.valid_rows += 1;
        self.records.push(record);
        Ok(())
    }

    pub(crate) fn record_missing(&mut self) {
        self.stats.total_rows += 1;
        self.stats.missing_value_rows += 1;
    }

    pub(crate) fn record_malformed(&mut self) {
        self.stats.total_rows += 1;
        self.stats.malformed_rows += 1;
    }

    pub fn station_names(&self) -> &[String] {
        &self.station_names
    }

    pub fn records(&self) -> &[NumericRecord] {
        &self.records
    }

    pub fn stats(&self) -> CleaningStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accessors() {
        let record = NumericRecord::new(2010, 1, &[10.0, 20.0]).unwrap();

        assert_eq!(record.year(), 2010);
        assert_eq!(record.month(), 1);
        assert_eq!(record.stations(), &[10.0, 20.0]);
        assert_eq!(record.values().len(), 4);
        assert_eq!(record.station_average(), 15.0);
    }

    #[test]
    fn test_station_offset_skips_extra_common_columns() {
        // year, month, day, hour, then two stations
        let record =
            NumericRecord::from_values(vec![2012.0, 6.0, 3.0, 14.0, 40.0, 60.0], 4).unwrap();

        assert_eq!(record.stations(), &[40.0, 60.0]);
        assert_eq!(record.station_average(), 50.0);
        assert_eq!(record.month_key(), MonthKey::new(2012, 6));
    }

    #[test]
    fn test_record_rejects_nan() {
        let result = NumericRecord::new(2010, 1, &[10.0, f64::NAN]);
        assert!(matches!(result, Err(ProcessingError::InvalidRecord(_))));
    }

    #[test]
    fn test_record_requires_station_columns() {
        assert!(NumericRecord::from_values(vec![2010.0, 1.0], 2).is_err());
        assert!(NumericRecord::from_values(vec![2010.0, 1.0, 5.0], 1).is_err());
    }

    #[test]
    fn test_record_rejects_fractional_month() {
        assert!(NumericRecord::from_values(vec![2010.0, 1.5, 5.0], 2).is_err());
    }

    #[test]
    fn test_dataset_enforces_width() {
        let mut dataset = Dataset::new(vec!["A".to_string(), "B".to_string()]);

        assert!(dataset
            .push(NumericRecord::new(2010, 1, &[1.0, 2.0]).unwrap())
            .is_ok());
        assert!(dataset
            .push(NumericRecord::new(2010, 1, &[1.0]).unwrap())
            .is_err());

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.stats().valid_rows, 1);
    }

    #[test]
    fn test_cleaning_stats() {
        let mut dataset = Dataset::new(vec!["A".to_string()]);
        dataset
            .push(NumericRecord::new(2010, 1, &[1.0]).unwrap())
            .unwrap();
        dataset.record_missing();
        dataset.record_missing();
        dataset.record_malformed();

        let stats = dataset.stats();
        assert_eq!(stats.total_rows, 4);
        assert_eq!(stats.rejected_rows(), 3);
        assert_eq!(stats.valid_percentage(), 25.0);
    }

    #[test]
    fn test_raw_row_from_pairs() {
        let row: RawRow = [("year", "2010"), ("PM_Dongsi", "NA")].into_iter().collect();

        assert_eq!(row.get("year"), Some("2010"));
        assert_eq!(row.get("PM_Dongsi"), Some("NA"));
        assert_eq!(row.get("month"), None);
        assert_eq!(row.len(), 2);
    }
}
