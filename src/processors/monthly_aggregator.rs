use crate::error::{ProcessingError, Result};
use crate::models::{Dataset, MonthKey, MonthlyBucket, NumericRecord};
use std::collections::BTreeMap;

/// Per-station means for each (year, month) present in the data, in
/// ascending key order. Months with no records produce no bucket.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonthlyAggregator;

impl MonthlyAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(&self, dataset: &Dataset) -> Result<Vec<MonthlyBucket>> {
        self.aggregate_records(dataset.records())
    }

    /// Fails with `EmptyDataset` when there are no records.
    pub fn aggregate_records(&self, records: &[NumericRecord]) -> Result<Vec<MonthlyBucket>> {
        let width = match records.first() {
            Some(first) => first.stations().len(),
            None => return Err(ProcessingError::EmptyDataset),
        };

        let mut groups: BTreeMap<MonthKey, MonthAccumulator> = BTreeMap::new();
        for record in records {
            let stations = record.stations();
            if stations.len() != width {
                return Err(ProcessingError::InvalidRecord(format!(
                    "{}-{} has {} station values, expected {}",
                    record.year(),
                    record.month(),
                    stations.len(),
                    width
                )));
            }

            groups
                .entry(record.month_key())
                .or_insert_with(|| MonthAccumulator::new(width))
                .add(stations);
        }

        Ok(groups
            .into_iter()
            .map(|(key, acc)| MonthlyBucket {
                key,
                averages: acc.means(),
            })
            .collect())
    }
}

/// Station readings collected for one month.
struct MonthAccumulator {
    columns: Vec<Vec<f64>>,
}

impl MonthAccumulator {
    fn new(width: usize) -> Self {
        Self {
            columns: vec![Vec::new(); width],
        }
    }

    fn add(&mut self, stations: &[f64]) {
        for (column, value) in self.columns.iter_mut().zip(stations) {
            column.push(*value);
        }
    }

    // Values are summed in sorted order so the mean does not depend on
    // the order rows arrived in.
    fn means(mut self) -> Vec<f64> {
        self.columns
            .iter_mut()
            .map(|column| {
                column.sort_by(f64::total_cmp);
                column.iter().sum::<f64>() / column.len() as f64
            })
            .collect()
    }
}
