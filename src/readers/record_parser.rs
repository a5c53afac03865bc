use crate::config::{CityConfig, PipelineConfig};
use crate::error::{ProcessingError, Result};
use crate::models::{Dataset, NumericRecord, RawRow};
use crate::utils::constants::MISSING_VALUE_TOKEN;
use tracing::debug;

/// Why a row was left out of the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// A column held the missing-value token.
    MissingValue { column: String },
    /// A column held text that is neither a number nor the missing-value token.
    Malformed { column: String, value: String },
}

impl Rejection {
    pub fn column(&self) -> &str {
        match self {
            Rejection::MissingValue { column } | Rejection::Malformed { column, .. } => column,
        }
    }

    pub fn into_error(self) -> Option<ProcessingError> {
        match self {
            Rejection::MissingValue { .. } => None,
            Rejection::Malformed { column, value } => {
                Some(ProcessingError::MalformedValue { column, value })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Accepted(NumericRecord),
    Rejected(Rejection),
}

/// Turns raw rows into complete numeric records. Any missing or
/// unparseable value discards the whole row.
#[derive(Debug, Clone)]
pub struct RecordParser {
    columns: Vec<String>,
    station_offset: usize,
    missing_token: String,
}

impl RecordParser {
    pub fn new(common_columns: &[String], station_columns: &[String]) -> Result<Self> {
        if common_columns.len() < 2 {
            return Err(ProcessingError::InvalidConfig(format!(
                "expected year and month among the common columns, got {:?}",
                common_columns
            )));
        }

        if station_columns.is_empty() {
            return Err(ProcessingError::InvalidConfig(
                "at least one station column is required".to_string(),
            ));
        }

        Ok(Self {
            columns: common_columns
                .iter()
                .chain(station_columns)
                .cloned()
                .collect(),
            station_offset: common_columns.len(),
            missing_token: MISSING_VALUE_TOKEN.to_string(),
        })
    }

    pub fn for_city(config: &PipelineConfig, city: &CityConfig) -> Result<Self> {
        let parser = Self::new(
            &config.common_columns,
            &city.station_columns(&config.column_prefix),
        )?;
        Ok(parser.with_missing_token(&config.missing_token))
    }

    pub fn with_missing_token(mut self, token: &str) -> Self {
        self.missing_token = token.to_string();
        self
    }

    /// Columns extracted from each row, in record order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Parse one row. A requested column absent from the row is a schema
    /// error; bad values only reject the row.
    pub fn parse(&self, row: &RawRow) -> Result<ParseOutcome> {
        let mut values = Vec::with_capacity(self.columns.len());
        let mut rejection = None;

        // Every column is looked up even after a rejection so schema
        // problems surface on the first row.
        for (index, column) in self.columns.iter().enumerate() {
            let raw = row.get(column).ok_or_else(|| ProcessingError::Schema {
                column: column.clone(),
            })?;

            if rejection.is_some() {
                continue;
            }

            match self.parse_value(column, raw, index < 2) {
                Ok(value) => values.push(value),
                Err(reason) => rejection = Some(reason),
            }
        }

        match rejection {
            Some(reason) => Ok(ParseOutcome::Rejected(reason)),
            None => Ok(ParseOutcome::Accepted(NumericRecord::from_values(
                values,
                self.station_offset,
            )?)),
        }
    }

    fn parse_value(
        &self,
        column: &str,
        raw: &str,
        is_key: bool,
    ) -> std::result::Result<f64, Rejection> {
        let text = raw.trim();

        if text == self.missing_token {
            return Err(Rejection::MissingValue {
                column: column.to_string(),
            });
        }

        let malformed = || Rejection::Malformed {
            column: column.to_string(),
            value: raw.to_string(),
        };

        let value = text.parse::<f64>().map_err(|_| malformed())?;

        if value.is_nan() {
            return Err(Rejection::MissingValue {
                column: column.to_string(),
            });
        }

        if value.is_infinite() || (is_key && value.fract() != 0.0) {
            return Err(malformed());
        }

        Ok(value)
    }

    /// Clean every row from a source into a dataset. Read errors abort;
    /// rejected rows are counted and dropped.
    pub fn parse_all<I>(&self, station_names: Vec<String>, rows: I) -> Result<Dataset>
    where
        I: IntoIterator<Item = Result<RawRow>>,
    {
        let mut dataset = Dataset::new(station_names);
        let mut first_malformed = None;

        for row in rows {
            match self.parse(&row?)? {
                ParseOutcome::Accepted(record) => dataset.push(record)?,
                ParseOutcome::Rejected(Rejection::MissingValue { .. }) => dataset.record_missing(),
                ParseOutcome::Rejected(rejection) => {
                    dataset.record_malformed();
                    if first_malformed.is_none() {
                        first_malformed = rejection.into_error();
                    }
                }
            }
        }

        if let Some(err) = first_malformed {
            debug!(
                malformed = dataset.stats().malformed_rows,
                first = %err,
                "Dropped rows with malformed values"
            );
        }

        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn parser() -> RecordParser {
        RecordParser::new(&columns(&["year", "month"]), &columns(&["PM_A", "PM_B"])).unwrap()
    }

    fn row(values: [&str; 4]) -> RawRow {
        ["year", "month", "PM_A", "PM_B"]
            .into_iter()
            .zip(values)
            .collect()
    }

    #[test]
    fn test_parse_complete_row() {
        let outcome = parser().parse(&row(["2010", "1", "10", "20.5"])).unwrap();

        assert_eq!(
            outcome,
            ParseOutcome::Accepted(NumericRecord::new(2010, 1, &[10.0, 20.5]).unwrap())
        );
    }

    #[test]
    fn test_missing_token_rejects_whole_row() {
        let outcome = parser().parse(&row(["2010", "1", "NA", "30"])).unwrap();

        assert_eq!(
            outcome,
            ParseOutcome::Rejected(Rejection::MissingValue {
                column: "PM_A".to_string()
            })
        );
    }

    #[test]
    fn test_malformed_value_rejects_row() {
        let outcome = parser().parse(&row(["2010", "1", "12,5", "30"])).unwrap();

        match outcome {
            ParseOutcome::Rejected(rejection) => {
                assert_eq!(rejection.column(), "PM_A");
                assert!(matches!(
                    rejection.into_error(),
                    Some(ProcessingError::MalformedValue { .. })
                ));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_text_counts_as_missing() {
        let outcome = parser().parse(&row(["2010", "1", "nan", "30"])).unwrap();
        assert!(matches!(
            outcome,
            ParseOutcome::Rejected(Rejection::MissingValue { .. })
        ));
    }

    #[test]
    fn test_infinite_and_fractional_keys_are_malformed() {
        let p = parser();
        assert!(matches!(
            p.parse(&row(["2010", "1", "inf", "30"])).unwrap(),
            ParseOutcome::Rejected(Rejection::Malformed { .. })
        ));
        assert!(matches!(
            p.parse(&row(["2010", "1.5", "10", "30"])).unwrap(),
            ParseOutcome::Rejected(Rejection::Malformed { .. })
        ));
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let outcome = parser().parse(&row([" 2010", "1 ", " 10 ", "NA "])).unwrap();
        assert!(matches!(
            outcome,
            ParseOutcome::Rejected(Rejection::MissingValue { .. })
        ));
    }

    #[test]
    fn test_absent_column_is_schema_error() {
        let partial: RawRow = [("year", "2010"), ("month", "1"), ("PM_A", "NA")]
            .into_iter()
            .collect();

        let result = parser().parse(&partial);
        match result {
            Err(ProcessingError::Schema { column }) => assert_eq!(column, "PM_B"),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_missing_token() {
        let p = parser().with_missing_token("-");
        assert!(matches!(
            p.parse(&row(["2010", "1", "-", "30"])).unwrap(),
            ParseOutcome::Rejected(Rejection::MissingValue { .. })
        ));
        assert!(matches!(
            p.parse(&row(["2010", "1", "NA", "30"])).unwrap(),
            ParseOutcome::Rejected(Rejection::Malformed { .. })
        ));
    }

    #[test]
    fn test_parse_all_keeps_only_complete_rows() {
        let rows = vec![
            Ok(row(["2010", "1", "10", "20"])),
            Ok(row(["2010", "1", "NA", "30"])),
            Ok(row(["2010", "1", "x", "30"])),
            Ok(row(["2010", "2", "5", "7"])),
        ];

        let dataset = parser()
            .parse_all(columns(&["A", "B"]), rows)
            .unwrap();

        assert_eq!(dataset.len(), 2);
        assert!(dataset
            .records()
            .iter()
            .all(|r| r.values().iter().all(|v| v.is_finite())));

        let stats = dataset.stats();
        assert_eq!(stats.total_rows, 4);
        assert_eq!(stats.valid_rows, 2);
        assert_eq!(stats.missing_value_rows, 1);
        assert_eq!(stats.malformed_rows, 1);
    }

    #[test]
    fn test_parse_all_counts_every_malformed_row() {
        let rows = vec![
            Ok(row(["2010", "1", "x", "30"])),
            Ok(row(["2010", "1", "10", "20"])),
            Ok(row(["2010", "1", "5", "--"])),
            Ok(row(["2010", "1", "NA", "y"])),
        ];

        let stats = parser()
            .parse_all(columns(&["A", "B"]), rows)
            .unwrap()
            .stats();

        assert_eq!(stats.valid_rows, 1);
        assert_eq!(stats.malformed_rows, 2);
        assert_eq!(stats.missing_value_rows, 1);
    }

    #[test]
    fn test_parse_all_propagates_read_errors() {
        let rows = vec![
            Ok(row(["2010", "1", "10", "20"])),
            Err(ProcessingError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "truncated",
            ))),
        ];

        assert!(parser().parse_all(columns(&["A", "B"]), rows).is_err());
    }

    #[test]
    fn test_requires_year_and_month() {
        assert!(RecordParser::new(&columns(&["year"]), &columns(&["PM_A"])).is_err());
        assert!(RecordParser::new(&columns(&["year", "month"]), &[]).is_err());
    }
}
