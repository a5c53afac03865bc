use crate::config::CityConfig;
use crate::error::{ProcessingError, Result};
use crate::models::RawRow;
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

pub type RowIter<'a> = Box<dyn Iterator<Item = Result<RawRow>> + 'a>;

/// Supplies the raw rows for a city, projected onto the requested columns.
pub trait RowSource: Sync {
    fn rows(&self, city: &CityConfig, columns: &[String]) -> Result<RowIter<'_>>;
}

/// Reads each city's rows from a headed CSV file under a data directory.
pub struct CsvRowSource {
    data_dir: PathBuf,
    delimiter: u8,
}

impl CsvRowSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Open a CSV stream and check that every requested column is in its header.
    /// Rows are projected by header position; extra trailing fields are
    /// ignored and a short row simply lacks the columns past its end.
    pub fn read_rows<'a, R: Read + 'a>(
        &self,
        input: R,
        columns: &[String],
    ) -> Result<RowIter<'a>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(input);

        let headers = reader.headers()?.clone();
        let positions = column_positions(&headers, columns)?;

        Ok(Box::new(reader.into_records().map(move |record| -> Result<RawRow> {
            let record = record?;
            Ok(positions
                .iter()
                .filter_map(|(name, idx)| record.get(*idx).map(|value| (name.as_str(), value)))
                .collect())
        })))
    }
}

impl RowSource for CsvRowSource {
    fn rows(&self, city: &CityConfig, columns: &[String]) -> Result<RowIter<'_>> {
        let path = city.source_path(&self.data_dir);
        debug!(city = %city.name, path = %path.display(), "Opening city source");

        let file = File::open(&path)?;
        self.read_rows(BufReader::new(file), columns)
    }
}

fn column_positions(headers: &StringRecord, columns: &[String]) -> Result<Vec<(String, usize)>> {
    columns
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h.trim() == column.as_str())
                .map(|idx| (column.clone(), idx))
                .ok_or_else(|| ProcessingError::Schema {
                    column: column.clone(),
                })
        })
        .collect()
}

/// Rows held in memory, keyed by city name.
#[derive(Debug, Default)]
pub struct MemoryRowSource {
    rows: HashMap<String, Vec<RawRow>>,
}

impl MemoryRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_city(mut self, city: &str, rows: Vec<RawRow>) -> Self {
        self.rows.insert(city.to_string(), rows);
        self
    }
}

impl RowSource for MemoryRowSource {
    fn rows(&self, city: &CityConfig, _columns: &[String]) -> Result<RowIter<'_>> {
        let rows = self.rows.get(&city.name).ok_or_else(|| {
            ProcessingError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no rows registered for city '{}'", city.name),
            ))
        })?;

        Ok(Box::new(rows.iter().cloned().map(Ok)))
    }
}
