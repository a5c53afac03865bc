use crate::error::Result;
use crate::models::{CityResult, MonthKey, MonthlyBucket, RunReport};
use crate::utils::filename::{monthly_stats_path, severity_report_path};
use csv::Writer;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Receives each city's result as it is produced, then the cross-city report.
pub trait ResultSink {
    fn write_city(&mut self, result: &CityResult) -> Result<()>;

    fn write_severity_report(&mut self, report: &RunReport) -> Result<()>;
}

/// One line of the cross-city severity table.
#[derive(Debug, Serialize)]
struct SeverityRow<'a> {
    city: &'a str,
    heavy: f64,
    medium: f64,
    light: f64,
    good: f64,
}

/// Month label used in the monthly tables, e.g. `2010-01`.
pub fn month_label(key: MonthKey) -> String {
    format!("{}-{:02}", key.year, key.month)
}

pub fn monthly_header(station_names: &[String]) -> Vec<String> {
    std::iter::once("month".to_string())
        .chain(station_names.iter().cloned())
        .collect()
}

pub fn monthly_row(bucket: &MonthlyBucket) -> Vec<String> {
    std::iter::once(month_label(bucket.key))
        .chain(bucket.averages.iter().map(|v| format!("{:?}", v)))
        .collect()
}

/// Write one city's monthly table to any writer.
pub fn write_monthly_table<W: Write>(output: W, result: &CityResult) -> Result<()> {
    let mut writer = Writer::from_writer(output);
    writer.write_record(monthly_header(&result.station_names))?;
    for bucket in &result.monthly {
        writer.write_record(monthly_row(bucket))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the cross-city severity table to any writer.
pub fn write_severity_table<W: Write>(output: W, report: &RunReport) -> Result<()> {
    let mut writer = Writer::from_writer(output);
    if report.cities.is_empty() {
        writer.write_record(["city", "heavy", "medium", "light", "good"])?;
    }
    for city in &report.cities {
        writer.serialize(SeverityRow {
            city: &city.city,
            heavy: city.severity.heavy,
            medium: city.severity.medium,
            light: city.severity.light,
            good: city.severity.good,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `<city>_month_stats.csv` per city and `polluted_percentage.csv`
/// into an output directory, creating it if needed.
pub struct CsvTableWriter {
    output_dir: PathBuf,
    written_files: Vec<PathBuf>,
}

impl CsvTableWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;

        Ok(Self {
            output_dir,
            written_files: Vec::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn written_files(&self) -> &[PathBuf] {
        &self.written_files
    }
}

impl ResultSink for CsvTableWriter {
    fn write_city(&mut self, result: &CityResult) -> Result<()> {
        let path = monthly_stats_path(&self.output_dir, &result.city);
        write_monthly_table(fs::File::create(&path)?, result)?;

        info!(city = %result.city, path = %path.display(), "Saved monthly statistics");
        self.written_files.push(path);
        Ok(())
    }

    fn write_severity_report(&mut self, report: &RunReport) -> Result<()> {
        let path = severity_report_path(&self.output_dir);
        write_severity_table(fs::File::create(&path)?, report)?;

        info!(path = %path.display(), "Saved severity report");
        self.written_files.push(path);
        Ok(())
    }
}

/// Keeps results in memory; used by tests and callers that post-process.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub cities: Vec<CityResult>,
    pub report_written: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for MemorySink {
    fn write_city(&mut self, result: &CityResult) -> Result<()> {
        self.cities.push(result.clone());
        Ok(())
    }

    fn write_severity_report(&mut self, _report: &RunReport) -> Result<()> {
        self.report_written = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CleaningStats, SeveritySummary};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_result() -> CityResult {
        CityResult {
            city: "beijing".to_string(),
            station_names: vec!["Dongsi".to_string(), "Dongsihuan".to_string()],
            stats: CleaningStats {
                total_rows: 3,
                valid_rows: 2,
                missing_value_rows: 1,
                malformed_rows: 0,
            },
            severity: SeveritySummary {
                heavy: 0.5,
                medium: 0.0,
                light: 0.0,
                good: 0.5,
                total_hours: 2,
            },
            monthly: vec![
                MonthlyBucket {
                    key: MonthKey::new(2010, 1),
                    averages: vec![10.0, 20.5],
                },
                MonthlyBucket {
                    key: MonthKey::new(2010, 11),
                    averages: vec![200.0, 180.25],
                },
            ],
        }
    }

    #[test]
    fn test_month_label_is_zero_padded() {
        assert_eq!(month_label(MonthKey::new(2010, 1)), "2010-01");
        assert_eq!(month_label(MonthKey::new(2015, 12)), "2015-12");
    }

    #[test]
    fn test_monthly_table_content() -> Result<()> {
        let mut buffer = Vec::new();
        write_monthly_table(&mut buffer, &sample_result())?;

        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "month,Dongsi,Dongsihuan\n2010-01,10.0,20.5\n2010-11,200.0,180.25\n"
        );
        Ok(())
    }

    #[test]
    fn test_severity_table_content() -> Result<()> {
        let mut report = RunReport::new();
        report.push_city(&sample_result());

        let mut buffer = Vec::new();
        write_severity_table(&mut buffer, &report)?;

        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "city,heavy,medium,light,good\nbeijing,0.5,0.0,0.0,0.5\n"
        );
        Ok(())
    }

    #[test]
    fn test_empty_severity_table_has_header() -> Result<()> {
        let mut buffer = Vec::new();
        write_severity_table(&mut buffer, &RunReport::new())?;

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "city,heavy,medium,light,good\n"
        );
        Ok(())
    }

    #[test]
    fn test_csv_writer_creates_files() -> Result<()> {
        let dir = TempDir::new()?;
        let output_dir = dir.path().join("nested").join("output");

        let mut writer = CsvTableWriter::new(&output_dir)?;
        let result = sample_result();
        writer.write_city(&result)?;

        let mut report = RunReport::new();
        report.push_city(&result);
        writer.write_severity_report(&report)?;

        assert!(output_dir.join("beijing_month_stats.csv").exists());
        assert!(output_dir.join("polluted_percentage.csv").exists());
        assert_eq!(writer.written_files().len(), 2);
        Ok(())
    }
}
