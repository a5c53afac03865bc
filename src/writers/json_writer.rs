use crate::error::Result;
use crate::models::RunReport;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Write the cross-city report as pretty-printed JSON.
pub fn write_report_json(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, report)?;

    info!(path = %path.display(), "Saved JSON summary");
    Ok(())
}
