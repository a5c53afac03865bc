pub mod csv_writer;
pub mod json_writer;

pub use csv_writer::{
    month_label, monthly_header, monthly_row, write_monthly_table, write_severity_table,
    CsvTableWriter, MemorySink, ResultSink,
};
pub use json_writer::write_report_json;
