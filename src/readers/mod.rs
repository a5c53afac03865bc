pub mod csv_reader;
pub mod record_parser;

pub use csv_reader::{CsvRowSource, MemoryRowSource, RowIter, RowSource};
pub use record_parser::{ParseOutcome, RecordParser, Rejection};
