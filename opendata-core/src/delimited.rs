//! Streaming delimited-text serializer.
//!
//! Records are pulled one at a time from the source iterator and pushed into
//! the sink, so memory use does not grow with the partition size. Quoting is
//! delegated to the `csv` crate: fields containing the separator, a quote or a
//! line break are quoted and embedded quotes are doubled.

use std::io::Write;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use tracing::{debug, instrument};

use crate::columns::Column;
use crate::error::Result;
use crate::record::Record;

pub const FIELD_SEPARATOR: u8 = b',';
pub const RECORD_SEPARATOR: u8 = b'\n';

#[derive(Debug, Clone, Copy)]
pub struct CsvSerializer<'a> {
    columns: &'a [Column],
    write_header: bool,
}

impl<'a> CsvSerializer<'a> {
    pub fn new(columns: &'a [Column]) -> Self {
        Self {
            columns,
            write_header: true,
        }
    }

    pub fn without_header(mut self) -> Self {
        self.write_header = false;
        self
    }

    /// Writes the header (if enabled) and one line per record, in source
    /// order. Returns the number of records written.
    ///
    /// The first failing record or write aborts serialization; whatever was
    /// already written stays in the sink and the error is returned.
    #[instrument(skip_all, fields(columns = self.columns.len()))]
    pub fn serialize<I, W>(&self, records: I, sink: W) -> Result<u64>
    where
        I: IntoIterator<Item = Result<Record>>,
        W: Write,
    {
        let mut writer = WriterBuilder::new()
            .delimiter(FIELD_SEPARATOR)
            .terminator(Terminator::Any(RECORD_SEPARATOR))
            .quote_style(QuoteStyle::Necessary)
            .has_headers(false)
            .from_writer(sink);

        if self.write_header {
            writer.write_record(self.columns.iter().map(|c| c.header))?;
        }

        let mut written = 0u64;
        for record in records {
            let record = record?;
            let row: Vec<_> = self.columns.iter().map(|c| c.cell(&record)).collect();
            writer.write_record(row.iter().map(|cell| cell.as_bytes()))?;
            written += 1;
        }

        writer.flush()?;
        debug!(records = written, "delimited output flushed");
        Ok(written)
    }
}
