//! Record sources: the boundary the export pipeline pulls records from.
//!
//! A source answers "every record inside this time window, in order". The
//! pipeline never looks behind it; the two implementations here back tests
//! and the command-line tool.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{OpenDataError, Result};
use crate::naming::TimeWindow;
use crate::record::{Record, ValidationRule};
use crate::stream::JsonValues;

/// Field holding a record's UTC timestamp unless configured otherwise.
pub const DEFAULT_TIME_FIELD: &str = "time_utc";

/// Record stream handed out by a source, in source order.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<Record>> + 'a>;

pub trait RecordSource {
    /// Records in `window` with the current field layout.
    fn fetch(&self, window: &TimeWindow) -> Result<RecordIter<'_>>;

    /// Records in `window` with the historic field layout. Sources without a
    /// separate legacy feed serve the current records.
    fn fetch_legacy_format(&self, window: &TimeWindow) -> Result<RecordIter<'_>> {
        self.fetch(window)
    }

    fn fetch_validation_rules(&self) -> Result<Vec<ValidationRule>>;
}

/// Parses a record timestamp: `yyyy-MM-dd HH:mm:ss` (UTC), RFC 3339, or
/// epoch milliseconds.
pub fn parse_record_time(value: &Value) -> Result<DateTime<Utc>> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
                return Ok(Utc.from_utc_datetime(&naive));
            }
            DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| OpenDataError::invalid_timestamp(text, e.to_string()))
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| OpenDataError::invalid_timestamp(n.to_string(), "not epoch milliseconds")),
        other => Err(OpenDataError::invalid_timestamp(
            other.to_string(),
            "expected text or epoch milliseconds",
        )),
    }
}

/// Keeps records whose `time_field` falls inside `window`. Records without a
/// timestamp belong to no window and are skipped; unparseable timestamps are
/// errors.
fn filter_window<'a, I>(records: I, time_field: &'a str, window: TimeWindow) -> RecordIter<'a>
where
    I: Iterator<Item = Result<Record>> + 'a,
{
    Box::new(WindowFilter {
        records,
        time_field,
        window,
        untimed: 0,
    })
}

/// Window filter that reports how many records carried no timestamp once the
/// stream is dropped.
struct WindowFilter<'a, I> {
    records: I,
    time_field: &'a str,
    window: TimeWindow,
    untimed: u64,
}

impl<I> Iterator for WindowFilter<'_, I>
where
    I: Iterator<Item = Result<Record>>,
{
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e)),
            };
            match record.get(self.time_field) {
                None => self.untimed += 1,
                Some(value) => match parse_record_time(value) {
                    Ok(at) if self.window.contains(at) => return Some(Ok(record)),
                    Ok(_) => {}
                    Err(e) => return Some(Err(e)),
                },
            }
        }
    }
}

impl<I> Drop for WindowFilter<'_, I> {
    fn drop(&mut self) {
        if self.untimed > 0 {
            debug!(
                skipped = self.untimed,
                time_field = self.time_field,
                "skipped records without a timestamp"
            );
        }
    }
}

/// Source over records held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    records: Vec<Record>,
    legacy: Option<Vec<Record>>,
    rules: Vec<ValidationRule>,
    time_field: String,
}

impl MemoryRecordSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            legacy: None,
            rules: Vec::new(),
            time_field: DEFAULT_TIME_FIELD.to_string(),
        }
    }

    pub fn with_legacy(mut self, records: Vec<Record>) -> Self {
        self.legacy = Some(records);
        self
    }

    pub fn with_rules(mut self, rules: Vec<ValidationRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_time_field(mut self, field: impl Into<String>) -> Self {
        self.time_field = field.into();
        self
    }
}

impl RecordSource for MemoryRecordSource {
    fn fetch(&self, window: &TimeWindow) -> Result<RecordIter<'_>> {
        let records = self.records.iter().cloned().map(Ok);
        Ok(filter_window(records, &self.time_field, *window))
    }

    fn fetch_legacy_format(&self, window: &TimeWindow) -> Result<RecordIter<'_>> {
        match &self.legacy {
            Some(legacy) => {
                let records = legacy.iter().cloned().map(Ok);
                Ok(filter_window(records, &self.time_field, *window))
            }
            None => self.fetch(window),
        }
    }

    fn fetch_validation_rules(&self) -> Result<Vec<ValidationRule>> {
        Ok(self.rules.clone())
    }
}

/// Source over NDJSON or JSON-array files, streamed one record at a time.
#[derive(Debug, Clone)]
pub struct FileRecordSource {
    path: PathBuf,
    legacy_path: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    time_field: String,
}

impl FileRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            legacy_path: None,
            rules_path: None,
            time_field: DEFAULT_TIME_FIELD.to_string(),
        }
    }

    pub fn with_legacy_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.legacy_path = Some(path.into());
        self
    }

    pub fn with_rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_path = Some(path.into());
        self
    }

    pub fn with_time_field(mut self, field: impl Into<String>) -> Self {
        self.time_field = field.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    fn stream(&self, path: &Path, window: &TimeWindow) -> Result<RecordIter<'_>> {
        let values = JsonValues::<File>::from_path(path)?;
        debug!(start = %window.start, end = %window.end, "streaming records");
        let records = values.map(|value| value.and_then(Record::from_json));
        Ok(filter_window(records, &self.time_field, *window))
    }
}

impl RecordSource for FileRecordSource {
    fn fetch(&self, window: &TimeWindow) -> Result<RecordIter<'_>> {
        self.stream(&self.path, window)
    }

    fn fetch_legacy_format(&self, window: &TimeWindow) -> Result<RecordIter<'_>> {
        self.stream(self.legacy_path.as_deref().unwrap_or(&self.path), window)
    }

    /// Reads the rules file in full; without one the rule set is empty.
    fn fetch_validation_rules(&self) -> Result<Vec<ValidationRule>> {
        let Some(path) = &self.rules_path else {
            return Ok(Vec::new());
        };
        JsonValues::<File>::from_path(path)?
            .map(|value| {
                let value = value?;
                serde_json::from_value(value)
                    .map_err(|e| OpenDataError::json(format!("validation rule in {:?}", path), e))
            })
            .collect()
    }
}
