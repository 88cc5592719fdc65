//! The export pipeline: fetch a partition, serialize it, package it.
//!
//! An [`ExportFormat`] carries everything that differs between artifacts
//! (name templates, container, column layout, padding, license). The steps
//! are always the same: resolve the partition's window, pull records from the
//! source, stream them through the CSV serializer, and for zip artifacts wrap
//! that stream in the archive packager.

use std::fs;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::archive::{ArchivePackager, AuxEntry, EntryCompression, DEFAULT_LICENSE};
use crate::columns::Layout;
use crate::delimited::CsvSerializer;
use crate::error::{OpenDataError, Result};
use crate::naming::{
    content_disposition, data_entry_name, ArtifactKind, NameTemplates, Padding, Partition,
    DEFAULT_CURRENT_WINDOW_DAYS, DEFAULT_PREFIX,
};
use crate::record::Record;
use crate::source::RecordSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFormat {
    pub templates: NameTemplates,
    pub kind: ArtifactKind,
    pub layout: Layout,
    pub padding: Padding,
    /// License entry text for zip artifacts; `None` ships the bundled license
    pub license: Option<String>,
    pub current_window_days: u32,
    /// Entry encoding for zip artifacts
    pub compression: EntryCompression,
}

impl ExportFormat {
    pub fn new(prefix: &str, kind: ArtifactKind) -> Self {
        Self {
            templates: NameTemplates::for_kind(prefix, kind),
            kind,
            layout: Layout::default(),
            padding: Padding::default(),
            license: None,
            current_window_days: DEFAULT_CURRENT_WINDOW_DAYS,
            compression: EntryCompression::default(),
        }
    }

    pub fn csv() -> Self {
        Self::new(DEFAULT_PREFIX, ArtifactKind::Csv)
    }

    pub fn zip() -> Self {
        Self::new(DEFAULT_PREFIX, ArtifactKind::Zip)
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_license(mut self, text: impl Into<String>) -> Self {
        self.license = Some(text.into());
        self
    }

    pub fn with_current_window_days(mut self, days: u32) -> Self {
        self.current_window_days = days;
        self
    }

    pub fn with_compression(mut self, compression: EntryCompression) -> Self {
        self.compression = compression;
        self
    }

    pub fn file_name(&self, partition: &Partition) -> String {
        self.templates.name_for(partition, self.padding)
    }

    pub fn artifact(&self, partition: &Partition) -> Artifact {
        let file_name = self.file_name(partition);
        Artifact {
            media_type: self.kind.media_type(),
            content_disposition: content_disposition(self.kind, &file_name),
            file_name,
        }
    }

    fn license_text(&self) -> &str {
        self.license.as_deref().unwrap_or(DEFAULT_LICENSE)
    }
}

/// What a finished export delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub media_type: &'static str,
    pub content_disposition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub artifact: Artifact,
    pub records: u64,
}

/// Exports `partition` from `source` into `sink`.
pub fn export<S, W>(
    source: &S,
    format: &ExportFormat,
    partition: &Partition,
    now: DateTime<Utc>,
    sink: W,
) -> Result<ExportOutcome>
where
    S: RecordSource + ?Sized,
    W: Write + Seek,
{
    export_with_progress(source, format, partition, now, sink, |_| {})
}

/// Like [`export`], calling `progress` with the running record count.
#[instrument(skip_all, fields(partition = %partition, kind = ?format.kind))]
pub fn export_with_progress<S, W, P>(
    source: &S,
    format: &ExportFormat,
    partition: &Partition,
    now: DateTime<Utc>,
    sink: W,
    mut progress: P,
) -> Result<ExportOutcome>
where
    S: RecordSource + ?Sized,
    W: Write + Seek,
    P: FnMut(u64),
{
    let artifact = format.artifact(partition);
    let window = partition.window(now, format.current_window_days)?;
    debug!(start = %window.start, end = %window.end, file = %artifact.file_name, "resolved partition");

    let records = match format.layout {
        Layout::Legacy => source.fetch_legacy_format(&window)?,
        Layout::OpenTest | Layout::Signal => source.fetch(&window)?,
    };
    let mut seen = 0u64;
    let records = records.inspect(|_: &Result<Record>| {
        seen += 1;
        progress(seen);
    });

    let serializer = CsvSerializer::new(format.layout.columns());
    let written = match format.kind {
        ArtifactKind::Csv => {
            let mut sink = sink;
            serializer.serialize(records, &mut sink)?
        }
        ArtifactKind::Zip => {
            let aux = [AuxEntry::license(format.license_text())];
            ArchivePackager::new()
                .with_compression(format.compression)
                .package(
                    sink,
                    &aux,
                    &data_entry_name(&artifact.file_name),
                    |out| serializer.serialize(records, out),
                )?
        }
    };

    info!(records = written, file = %artifact.file_name, "export complete");
    Ok(ExportOutcome {
        artifact,
        records: written,
    })
}

/// Exports into `out_dir`, named after the partition.
///
/// Output goes to a temp file in `out_dir` first and is renamed into place
/// only once the export succeeded; on failure no file is left behind.
#[instrument(skip_all, fields(out_dir = %out_dir.display()))]
pub fn persist_export<S, P>(
    out_dir: &Path,
    source: &S,
    format: &ExportFormat,
    partition: &Partition,
    now: DateTime<Utc>,
    progress: P,
) -> Result<(PathBuf, ExportOutcome)>
where
    S: RecordSource + ?Sized,
    P: FnMut(u64),
{
    fs::create_dir_all(out_dir)?;
    let mut tmp = NamedTempFile::new_in(out_dir)?;
    let outcome = export_with_progress(source, format, partition, now, tmp.as_file_mut(), progress)?;
    tmp.as_file_mut().sync_all()?;

    let target = out_dir.join(&outcome.artifact.file_name);
    tmp.persist(&target)
        .map_err(|e| OpenDataError::from(e.error))?;
    debug!(path = %target.display(), "artifact persisted");
    Ok((target, outcome))
}
