//! Zip packaging of an export: fixed auxiliary entries first, then the data.
//!
//! Entries are deflated (or stored, when asked) and stamped with the zip
//! epoch (1980-01-01 00:00) so the same input always produces the same bytes.
//!
//! `zip::ZipWriter` finalizes itself when dropped. To keep a failed export
//! from leaving a well-formed but truncated archive behind, the sink is
//! wrapped in [`PoisonableSink`]; on failure it is poisoned before the writer
//! drops, so the central directory is never written.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::Result;

pub const LICENSE_ENTRY_NAME: &str = "LICENSE.txt";

/// License text shipped when no override is configured.
pub const DEFAULT_LICENSE: &str = include_str!("../assets/DATA_LICENSE.txt");

/// A fixed entry written ahead of the data entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxEntry {
    pub name: String,
    pub content: Vec<u8>,
}

impl AuxEntry {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn license(text: impl Into<Vec<u8>>) -> Self {
        Self::new(LICENSE_ENTRY_NAME, text)
    }
}

/// How entry bodies are encoded inside the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryCompression {
    #[default]
    Deflated,
    /// Bodies copied verbatim
    Stored,
}

impl From<EntryCompression> for CompressionMethod {
    fn from(compression: EntryCompression) -> Self {
        match compression {
            EntryCompression::Deflated => CompressionMethod::Deflated,
            EntryCompression::Stored => CompressionMethod::Stored,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArchivePackager {
    compression: EntryCompression,
}

impl ArchivePackager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression(mut self, compression: EntryCompression) -> Self {
        self.compression = compression;
        self
    }

    fn entry_options(&self) -> FileOptions {
        FileOptions::default()
            .compression_method(self.compression.into())
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644)
    }

    /// Writes `aux` entries in order, then lets `write_data` stream the data
    /// entry, then finalizes the archive.
    ///
    /// Returns whatever `write_data` returned (typically a record count).
    #[instrument(skip_all, fields(entry = %data_entry_name))]
    pub fn package<W, F, T>(
        &self,
        sink: W,
        aux: &[AuxEntry],
        data_entry_name: &str,
        write_data: F,
    ) -> Result<T>
    where
        W: Write + Seek,
        F: FnOnce(&mut dyn Write) -> Result<T>,
    {
        let poisoned = Arc::new(AtomicBool::new(false));
        let mut zip = ZipWriter::new(PoisonableSink::new(sink, Arc::clone(&poisoned)));

        let outcome = self.write_entries(&mut zip, aux, data_entry_name, write_data);
        match outcome {
            Ok(value) => {
                zip.finish()?;
                debug!(aux_entries = aux.len(), "archive finalized");
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "export failed; archive left unfinished");
                poisoned.store(true, Ordering::SeqCst);
                drop(zip);
                Err(err)
            }
        }
    }

    /// Pull-style variant: copies `data` into the data entry.
    pub fn package_reader<W, R>(
        &self,
        sink: W,
        aux: &[AuxEntry],
        data_entry_name: &str,
        mut data: R,
    ) -> Result<u64>
    where
        W: Write + Seek,
        R: Read,
    {
        self.package(sink, aux, data_entry_name, |out| {
            Ok(io::copy(&mut data, out)?)
        })
    }

    fn write_entries<W, F, T>(
        &self,
        zip: &mut ZipWriter<W>,
        aux: &[AuxEntry],
        data_entry_name: &str,
        write_data: F,
    ) -> Result<T>
    where
        W: Write + Seek,
        F: FnOnce(&mut dyn Write) -> Result<T>,
    {
        for entry in aux {
            zip.start_file(entry.name.as_str(), self.entry_options())?;
            zip.write_all(&entry.content)?;
        }
        zip.start_file(data_entry_name, self.entry_options())?;
        write_data(zip)
    }
}

/// Write/seek passthrough that refuses all I/O once poisoned.
pub struct PoisonableSink<W> {
    inner: W,
    poisoned: Arc<AtomicBool>,
}

impl<W> PoisonableSink<W> {
    pub fn new(inner: W, poisoned: Arc<AtomicBool>) -> Self {
        Self { inner, poisoned }
    }

    fn check(&self) -> io::Result<()> {
        if self.poisoned.load(Ordering::SeqCst) {
            Err(io::Error::new(
                io::ErrorKind::Other,
                "export aborted; refusing to finalize archive",
            ))
        } else {
            Ok(())
        }
    }
}

impl<W: Write> Write for PoisonableSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check()?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check()?;
        self.inner.flush()
    }
}

impl<W: Seek> Seek for PoisonableSink<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.check()?;
        self.inner.seek(pos)
    }
}
