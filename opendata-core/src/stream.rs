//! Streaming reader for record files with O(1) memory usage.
//!
//! Record dumps come either as NDJSON (one object per line) or as a single
//! JSON array. `serde_json::StreamDeserializer` treats a top-level array as
//! one value and would buffer the whole file, so arrays are walked by hand:
//! read the opening `[`, parse one element, skip the `,`, stop at `]`. Only
//! the element being parsed is ever resident.
//!
//! The format is picked from the first non-whitespace byte: `[` means array,
//! anything else NDJSON. An empty input yields no values.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use serde_json::{Deserializer, Value};

use crate::error::{OpenDataError, Result};

/// Iterator over the JSON values of an NDJSON or JSON-array input.
pub enum JsonValues<R> {
    Array(JsonArrayStream<R>),
    Ndjson(NdjsonLines<R>),
}

impl JsonValues<File> {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => OpenDataError::path_not_found(path),
            _ => e.into(),
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read> JsonValues<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut reader = BufReader::new(reader);
        skip_whitespace(&mut reader)?;
        if peek_byte(&mut reader)? == Some(b'[') {
            Ok(Self::Array(JsonArrayStream {
                reader,
                started: false,
                finished: false,
                index: 0,
                pending: None,
            }))
        } else {
            Ok(Self::Ndjson(NdjsonLines {
                reader,
                line: String::new(),
                line_no: 0,
            }))
        }
    }
}

impl<R: Read> Iterator for JsonValues<R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Array(stream) => stream.next_element().transpose(),
            Self::Ndjson(lines) => lines.next_value().transpose(),
        }
    }
}

/// Elements of a JSON array, one at a time.
pub struct JsonArrayStream<R> {
    reader: BufReader<R>,
    started: bool,
    finished: bool,
    index: usize,
    // delimiter swallowed while parsing a bare number
    pending: Option<u8>,
}

impl<R: Read> JsonArrayStream<R> {
    fn next_element(&mut self) -> Result<Option<Value>> {
        if self.finished {
            return Ok(None);
        }

        if !self.started {
            skip_whitespace(&mut self.reader)?;
            let mut bracket = [0u8; 1];
            self.reader.read_exact(&mut bracket)?;
            if bracket[0] != b'[' {
                return Err(self.malformed("expected '[' at start of JSON array"));
            }
            self.started = true;
            skip_whitespace(&mut self.reader)?;
            if peek_byte(&mut self.reader)? == Some(b']') {
                self.finished = true;
                return Ok(None);
            }
        } else {
            let next = match self.pending.take().filter(|b| !b.is_ascii_whitespace()) {
                Some(byte) => Some(byte),
                None => {
                    skip_whitespace(&mut self.reader)?;
                    let next = peek_byte(&mut self.reader)?;
                    if next.is_some() {
                        self.reader.consume(1);
                    }
                    next
                }
            };
            match next {
                Some(b']') => {
                    self.finished = true;
                    return Ok(None);
                }
                Some(b',') => {
                    skip_whitespace(&mut self.reader)?;
                }
                None => {
                    self.finished = true;
                    return Err(self.malformed("unexpected EOF in JSON array (missing ']')"));
                }
                Some(other) => {
                    self.finished = true;
                    return Err(self.malformed(format!(
                        "unexpected character '{}' (expected ',' or ']')",
                        char::from(other)
                    )));
                }
            }
        }

        // Objects, strings and literals end on their own closing byte. A bare
        // number only ends once the parser has read the byte after it, which
        // the tap hands back as the pending delimiter.
        let mut tap = Tap {
            inner: &mut self.reader,
            last: None,
        };
        let parsed = Value::deserialize(&mut Deserializer::from_reader(&mut tap));
        let last = tap.last;
        let value = parsed.map_err(|e| {
            self.finished = true;
            OpenDataError::json(format!("array element {}", self.index), e)
        })?;
        if value.is_number() {
            self.pending = last.filter(|b| !b.is_ascii_digit());
        }
        self.index += 1;
        Ok(Some(value))
    }

    fn malformed(&self, reason: impl Into<String>) -> OpenDataError {
        OpenDataError::invalid_record(format!("array element {}", self.index), reason)
    }
}

/// Remembers the last byte read through it.
struct Tap<'a, R> {
    inner: &'a mut R,
    last: Option<u8>,
}

impl<R: Read> Read for Tap<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.last = Some(buf[n - 1]);
        }
        Ok(n)
    }
}

/// Non-empty lines of an NDJSON input, parsed one at a time.
pub struct NdjsonLines<R> {
    reader: BufReader<R>,
    line: String,
    line_no: usize,
}

impl<R: Read> NdjsonLines<R> {
    fn next_value(&mut self) -> Result<Option<Value>> {
        loop {
            self.line.clear();
            let read = match self.reader.read_line(&mut self.line) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|e| OpenDataError::json(format!("line {}", self.line_no), e));
        }
    }
}

fn skip_whitespace<R: Read>(reader: &mut BufReader<R>) -> Result<()> {
    loop {
        match reader.fill_buf() {
            Ok([]) => return Ok(()),
            Ok(available) => {
                let n = available
                    .iter()
                    .take_while(|b| b.is_ascii_whitespace())
                    .count();
                if n == 0 {
                    return Ok(());
                }
                reader.consume(n);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn peek_byte<R: Read>(reader: &mut BufReader<R>) -> Result<Option<u8>> {
    loop {
        match reader.fill_buf() {
            Ok([]) => return Ok(None),
            Ok(buf) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
