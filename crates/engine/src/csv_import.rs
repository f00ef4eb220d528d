//! CSV decoding for batch imports.
//!
//! The expected layout is a header row naming the `title`, `value`, `type`
//! and `category` columns (in any order, extra columns ignored) followed by
//! one entry per line. Fields are trimmed. Lines that cannot be decoded are
//! skipped and logged; they never reach the reconciler.

use std::{future::Future, io::Read};

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::{EngineError, ImportRow, ResultEngine};

/// A transient, already staged import source (e.g. an uploaded file).
///
/// The engine opens it with [`reader`](StagedSource::reader) and calls
/// [`release`](StagedSource::release) once the imported entries are
/// committed.
pub trait StagedSource {
    type Reader: Read;

    fn reader(&self) -> std::io::Result<Self::Reader>;

    fn release(self) -> impl Future<Output = std::io::Result<()>> + Send;
}

struct Columns {
    title: usize,
    value: usize,
    kind: usize,
    category: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> ResultEngine<Self> {
        let position = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                EngineError::InvalidImport(format!("missing \"{name}\" column"))
            })
        };
        Ok(Self {
            title: position("title")?,
            value: position("value")?,
            kind: position("type")?,
            category: position("category")?,
        })
    }

    fn row(&self, record: &StringRecord) -> Option<ImportRow> {
        Some(ImportRow {
            title: record.get(self.title)?.to_string(),
            value: record.get(self.value)?.to_string(),
            kind: record.get(self.kind)?.to_string(),
            category: record.get(self.category)?.to_string(),
        })
    }
}

/// Decodes CSV rows in file order, skipping malformed lines.
pub fn decode_rows<R: Read>(reader: R) -> ResultEngine<Vec<ImportRow>> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(b',')
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|err| EngineError::InvalidImport(format!("unreadable header: {err}")))?
        .clone();
    let columns = Columns::from_headers(&headers)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in csv_reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => {
                return Err(EngineError::InvalidImport(format!(
                    "failed to read source: {err}"
                )));
            }
            Err(err) => {
                let line = err.position().map(|p| p.line());
                tracing::warn!(?line, "skipping malformed csv line: {err}");
                skipped += 1;
                continue;
            }
        };
        match columns.row(&record) {
            Some(row) => rows.push(row),
            None => {
                let line = record.position().map(|p| p.line());
                tracing::warn!(?line, "skipping csv line with missing fields");
                skipped += 1;
            }
        }
    }

    tracing::debug!(rows = rows.len(), skipped, "decoded csv import");
    Ok(rows)
}
