use std::{
    fs::File,
    io,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    pin::Pin,
};

use csv::StringRecord;
use futures::Stream;

use crate::pipeline::IngestError;

/// A slice of consecutive source rows, in file order.
#[derive(Debug, Clone)]
pub struct RawChunk {
    /// Zero-based position of the chunk in the file.
    pub index: usize,
    pub rows: Vec<StringRecord>,
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<RawChunk, IngestError>> + Send>>;

/// Trimmed headers plus a lazy stream over the remaining rows.
pub struct CsvChunks {
    pub headers: Vec<String>,
    pub chunks: ChunkStream,
}

/// Chunked reader for electrical time-series files.
///
/// Headers are free-form; mapping them onto reading attributes is left to
/// the transform. Every call to [`open`](Self::open) starts again from the
/// top of the file.
pub struct ElectricalCsvFileSource {
    path: PathBuf,
    chunk_size: NonZeroUsize,
    delimiter: u8,
}

impl ElectricalCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P, chunk_size: NonZeroUsize) -> Self {
        Self {
            path: path.into(),
            chunk_size,
            delimiter: b',',
        }
    }

    /// Use `b'|'` for pipe-delimited `.dat` exports.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> Result<CsvChunks, IngestError> {
        let file = File::open(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => IngestError::InputNotFound(self.path.clone()),
            _ => IngestError::Source(format!("failed to open CSV file: {e}")),
        })?;

        // The reader blocks; chunks are small enough that this stays on the
        // calling task.
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(file);
        let headers = rdr
            .headers()
            .map_err(|e| IngestError::Source(format!("failed to read CSV headers: {e}")))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let chunk_size = self.chunk_size.get();
        let chunks = async_stream::try_stream! {
            let mut records = rdr.into_records();
            let mut index = 0;

            loop {
                let mut rows = Vec::with_capacity(chunk_size);
                while rows.len() < chunk_size {
                    match records.next() {
                        Some(result) => {
                            let record = result.map_err(|e| {
                                IngestError::Source(format!("failed to read CSV record: {e}"))
                            })?;
                            rows.push(record);
                        }
                        None => break,
                    }
                }

                if rows.is_empty() {
                    break;
                }

                yield RawChunk { index, rows };
                index += 1;
            }
        };

        Ok(CsvChunks {
            headers,
            chunks: Box::pin(chunks),
        })
    }
}
