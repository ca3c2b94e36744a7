use std::{
    collections::HashMap,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use futures::StreamExt;
use solar_client::{domain::ElectricalReading, StorageTarget, Store, UnsupportedStorage};

use crate::{
    sinks::ElectricalStoreSink,
    sources::{CsvChunks, ElectricalCsvFileSource},
    transform::{
        columns::fold_aliases, default_aliases, resolve_columns, ReadingCleaner, ReadingColumn,
    },
};

#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("storage backend unavailable: {0}")]
    DependencyMissing(#[from] UnsupportedStorage),
    #[error("CSV file not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("no recognised timestamp column in {}; detected columns: {headers:?}", path.display())]
    Schema { path: PathBuf, headers: Vec<String> },
    #[error("source error: {0}")]
    Source(String),
    #[error("failed to connect to storage: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("failed to insert chunk {chunk}: {source}")]
    Persistence {
        chunk: usize,
        #[source]
        source: sqlx::Error,
    },
}

/// Destination for cleaned batches.
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    /// Persist one batch atomically and return the number of rows written.
    async fn write_batch(&self, batch: &[ElectricalReading]) -> Result<u64, sqlx::Error>;
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Extra header treated as the time axis, on top of the built-in aliases.
    pub timestamp_column: String,
    pub column_overrides: HashMap<String, ReadingColumn>,
    /// Source rows buffered per insert transaction.
    pub chunk_size: NonZeroUsize,
    pub delimiter: u8,
}

pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(n) => n,
    None => unreachable!(),
};

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            timestamp_column: "timestamp".to_string(),
            column_overrides: HashMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            delimiter: b',',
        }
    }
}

impl IngestOptions {
    /// Overrides as applied to the alias table, keyed by lowercased alias.
    /// Explicit column overrides win over `timestamp_column`.
    pub fn effective_overrides(&self) -> HashMap<String, ReadingColumn> {
        let mut overrides = HashMap::new();
        let timestamp_column = self.timestamp_column.trim();
        if !timestamp_column.is_empty() {
            overrides.insert(timestamp_column.to_lowercase(), ReadingColumn::Timestamp);
        }
        overrides.extend(fold_aliases(&self.column_overrides));
        overrides
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks: usize,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub rows_inserted: u64,
}

pub struct Pipeline<K> {
    pub source: ElectricalCsvFileSource,
    pub overrides: HashMap<String, ReadingColumn>,
    pub system_id: i64,
    pub sink: K,
}

impl<K: Sink> Pipeline<K> {
    /// Read, clean and insert the whole file chunk by chunk.
    ///
    /// Chunks committed before a failing one stay committed.
    pub async fn run(&self) -> Result<IngestReport, IngestError> {
        let CsvChunks { headers, mut chunks } = self.source.open()?;

        let mapping = resolve_columns(&headers, &default_aliases(), &self.overrides);
        let cleaner =
            ReadingCleaner::new(&mapping, self.system_id).ok_or_else(|| IngestError::Schema {
                path: self.source.path().to_path_buf(),
                headers,
            })?;

        let mut report = IngestReport::default();

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            let batch = cleaner.clean(&chunk.rows);

            report.chunks += 1;
            report.rows_read += chunk.rows.len();
            report.rows_dropped += batch.dropped;

            if batch.dropped > 0 {
                tracing::warn!(
                    chunk = chunk.index,
                    dropped = batch.dropped,
                    "dropped rows with unparseable timestamp"
                );
            }
            if batch.readings.is_empty() {
                continue;
            }

            let inserted = self
                .sink
                .write_batch(&batch.readings)
                .await
                .map_err(|source| IngestError::Persistence {
                    chunk: chunk.index,
                    source,
                })?;

            report.rows_inserted += inserted;
            metrics::counter!("electrical_rows_inserted_total").increment(inserted);
            tracing::info!(
                chunk = chunk.index,
                inserted,
                total = report.rows_inserted,
                "chunk committed"
            );
        }

        tracing::info!(
            system_id = self.system_id,
            chunks = report.chunks,
            dropped = report.rows_dropped,
            total = report.rows_inserted,
            "ingestion finished"
        );

        Ok(report)
    }
}

/// Load an electrical-readings CSV into `electrical_data` for one system.
///
/// `storage` is a SQLite file path, a `sqlite:` URL or a `postgres://` URL.
/// The system must already exist; that is enforced by the foreign key.
/// Chunks are inserted one transaction at a time, so a single pooled
/// connection is opened regardless of `[storage].max_connections`.
/// Returns the number of rows inserted.
pub async fn ingest_electrical_csv(
    storage: &str,
    system_id: i64,
    csv_path: impl AsRef<Path>,
    options: &IngestOptions,
) -> Result<u64, IngestError> {
    let target = StorageTarget::parse(storage)?;

    let csv_path = csv_path.as_ref();
    if !csv_path.exists() {
        return Err(IngestError::InputNotFound(csv_path.to_path_buf()));
    }

    let store = Store::connect(&target, 1)
        .await
        .map_err(IngestError::Connect)?;

    let pipeline = Pipeline {
        source: ElectricalCsvFileSource::new(csv_path, options.chunk_size)
            .with_delimiter(options.delimiter),
        overrides: options.effective_overrides(),
        system_id,
        sink: ElectricalStoreSink::new(store.clone()),
    };
    let result = pipeline.run().await;

    store.close().await;
    result.map(|report| report.rows_inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solar_client::db::{
        electrical_queries::{count_electrical_readings, electrical_readings},
        project_queries::{add_project, add_system},
        schema::create_schema,
    };
    use solar_client::domain::{NewProject, NewSystem};
    use std::{fs, sync::Mutex};

    /// Records batch sizes and fails on the given (zero-based) call.
    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<usize>>,
        fail_on: Option<usize>,
    }

    #[async_trait::async_trait]
    impl Sink for RecordingSink {
        async fn write_batch(&self, batch: &[ElectricalReading]) -> Result<u64, sqlx::Error> {
            let mut batches = self.batches.lock().unwrap();
            if self.fail_on == Some(batches.len()) {
                return Err(sqlx::Error::Protocol("simulated storage failure".to_string()));
            }
            batches.push(batch.len());
            Ok(batch.len() as u64)
        }
    }

    fn write_csv(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("readings.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    fn pipeline<K: Sink>(path: &Path, chunk_size: usize, sink: K) -> Pipeline<K> {
        Pipeline {
            source: ElectricalCsvFileSource::new(path, NonZeroUsize::new(chunk_size).unwrap()),
            overrides: IngestOptions::default().effective_overrides(),
            system_id: 1,
            sink,
        }
    }

    const FIVE_ROWS: &str = "timestamp,power_kw\n\
        2024-01-01 00:00:00,1\n\
        2024-01-01 00:15:00,2\n\
        2024-01-01 00:30:00,3\n\
        2024-01-01 00:45:00,4\n\
        2024-01-01 01:00:00,5\n";

    async fn sqlite_with_system(dir: &tempfile::TempDir) -> (String, Store, i64) {
        let db_path = dir.path().join("solar.db").to_str().unwrap().to_string();
        let store = Store::connect(&StorageTarget::parse(&db_path).unwrap(), 1)
            .await
            .unwrap();
        create_schema(&store).await.unwrap();
        let project_id = add_project(
            &store,
            &NewProject {
                name: "Parque Solar Ejemplo".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let system_id = add_system(
            &store,
            &NewSystem {
                project_id,
                name: "Array Norte".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (db_path, store, system_id)
    }

    #[tokio::test]
    async fn chunks_become_separate_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, FIVE_ROWS);

        let p = pipeline(&path, 2, RecordingSink::default());
        let report = p.run().await.unwrap();

        assert_eq!(*p.sink.batches.lock().unwrap(), [2, 2, 1]);
        assert_eq!(
            report,
            IngestReport {
                chunks: 3,
                rows_read: 5,
                rows_dropped: 0,
                rows_inserted: 5,
            }
        );
    }

    #[tokio::test]
    async fn failing_chunk_surfaces_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, FIVE_ROWS);

        let p = pipeline(
            &path,
            2,
            RecordingSink {
                fail_on: Some(1),
                ..Default::default()
            },
        );
        let err = p.run().await.unwrap_err();

        assert!(matches!(err, IngestError::Persistence { chunk: 1, .. }));
        assert_eq!(*p.sink.batches.lock().unwrap(), [2]);
    }

    #[tokio::test]
    async fn missing_timestamp_column_fails_before_any_insert() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "power,voltage\n1.0,230\n2.0,231\n");

        let p = pipeline(&path, 10, RecordingSink::default());
        let err = p.run().await.unwrap_err();

        match err {
            IngestError::Schema { headers, .. } => assert_eq!(headers, ["power", "voltage"]),
            other => panic!("expected schema error, got {other:?}"),
        }
        assert!(p.sink.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fully_invalid_chunk_opens_no_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "time,power\nbad,1\nworse,2\n2024-01-01 00:00,3\n");

        let p = pipeline(&path, 2, RecordingSink::default());
        let report = p.run().await.unwrap();

        assert_eq!(*p.sink.batches.lock().unwrap(), [1]);
        assert_eq!(report.rows_dropped, 2);
        assert_eq!(report.rows_inserted, 1);
    }

    #[tokio::test]
    async fn timestamp_column_option_adds_alias() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "fecha,potencia\n2024-01-01 00:00,1.5\n");

        let options = IngestOptions {
            timestamp_column: "Fecha".to_string(),
            column_overrides: HashMap::from([("potencia".to_string(), ReadingColumn::PowerKw)]),
            ..Default::default()
        };
        let p = Pipeline {
            source: ElectricalCsvFileSource::new(&path, options.chunk_size),
            overrides: options.effective_overrides(),
            system_id: 1,
            sink: RecordingSink::default(),
        };

        assert_eq!(p.run().await.unwrap().rows_inserted, 1);
    }

    #[tokio::test]
    async fn column_override_beats_timestamp_column_of_other_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "fecha,potencia
2024-01-01 00:00,1.5
");

        let options = IngestOptions {
            timestamp_column: "Fecha".to_string(),
            column_overrides: HashMap::from([("fecha".to_string(), ReadingColumn::PowerKw)]),
            ..Default::default()
        };
        let overrides = options.effective_overrides();
        assert_eq!(
            overrides,
            HashMap::from([("fecha".to_string(), ReadingColumn::PowerKw)])
        );

        for _ in 0..20 {
            let p = Pipeline {
                source: ElectricalCsvFileSource::new(&path, options.chunk_size),
                overrides: options.effective_overrides(),
                system_id: 1,
                sink: RecordingSink::default(),
            };
            let err = p.run().await.unwrap_err();
            assert!(matches!(err, IngestError::Schema { .. }), "{err:?}");
        }
    }

    #[tokio::test]
    async fn drops_unparseable_rows_and_stores_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let (db_path, store, system_id) = sqlite_with_system(&dir).await;
        let csv = write_csv(
            &dir,
            "datetime,power,voltage\n\
             2024-03-01T06:00:00,\"0,5\",229.8\n\
             not-a-date,1.0,230\n\
             2024-03-01 06:15,NaN,\n",
        );

        let total = ingest_electrical_csv(&db_path, system_id, &csv, &IngestOptions::default())
            .await
            .unwrap();
        assert_eq!(total, 2);

        let rows = electrical_readings(&store, system_id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, "2024-03-01 06:00:00");
        assert_eq!(rows[0].power_kw, Some(0.5));
        assert_eq!(rows[0].voltage_v, Some(229.8));
        assert_eq!(rows[1].timestamp, "2024-03-01 06:15:00");
        assert_eq!(rows[1].power_kw, None);
        assert_eq!(rows[1].voltage_v, None);
        assert_eq!(rows[1].current_a, None);
        assert_eq!(rows[1].status, None);

        store.close().await;
    }

    #[tokio::test]
    async fn storage_failure_keeps_earlier_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let (db_path, store, system_id) = sqlite_with_system(&dir).await;
        if let Store::Sqlite(pool) = &store {
            sqlx::query(
                r#"
                CREATE TRIGGER reject_third_reading
                BEFORE INSERT ON electrical_data
                WHEN NEW.timestamp = '2024-01-01 00:30:00'
                BEGIN
                    SELECT RAISE(ABORT, 'rejected by test trigger');
                END
                "#,
            )
            .execute(pool)
            .await
            .unwrap();
        }
        let csv = write_csv(&dir, FIVE_ROWS);
        let options = IngestOptions {
            chunk_size: NonZeroUsize::new(2).unwrap(),
            ..Default::default()
        };

        let err = ingest_electrical_csv(&db_path, system_id, &csv, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Persistence { chunk: 1, .. }));

        let rows = electrical_readings(&store, system_id).await.unwrap();
        let stamps: Vec<_> = rows.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(stamps, ["2024-01-01 00:00:00", "2024-01-01 00:15:00"]);

        store.close().await;
    }

    #[tokio::test]
    async fn unknown_system_is_rejected_by_storage() {
        let dir = tempfile::tempdir().unwrap();
        let (db_path, store, system_id) = sqlite_with_system(&dir).await;
        let csv = write_csv(&dir, FIVE_ROWS);

        let err = ingest_electrical_csv(&db_path, system_id + 100, &csv, &IngestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Persistence { chunk: 0, .. }));
        assert_eq!(count_electrical_readings(&store, system_id + 100).await.unwrap(), 0);

        store.close().await;
    }

    #[tokio::test]
    async fn reingesting_duplicates_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (db_path, store, system_id) = sqlite_with_system(&dir).await;
        let csv = write_csv(&dir, FIVE_ROWS);

        for _ in 0..2 {
            ingest_electrical_csv(&db_path, system_id, &csv, &IngestOptions::default())
                .await
                .unwrap();
        }
        assert_eq!(count_electrical_readings(&store, system_id).await.unwrap(), 10);

        store.close().await;
    }

    #[tokio::test]
    async fn unsupported_storage_scheme_is_a_missing_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(&dir, FIVE_ROWS);

        let err = ingest_electrical_csv("mysql://localhost/solar", 1, &csv, &IngestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::DependencyMissing(_)));
    }

    #[tokio::test]
    async fn missing_csv_fails_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("never-created.db");
        let csv = dir.path().join("missing.csv");

        let err = ingest_electrical_csv(
            db_path.to_str().unwrap(),
            1,
            &csv,
            &IngestOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, IngestError::InputNotFound(p) if p == csv));
        assert!(!db_path.exists());
    }
}
