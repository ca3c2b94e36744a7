pub mod config;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{ingest_electrical_csv, IngestError, IngestOptions, IngestReport, Pipeline};
