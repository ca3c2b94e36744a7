use solar_client::{db::electrical_queries::insert_electrical_batch, domain::ElectricalReading, Store};

use crate::pipeline::Sink;

/// Writes each batch to `electrical_data` in its own transaction.
pub struct ElectricalStoreSink {
    store: Store,
}

impl ElectricalStoreSink {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Sink for ElectricalStoreSink {
    async fn write_batch(&self, batch: &[ElectricalReading]) -> Result<u64, sqlx::Error> {
        match insert_electrical_batch(&self.store, batch).await {
            Ok(inserted) => Ok(inserted),
            Err(e) => {
                tracing::error!(error = %e, rows = batch.len(), "electrical batch rolled back");
                metrics::counter!("electrical_sink_errors_total").increment(1);
                Err(e)
            }
        }
    }
}
