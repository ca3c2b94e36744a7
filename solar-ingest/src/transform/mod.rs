pub mod columns;
pub mod values;

use csv::StringRecord;
use solar_client::domain::ElectricalReading;

pub use columns::{default_aliases, resolve_columns, ColumnMapping, ReadingColumn, UnknownColumn};
pub use values::{parse_optional_number, parse_optional_text, parse_timestamp};

/// Readings that survived cleaning for one chunk, plus how many rows were
/// dropped for an unparseable timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedBatch {
    pub readings: Vec<ElectricalReading>,
    pub dropped: usize,
}

/// Turns raw CSV records into `ElectricalReading`s for one system.
#[derive(Debug, Clone)]
pub struct ReadingCleaner {
    system_id: i64,
    timestamp: usize,
    power_kw: Option<usize>,
    voltage_v: Option<usize>,
    current_a: Option<usize>,
    energy_kwh: Option<usize>,
    status: Option<usize>,
}

impl ReadingCleaner {
    /// Returns `None` when no column resolved to `timestamp`.
    pub fn new(mapping: &ColumnMapping, system_id: i64) -> Option<Self> {
        Some(Self {
            system_id,
            timestamp: mapping.index_of(ReadingColumn::Timestamp)?,
            power_kw: mapping.index_of(ReadingColumn::PowerKw),
            voltage_v: mapping.index_of(ReadingColumn::VoltageV),
            current_a: mapping.index_of(ReadingColumn::CurrentA),
            energy_kwh: mapping.index_of(ReadingColumn::EnergyKwh),
            status: mapping.index_of(ReadingColumn::Status),
        })
    }

    /// Clean one record. `None` means the row has no usable timestamp.
    ///
    /// Missing cells (short rows, unmapped attributes) are absent values.
    pub fn clean_record(&self, record: &StringRecord) -> Option<ElectricalReading> {
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i));
        let number = |idx: Option<usize>| cell(idx).and_then(parse_optional_number);

        let ts = record.get(self.timestamp).and_then(parse_timestamp)?;

        Some(ElectricalReading {
            system_id: self.system_id,
            ts,
            power_kw: number(self.power_kw),
            voltage_v: number(self.voltage_v),
            current_a: number(self.current_a),
            energy_kwh: number(self.energy_kwh),
            status: cell(self.status).and_then(parse_optional_text),
        })
    }

    /// Clean a chunk, preserving row order.
    pub fn clean(&self, records: &[StringRecord]) -> CleanedBatch {
        let mut batch = CleanedBatch {
            readings: Vec::with_capacity(records.len()),
            dropped: 0,
        };

        for record in records {
            match self.clean_record(record) {
                Some(reading) => batch.readings.push(reading),
                None => batch.dropped += 1,
            }
        }

        if batch.dropped > 0 {
            metrics::counter!("electrical_csv_rows_dropped_total").increment(batch.dropped as u64);
        }

        batch
    }
}
