use time::{macros::format_description, PrimitiveDateTime};

/// One electrical sample for a system, as produced by ingestion.
///
/// The timestamp is always a parsed calendar value; rows whose time could not
/// be parsed never become an `ElectricalReading`.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectricalReading {
    pub system_id: i64,
    pub ts: PrimitiveDateTime,
    pub power_kw: Option<f64>,
    pub voltage_v: Option<f64>,
    pub current_a: Option<f64>,
    pub energy_kwh: Option<f64>,
    pub status: Option<String>,
}

impl ElectricalReading {
    /// Text stored in the `timestamp` column (`YYYY-MM-DD HH:MM:SS`).
    pub fn timestamp_text(&self) -> Result<String, time::error::Format> {
        self.ts
            .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
    }
}

/// A row of `electrical_data` as read back from storage.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StoredElectricalReading {
    pub id: i64,
    pub system_id: i64,
    pub timestamp: String,
    pub power_kw: Option<f64>,
    pub voltage_v: Option<f64>,
    pub current_a: Option<f64>,
    pub energy_kwh: Option<f64>,
    pub status: Option<String>,
    pub inserted_at: String,
}
