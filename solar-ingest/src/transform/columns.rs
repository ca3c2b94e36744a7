use std::{collections::HashMap, fmt, str::FromStr};

use serde::Deserialize;

/// Target attribute of an `electrical_data` row that a CSV column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingColumn {
    Timestamp,
    PowerKw,
    VoltageV,
    CurrentA,
    EnergyKwh,
    Status,
}

impl ReadingColumn {
    pub const ALL: [ReadingColumn; 6] = [
        Self::Timestamp,
        Self::PowerKw,
        Self::VoltageV,
        Self::CurrentA,
        Self::EnergyKwh,
        Self::Status,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::PowerKw => "power_kw",
            Self::VoltageV => "voltage_v",
            Self::CurrentA => "current_a",
            Self::EnergyKwh => "energy_kwh",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for ReadingColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown reading column '{0}'")]
pub struct UnknownColumn(pub String);

impl FromStr for ReadingColumn {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

/// Header aliases recognised without any configuration.
pub fn default_aliases() -> HashMap<String, ReadingColumn> {
    use ReadingColumn::*;

    [
        ("timestamp", Timestamp),
        ("time", Timestamp),
        ("datetime", Timestamp),
        ("power_kw", PowerKw),
        ("power_kw_avg", PowerKw),
        ("power", PowerKw),
        ("voltage_v", VoltageV),
        ("voltage", VoltageV),
        ("current_a", CurrentA),
        ("current", CurrentA),
        ("energy_kwh", EnergyKwh),
        ("energy", EnergyKwh),
        ("status", Status),
    ]
    .into_iter()
    .map(|(alias, column)| (alias.to_string(), column))
    .collect()
}

/// Source column positions that feed each target attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: Vec<(usize, ReadingColumn)>,
}

impl ColumnMapping {
    /// Position of the source column for `target`. When several headers
    /// resolve to the same target the rightmost one is used.
    pub fn index_of(&self, target: ReadingColumn) -> Option<usize> {
        self.columns
            .iter()
            .rev()
            .find(|(_, c)| *c == target)
            .map(|(idx, _)| *idx)
    }
}

impl FromIterator<(usize, ReadingColumn)> for ColumnMapping {
    fn from_iter<T: IntoIterator<Item = (usize, ReadingColumn)>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Resolve CSV headers against the alias table.
///
/// Overrides are merged over `defaults` and win on conflict. Lookup is
/// case-insensitive on the trimmed header; a header that already names a
/// target attribute passes through, anything else is dropped.
///
/// Override keys that differ only by case are applied in sorted key order,
/// so the last one in that order wins.
pub fn resolve_columns(
    headers: &[String],
    defaults: &HashMap<String, ReadingColumn>,
    overrides: &HashMap<String, ReadingColumn>,
) -> ColumnMapping {
    let mut effective = fold_aliases(defaults);
    effective.extend(fold_aliases(overrides));

    headers
        .iter()
        .enumerate()
        .filter_map(|(idx, header)| {
            let key = header.trim().to_lowercase();
            effective
                .get(&key)
                .copied()
                .or_else(|| key.parse().ok())
                .map(|column| (idx, column))
        })
        .collect()
}

/// Alias table keyed by trimmed, lowercased alias.
pub(crate) fn fold_aliases(
    aliases: &HashMap<String, ReadingColumn>,
) -> HashMap<String, ReadingColumn> {
    let mut sorted: Vec<_> = aliases.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    sorted
        .into_iter()
        .map(|(alias, column)| (alias.trim().to_lowercase(), *column))
        .collect()
}
