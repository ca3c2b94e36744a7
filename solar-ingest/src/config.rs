use serde::Deserialize;
use std::{collections::HashMap, fs, num::NonZeroUsize};

use crate::{
    pipeline::{IngestOptions, DEFAULT_CHUNK_SIZE},
    transform::ReadingColumn,
};

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite file path, `sqlite:` URL or `postgres://` URL.
    pub url: String,
    /// Pool size for the admin binaries. Ingestion always runs on a single
    /// connection since chunks are committed one at a time.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub chunk_size: NonZeroUsize,
    pub timestamp_column: String,
    pub delimiter: char,
    /// CSV header -> target attribute, e.g. `potencia = "power_kw"`.
    pub column_overrides: HashMap<String, ReadingColumn>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            timestamp_column: "timestamp".to_string(),
            delimiter: ',',
            column_overrides: HashMap::new(),
        }
    }
}

impl IngestConfig {
    pub fn options(&self) -> anyhow::Result<IngestOptions> {
        let delimiter = u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| anyhow::anyhow!("ingest.delimiter must be a single ASCII character"))?;

        Ok(IngestOptions {
            timestamp_column: self.timestamp_column.clone(),
            column_overrides: self.column_overrides.clone(),
            chunk_size: self.chunk_size,
            delimiter,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("INGESTION_CONFIG").unwrap_or_else(|_| "ingestion-config.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;

        let mut seen = HashMap::new();
        for alias in cfg.ingest.column_overrides.keys() {
            if let Some(other) = seen.insert(alias.trim().to_lowercase(), alias) {
                anyhow::bail!(
                    "ingest.column_overrides has keys '{other}' and '{alias}' that differ only by case"
                );
            }
        }

        Ok(cfg)
    }
}
