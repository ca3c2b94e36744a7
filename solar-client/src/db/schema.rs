use anyhow::Result;

use super::Store;

const SQLITE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        location TEXT,
        description TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS systems (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        capacity_kw REAL,
        inverter_type TEXT,
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE ON UPDATE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS meteo_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        system_id INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        ghi REAL,       -- global horizontal irradiance (W/m2)
        dni REAL,       -- direct normal irradiance (W/m2)
        dhi REAL,       -- diffuse horizontal irradiance (W/m2)
        temp_c REAL,
        wind_m_s REAL,
        precip_mm REAL,
        source TEXT,
        inserted_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY (system_id) REFERENCES systems(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS electrical_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        system_id INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        power_kw REAL,
        voltage_v REAL,
        current_a REAL,
        energy_kwh REAL,    -- per-interval energy
        status TEXT,
        inserted_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY (system_id) REFERENCES systems(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_systems_project ON systems(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_meteo_system_time ON meteo_data(system_id, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_elec_system_time ON electrical_data(system_id, timestamp)",
];

const POSTGRES_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        location VARCHAR(100),
        description TEXT,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS systems (
        id BIGSERIAL PRIMARY KEY,
        project_id BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE ON UPDATE CASCADE,
        name VARCHAR(100) NOT NULL,
        capacity_kw DOUBLE PRECISION,
        inverter_type TEXT,
        notes TEXT,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS meteo_data (
        id BIGSERIAL PRIMARY KEY,
        system_id BIGINT NOT NULL REFERENCES systems(id) ON DELETE CASCADE,
        timestamp TEXT NOT NULL,
        ghi DOUBLE PRECISION,
        dni DOUBLE PRECISION,
        dhi DOUBLE PRECISION,
        temp_c DOUBLE PRECISION,
        wind_m_s DOUBLE PRECISION,
        precip_mm DOUBLE PRECISION,
        source TEXT,
        inserted_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS electrical_data (
        id BIGSERIAL PRIMARY KEY,
        system_id BIGINT NOT NULL REFERENCES systems(id) ON DELETE CASCADE,
        timestamp TEXT NOT NULL,
        power_kw DOUBLE PRECISION,
        voltage_v DOUBLE PRECISION,
        current_a DOUBLE PRECISION,
        energy_kwh DOUBLE PRECISION,
        status TEXT,
        inserted_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_systems_project ON systems(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_meteo_system_time ON meteo_data(system_id, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_elec_system_time ON electrical_data(system_id, timestamp)",
];

/// Create every table and index if missing. Existing tables are left untouched.
pub async fn create_schema(store: &Store) -> Result<()> {
    match store {
        Store::Sqlite(pool) => {
            for statement in SQLITE_SCHEMA {
                sqlx::query(statement).execute(pool).await?;
            }
        }
        Store::Postgres(pool) => {
            for statement in POSTGRES_SCHEMA {
                sqlx::query(statement).execute(pool).await?;
            }
        }
    }

    Ok(())
}
