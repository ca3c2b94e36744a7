use anyhow::Result;
use sqlx::{Postgres, QueryBuilder, Sqlite, Transaction};

use super::Store;
use crate::domain::{ElectricalReading, StoredElectricalReading};

/// Upper bound on rows per multi-row INSERT, keeping bound parameters
/// (7 per row) under both backends' limits.
const ROWS_PER_STATEMENT: usize = 500;

const INSERT_ELECTRICAL: &str = "INSERT INTO electrical_data \
    (system_id, timestamp, power_kw, voltage_v, current_a, energy_kwh, status) ";

/// Insert a batch of readings as one transaction.
///
/// Either every row becomes visible or none does: on failure the transaction
/// is rolled back before the error is returned. An empty batch is a no-op and
/// does not open a transaction.
pub async fn insert_electrical_batch(
    store: &Store,
    batch: &[ElectricalReading],
) -> Result<u64, sqlx::Error> {
    if batch.is_empty() {
        return Ok(0);
    }

    let rows = batch
        .iter()
        .map(|r| r.timestamp_text().map(|ts| (r, ts)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    match store {
        Store::Sqlite(pool) => {
            let mut tx = pool.begin().await?;
            match insert_sqlite(&mut tx, &rows).await {
                Ok(inserted) => {
                    tx.commit().await?;
                    Ok(inserted)
                }
                Err(e) => {
                    // The insert error is the one worth reporting.
                    let _ = tx.rollback().await;
                    Err(e)
                }
            }
        }
        Store::Postgres(pool) => {
            let mut tx = pool.begin().await?;
            match insert_postgres(&mut tx, &rows).await {
                Ok(inserted) => {
                    tx.commit().await?;
                    Ok(inserted)
                }
                Err(e) => {
                    let _ = tx.rollback().await;
                    Err(e)
                }
            }
        }
    }
}

async fn insert_sqlite(
    tx: &mut Transaction<'_, Sqlite>,
    rows: &[(&ElectricalReading, String)],
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;

    for part in rows.chunks(ROWS_PER_STATEMENT) {
        let mut builder = QueryBuilder::<Sqlite>::new(INSERT_ELECTRICAL);
        builder.push_values(part, |mut b, (r, ts)| {
            b.push_bind(r.system_id)
                .push_bind(ts.clone())
                .push_bind(r.power_kw)
                .push_bind(r.voltage_v)
                .push_bind(r.current_a)
                .push_bind(r.energy_kwh)
                .push_bind(r.status.clone());
        });

        inserted += builder.build().execute(&mut **tx).await?.rows_affected();
    }

    Ok(inserted)
}

async fn insert_postgres(
    tx: &mut Transaction<'_, Postgres>,
    rows: &[(&ElectricalReading, String)],
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;

    for part in rows.chunks(ROWS_PER_STATEMENT) {
        let mut builder = QueryBuilder::<Postgres>::new(INSERT_ELECTRICAL);
        builder.push_values(part, |mut b, (r, ts)| {
            b.push_bind(r.system_id)
                .push_bind(ts.clone())
                .push_bind(r.power_kw)
                .push_bind(r.voltage_v)
                .push_bind(r.current_a)
                .push_bind(r.energy_kwh)
                .push_bind(r.status.clone());
        });

        inserted += builder.build().execute(&mut **tx).await?.rows_affected();
    }

    Ok(inserted)
}

/// All readings of a system in time order.
pub async fn electrical_readings(
    store: &Store,
    system_id: i64,
) -> Result<Vec<StoredElectricalReading>> {
    let rows = match store {
        Store::Sqlite(pool) => {
            sqlx::query_as::<_, StoredElectricalReading>(
                r#"
                SELECT
                    id,
                    system_id,
                    timestamp,
                    power_kw,
                    voltage_v,
                    current_a,
                    energy_kwh,
                    status,
                    CAST(inserted_at AS TEXT) AS inserted_at
                FROM electrical_data
                WHERE system_id = ?
                ORDER BY timestamp, id
                "#,
            )
            .bind(system_id)
            .fetch_all(pool)
            .await?
        }
        Store::Postgres(pool) => {
            sqlx::query_as::<_, StoredElectricalReading>(
                r#"
                SELECT
                    id,
                    system_id,
                    timestamp,
                    power_kw,
                    voltage_v,
                    current_a,
                    energy_kwh,
                    status,
                    CAST(inserted_at AS TEXT) AS inserted_at
                FROM electrical_data
                WHERE system_id = $1
                ORDER BY timestamp, id
                "#,
            )
            .bind(system_id)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}

pub async fn count_electrical_readings(store: &Store, system_id: i64) -> Result<i64> {
    let count = match store {
        Store::Sqlite(pool) => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM electrical_data WHERE system_id = ?")
                .bind(system_id)
                .fetch_one(pool)
                .await?
        }
        Store::Postgres(pool) => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM electrical_data WHERE system_id = $1")
                .bind(system_id)
                .fetch_one(pool)
                .await?
        }
    };

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        project_queries::{add_project, add_system},
        schema::create_schema,
        StorageTarget,
    };
    use crate::domain::{NewProject, NewSystem};
    use time::macros::datetime;

    async fn store_with_system(dir: &tempfile::TempDir) -> (Store, i64) {
        let path = dir.path().join("solar.db");
        let target = StorageTarget::parse(path.to_str().unwrap()).unwrap();
        let store = Store::connect(&target, 1).await.unwrap();
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
                capacity_kw: Some(3000.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        (store, system_id)
    }

    fn reading(system_id: i64, minute: u8, power_kw: Option<f64>) -> ElectricalReading {
        ElectricalReading {
            system_id,
            ts: datetime!(2024-06-01 12:00:00) + time::Duration::minutes(i64::from(minute)),
            power_kw,
            voltage_v: Some(400.0),
            current_a: None,
            energy_kwh: None,
            status: Some("ok".to_string()),
        }
    }

    #[tokio::test]
    async fn batch_insert_is_readable_in_time_order() {
        let dir = tempfile::tempdir().unwrap();
        let (store, system_id) = store_with_system(&dir).await;

        let batch = vec![
            reading(system_id, 15, Some(2.5)),
            reading(system_id, 0, None),
        ];
        let inserted = insert_electrical_batch(&store, &batch).await.unwrap();
        assert_eq!(inserted, 2);

        let rows = electrical_readings(&store, system_id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, "2024-06-01 12:00:00");
        assert_eq!(rows[0].power_kw, None);
        assert_eq!(rows[1].timestamp, "2024-06-01 12:15:00");
        assert_eq!(rows[1].power_kw, Some(2.5));
        assert_eq!(rows[1].status.as_deref(), Some("ok"));
        assert!(!rows[1].inserted_at.is_empty());

        store.close().await;
    }

    #[tokio::test]
    async fn failed_batch_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let (store, system_id) = store_with_system(&dir).await;

        // The second row references a system that does not exist.
        let batch = vec![reading(system_id, 0, Some(1.0)), reading(9_999, 5, Some(1.0))];
        let res = insert_electrical_batch(&store, &batch).await;
        assert!(res.is_err());

        assert_eq!(count_electrical_readings(&store, system_id).await.unwrap(), 0);
        store.close().await;
    }

    #[tokio::test]
    async fn large_batch_spans_several_statements() {
        let dir = tempfile::tempdir().unwrap();
        let (store, system_id) = store_with_system(&dir).await;

        let batch: Vec<_> = (0..(ROWS_PER_STATEMENT * 2 + 7))
            .map(|i| reading(system_id, (i % 60) as u8, Some(i as f64)))
            .collect();
        let inserted = insert_electrical_batch(&store, &batch).await.unwrap();

        assert_eq!(inserted as usize, batch.len());
        assert_eq!(
            count_electrical_readings(&store, system_id).await.unwrap() as usize,
            batch.len()
        );
        store.close().await;
    }

    #[tokio::test]
    async fn empty_batch_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_with_system(&dir).await;

        assert_eq!(insert_electrical_batch(&store, &[]).await.unwrap(), 0);
        store.close().await;
    }
}
