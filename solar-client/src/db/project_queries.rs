use anyhow::Result;

use super::Store;
use crate::domain::{NewProject, NewSystem, Project, System};

/// Insert a project and return its generated id.
pub async fn add_project(store: &Store, project: &NewProject) -> Result<i64> {
    let id = match store {
        Store::Sqlite(pool) => {
            sqlx::query_scalar::<_, i64>(
                "INSERT INTO projects (name, location, description) VALUES (?, ?, ?) RETURNING id",
            )
            .bind(&project.name)
            .bind(&project.location)
            .bind(&project.description)
            .fetch_one(pool)
            .await?
        }
        Store::Postgres(pool) => {
            sqlx::query_scalar::<_, i64>(
                "INSERT INTO projects (name, location, description) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(&project.name)
            .bind(&project.location)
            .bind(&project.description)
            .fetch_one(pool)
            .await?
        }
    };

    Ok(id)
}

/// Insert a system under an existing project and return its generated id.
pub async fn add_system(store: &Store, system: &NewSystem) -> Result<i64> {
    let id = match store {
        Store::Sqlite(pool) => {
            sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO systems (project_id, name, capacity_kw, inverter_type, notes)
                VALUES (?, ?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(system.project_id)
            .bind(&system.name)
            .bind(system.capacity_kw)
            .bind(&system.inverter_type)
            .bind(&system.notes)
            .fetch_one(pool)
            .await?
        }
        Store::Postgres(pool) => {
            sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO systems (project_id, name, capacity_kw, inverter_type, notes)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(system.project_id)
            .bind(&system.name)
            .bind(system.capacity_kw)
            .bind(&system.inverter_type)
            .bind(&system.notes)
            .fetch_one(pool)
            .await?
        }
    };

    Ok(id)
}

pub async fn list_projects(store: &Store) -> Result<Vec<Project>> {
    const SQL: &str = r#"
        SELECT id, name, location, description, CAST(created_at AS TEXT) AS created_at
        FROM projects
        ORDER BY id
    "#;

    let rows = match store {
        Store::Sqlite(pool) => sqlx::query_as::<_, Project>(SQL).fetch_all(pool).await?,
        Store::Postgres(pool) => sqlx::query_as::<_, Project>(SQL).fetch_all(pool).await?,
    };

    Ok(rows)
}

pub async fn list_systems(store: &Store, project_id: i64) -> Result<Vec<System>> {
    let rows = match store {
        Store::Sqlite(pool) => {
            sqlx::query_as::<_, System>(
                r#"
                SELECT id, project_id, name, capacity_kw, inverter_type, notes,
                       CAST(created_at AS TEXT) AS created_at
                FROM systems
                WHERE project_id = ?
                ORDER BY id
                "#,
            )
            .bind(project_id)
            .fetch_all(pool)
            .await?
        }
        Store::Postgres(pool) => {
            sqlx::query_as::<_, System>(
                r#"
                SELECT id, project_id, name, capacity_kw, inverter_type, notes,
                       CAST(created_at AS TEXT) AS created_at
                FROM systems
                WHERE project_id = $1
                ORDER BY id
                "#,
            )
            .bind(project_id)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}
