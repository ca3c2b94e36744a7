use anyhow::Result;
use solar_client::{
    db::{
        project_queries::{add_project, add_system},
        schema::create_schema,
    },
    domain::{NewProject, NewSystem},
    StorageTarget, Store,
};
use solar_ingest::{config::AppConfig, observability};
use std::env;

/// Create the solar schema; `--seed` also adds a sample project with two
/// systems and prints their ids.
///
/// Usage:
///   init_solar_db [--seed]
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let seed = env::args().skip(1).any(|a| a == "--seed");
    let cfg = AppConfig::load()?;

    let target = StorageTarget::parse(&cfg.storage.url)?;
    let store = Store::connect(&target, cfg.storage.max_connections).await?;

    create_schema(&store).await?;
    tracing::info!(storage = %cfg.storage.url, "schema ready");

    if seed {
        let project_id = add_project(
            &store,
            &NewProject {
                name: "Parque Solar Ejemplo".to_string(),
                location: Some("La Guajira, CO".to_string()),
                description: Some("Proyecto piloto 5 MW".to_string()),
            },
        )
        .await?;

        let north = add_system(
            &store,
            &NewSystem {
                project_id,
                name: "Array Norte".to_string(),
                capacity_kw: Some(3000.0),
                inverter_type: Some("String".to_string()),
                notes: Some("Orientación N".to_string()),
            },
        )
        .await?;
        let south = add_system(
            &store,
            &NewSystem {
                project_id,
                name: "Array Sur".to_string(),
                capacity_kw: Some(2000.0),
                inverter_type: Some("Central".to_string()),
                notes: Some("Orientación S".to_string()),
            },
        )
        .await?;

        tracing::info!(project_id, north, south, "sample project created");
        println!("project {project_id}: systems {north}, {south}");
    }

    store.close().await;
    Ok(())
}
