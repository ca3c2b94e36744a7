use anyhow::Result;
use solar_client::{
    db::project_queries::{list_projects, list_systems},
    StorageTarget, Store,
};
use solar_ingest::{config::AppConfig, observability};

/// Print every project with its systems, one JSON object per line.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let target = StorageTarget::parse(&cfg.storage.url)?;
    let store = Store::connect(&target, cfg.storage.max_connections).await?;

    for project in list_projects(&store).await? {
        let systems = list_systems(&store, project.id).await?;
        let line = serde_json::json!({ "project": project, "systems": systems });
        println!("{line}");
    }

    store.close().await;
    Ok(())
}
