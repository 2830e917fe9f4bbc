#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use parking_lot::RwLock;
    use scout_toolkit::{
        ActivityCatalog, InMemoryProgramStore, ProgramStore, ToolkitConfig, http_api,
        load_catalog_from_json,
    };
    use tracing_subscriber::EnvFilter;

    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scout_toolkit=info")),
        )
        .init();

    let config = ToolkitConfig::from_env()?;

    let catalog = match &config.catalog {
        Some(path) => ActivityCatalog::from_activities(load_catalog_from_json(path)?),
        None => ActivityCatalog::new(),
    };
    tracing::info!(activities = catalog.len(), "catalogue loaded");

    let store: Arc<dyn ProgramStore + Send + Sync> = match &config.database {
        #[cfg(feature = "sqlite")]
        Some(path) => Arc::new(scout_toolkit::SqliteProgramStore::new(path)?),
        #[cfg(not(feature = "sqlite"))]
        Some(_) => {
            tracing::warn!("built without the `sqlite` feature; programs are kept in memory");
            Arc::new(InMemoryProgramStore::new())
        }
        None => Arc::new(InMemoryProgramStore::new()),
    };

    let state = http_api::AppState::with_shared(
        Arc::new(RwLock::new(catalog)),
        store,
        Arc::new(config.access_policy()),
    )
    .with_default_language(config.default_language);

    println!("scout-toolkit HTTP API listening on http://{}", config.http_addr);
    http_api::serve(config.http_addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
