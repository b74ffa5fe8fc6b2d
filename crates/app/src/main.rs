use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;

use stocktake_app::console::Console;
use stocktake_app::{AppConfig, SessionController};
use stocktake_infra::{ReconciliationEngine, SqliteInventoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    stocktake_observability::init(config.log_format);

    tracing::info!(
        db = %config.db_path.display(),
        export_dir = %config.export_dir.display(),
        persistence = ?config.persistence,
        "starting stocktake"
    );

    let store = Arc::new(SqliteInventoryStore::new(&config.db_path));
    store
        .open()
        .await
        .with_context(|| format!("failed to open inventory store at {}", config.db_path.display()))?;

    let engine = ReconciliationEngine::with_mode(store.clone(), config.persistence);
    let mut session = SessionController::new(engine, &config.export_dir);
    let restored = session.load().await.context("failed to load saved inventory")?;
    tracing::info!(items = restored, "session restored");

    let console = Console::new(session, BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    let session = console.run().await.context("console i/o failed")?;

    session.shutdown().await;
    store.close().await;
    Ok(())
}
