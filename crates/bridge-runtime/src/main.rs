use anyhow::Result;
use bridge_runtime::{init_tracing, load_config, BridgeRuntime};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = load_config();
    let mut runtime = BridgeRuntime::new(config).await?;
    runtime.start().await?;

    info!("Bridge is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
