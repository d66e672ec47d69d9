use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

/// Handle `quarry run`: serve until Ctrl-C.
pub async fn handle(ctx: &AppContext) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("shutdown requested"),
            Err(error) => tracing::error!(%error, "failed to listen for Ctrl-C, shutting down"),
        }
        shutdown.cancel();
    });

    ctx.service.run(cancel).await.context("pipeline stopped with an error")
}
