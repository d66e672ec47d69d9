use std::io::Write;

use anyhow::Context;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::StoreCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `quarry store`.
pub async fn handle(
    action: &StoreCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let store = ctx.service.store();
    match action {
        StoreCommands::Ls { prefix } => {
            let objects = store.list(prefix.as_deref().unwrap_or_default()).await?;
            output(&objects, flags.format)
        }
        StoreCommands::Cat { key } => {
            let object = store
                .read(key)
                .await
                .with_context(|| format!("failed to read '{key}'"))?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&object.bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}
