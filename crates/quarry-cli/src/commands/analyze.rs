use anyhow::Context;

use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

/// Handle `quarry analyze`.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let record = ctx.service.analyze().await.context("analytics failed")?;
    output(&record, flags.format)
}
