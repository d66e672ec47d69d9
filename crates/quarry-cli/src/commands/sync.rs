use quarry_pipeline::Settlement;
use quarry_sync::SyncReport;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SyncArgs;
use crate::context::AppContext;
use crate::output::output;

#[derive(Serialize)]
struct SyncResponse {
    report: SyncReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    analytics: Option<Vec<Settlement>>,
}

/// Handle `quarry sync`.
pub async fn handle(args: &SyncArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let report = ctx.service.sync(args.only).await?;
    let analytics = if args.analyze {
        Some(ctx.service.drain_queue().await)
    } else {
        None
    };

    let pending = ctx.service.pending_triggers().await;
    if pending > 0 {
        tracing::warn!(
            pending,
            "unprocessed analytics triggers are dropped on exit; \
             pass --analyze or run `quarry analyze` against the stored snapshots"
        );
    }

    let failed = !report.is_success();
    let nacked = analytics
        .as_ref()
        .is_some_and(|settled| settled.contains(&Settlement::Nacked));
    output(&SyncResponse { report, analytics }, flags.format)?;

    if failed {
        anyhow::bail!("sync finished with failures");
    }
    if nacked {
        anyhow::bail!("analytics failed for at least one trigger");
    }
    Ok(())
}
