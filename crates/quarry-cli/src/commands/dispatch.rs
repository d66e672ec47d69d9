use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Run => commands::run::handle(ctx).await,
        Commands::Sync(args) => commands::sync::handle(&args, ctx, flags).await,
        Commands::Analyze => commands::analyze::handle(ctx, flags).await,
        Commands::Status => commands::status::handle(ctx, flags).await,
        Commands::Store { action } => commands::store::handle(&action, ctx, flags).await,
        Commands::Config(args) => commands::config::handle(&args, ctx.service.config(), flags),
    }
}
