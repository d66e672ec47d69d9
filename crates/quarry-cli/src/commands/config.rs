use quarry_config::QuarryConfig;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ConfigArgs;
use crate::output::output;

/// Handle `quarry config`.
pub fn handle(args: &ConfigArgs, config: &QuarryConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let redacted = config.redacted();
    if args.toml {
        print!("{}", toml::to_string_pretty(&redacted)?);
        return Ok(());
    }
    output(&redacted, flags.format)
}
