use anyhow::Context;
use quarry_config::QuarryConfig;

use crate::cli::GlobalFlags;

/// Load `.env`, then the layered configuration, and validate it.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<QuarryConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded dotenv file"),
        Err(error) if error.not_found() => {}
        Err(error) => return Err(error).context("failed to load .env file"),
    }

    let config = QuarryConfig::load_from(flags.config.as_deref())
        .context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}
