use anyhow::Context;
use quarry_config::QuarryConfig;
use quarry_pipeline::Service;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: Service,
}

impl AppContext {
    pub fn init(config: QuarryConfig) -> anyhow::Result<Self> {
        let service = Service::from_config(config).context("failed to initialize the pipeline")?;
        Ok(Self { service })
    }
}
