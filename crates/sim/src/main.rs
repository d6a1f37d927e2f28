//! Replays the restock lifecycle of a single product against in-memory
//! collaborators and a manual clock, logging every step.
//!
//! Configuration comes from the `RESTOCK_*` environment variables; set
//! `RESTOCK_LOG_FORMAT=pretty` for readable output.

mod scenario;

use restock_infra::RestockConfig;

fn main() -> anyhow::Result<()> {
    let config = RestockConfig::from_env()?;
    restock_observability::init_with(&config.observability);

    let summary = scenario::run(&config)?;
    tracing::info!(summary = %serde_json::to_string(&summary)?, "scenario finished");
    Ok(())
}
