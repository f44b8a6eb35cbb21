use crate::probe_result::CheckResult;
use crate::store::Site;
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Receives the results of each batch. `results[i]` belongs to `sites[i]`.
#[async_trait]
pub trait ProbeReporter: Send + Sync {
    async fn report(&self, sites: &[Site], results: &[CheckResult]) -> Result<()>;

    fn name(&self) -> &str;
}

/// Logs one line per site.
pub struct LogReporter;

#[async_trait]
impl ProbeReporter for LogReporter {
    async fn report(&self, sites: &[Site], results: &[CheckResult]) -> Result<()> {
        for (site, result) in sites.iter().zip(results) {
            if result.is_up() {
                debug!(
                    "{} ({} {}) up in {}ms",
                    site.name,
                    site.method,
                    site.target,
                    result.latency_ms()
                );
            } else {
                warn!(
                    "{} ({} {}) down: {}",
                    site.name, site.method, site.target, result.message
                );
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
