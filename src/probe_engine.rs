use crate::probe::{check_http, check_ping, check_tcp};
use crate::probe_result::CheckResult;
use crate::reporter::ProbeReporter;
use crate::store::{Method, ProxyConfig, Site};
use chrono::Utc;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Probes one site with the strategy its method selects.
///
/// Unknown methods are probed as HTTP.
pub async fn probe_site(site: &Site, proxy: &ProxyConfig) -> CheckResult {
    let started = Utc::now();

    let outcome = match &site.method {
        Method::Http | Method::Https => check_http(&site.target, proxy).await,
        Method::Tcp => check_tcp(&site.target, proxy).await,
        Method::Ping => check_ping(&site.target).await,
        Method::Other(raw) => {
            debug!("Unknown method {:?} for site {}, using http", raw, site.id);
            check_http(&site.target, proxy).await
        }
    };

    match outcome {
        Ok(latency) => CheckResult::from_success(site, started, latency),
        Err(e) => CheckResult::from_error(site, started, &e),
    }
}

/// Probes every site concurrently, one task per site.
///
/// The returned list has one result per site, in the same order as `sites`.
pub async fn run_all(sites: &[Site], proxy: &ProxyConfig) -> Vec<CheckResult> {
    run_with(sites, proxy, |site, proxy| async move {
        probe_site(&site, &proxy).await
    })
    .await
}

/// Spawns `check` once per site and joins the tasks in input order.
///
/// A task that panics still yields a `down` result, stamped with the time
/// its task was spawned.
async fn run_with<F, Fut>(sites: &[Site], proxy: &ProxyConfig, check: F) -> Vec<CheckResult>
where
    F: Fn(Site, Arc<ProxyConfig>) -> Fut,
    Fut: Future<Output = CheckResult> + Send + 'static,
{
    let proxy = Arc::new(proxy.clone());

    let (spawned_at, handles): (Vec<_>, Vec<_>) = sites
        .iter()
        .cloned()
        .map(|site| (Utc::now(), tokio::spawn(check(site, Arc::clone(&proxy)))))
        .unzip();

    join_all(handles)
        .await
        .into_iter()
        .zip(sites.iter().zip(spawned_at))
        .map(|(joined, (site, started))| {
            joined.unwrap_or_else(|e| {
                error!("Probe task for site {} failed: {}", site.id, e);
                CheckResult::down(site, started, Duration::ZERO, e.to_string())
            })
        })
        .collect()
}

pub struct ProbeEngine {
    reporters: Vec<Box<dyn ProbeReporter>>,
}

impl ProbeEngine {
    pub fn new() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn register_reporter(&mut self, reporter: Box<dyn ProbeReporter>) -> &mut Self {
        self.reporters.push(reporter);
        self
    }

    /// Runs one batch and hands the results to every reporter.
    pub async fn run(&self, sites: &[Site], proxy: &ProxyConfig) -> Vec<CheckResult> {
        let start_time = Instant::now();
        let results = run_all(sites, proxy).await;
        let elapsed = start_time.elapsed();

        let up_count = results.iter().filter(|r| r.is_up()).count();
        info!(
            "Probe completed in {:.2}s - {}/{} sites up",
            elapsed.as_secs_f64(),
            up_count,
            results.len()
        );

        self.notify_reporters(sites, &results).await;
        results
    }

    async fn notify_reporters(&self, sites: &[Site], results: &[CheckResult]) {
        for reporter in &self.reporters {
            if let Err(e) = reporter.report(sites, results).await {
                error!("Reporter '{}' failed: {}", reporter.name(), e);
            }
        }
    }
}

impl Default for ProbeEngine {
    fn default() -> Self {
        Self::new()
    }
}
