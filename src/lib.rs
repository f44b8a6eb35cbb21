pub mod config;
pub mod output;
pub mod ping;
pub mod probe;
pub mod probe_engine;
pub mod probe_result;
pub mod reporter;
pub mod store;
pub mod web;

pub use probe_engine::{probe_site, run_all, ProbeEngine};
pub use probe_result::{CheckResult, Status};
pub use store::{AddOutcome, Method, ProxyConfig, Site, Store};
