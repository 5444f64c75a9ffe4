//! Host-generic runner behind the exported `ScrollSentinel`.
//!
//! Keeps the JS boundary thin: config arrives as JSON, errors leave as
//! strings, stats leave as JSON. Native tests drive it with the lab host.

use std::rc::Rc;

use sentinel_core::host::{IntersectionHost, MutationHost};
use sentinel_core::stats::StatsSnapshot;
use sentinel_core::{Result, ScrollTrigger, SentinelConfig};
use tracing::info;

pub struct RunnerCore<H>
where
    H: IntersectionHost + MutationHost + 'static,
{
    trigger: ScrollTrigger<H>,
}

impl<H> RunnerCore<H>
where
    H: IntersectionHost + MutationHost + 'static,
{
    /// Parse `config_json` (blank means defaults) and start the trigger.
    pub fn start(host: Rc<H>, config_json: &str, notify: impl Fn(&str) + 'static) -> Result<Self> {
        let config = SentinelConfig::from_json(config_json)?;
        let trigger = ScrollTrigger::start(host, config, notify)?;
        info!(
            marker_selector = %trigger.config().marker_selector,
            container_selector = %trigger.config().container_selector,
            observed = trigger.observed_count(),
            "scroll sentinel started"
        );
        Ok(Self { trigger })
    }

    pub fn rearm(&self) -> Result<usize> {
        self.trigger.rearm()
    }

    #[must_use]
    pub fn observed_count(&self) -> usize {
        self.trigger.observed_count()
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.trigger.stats()
    }

    #[must_use]
    pub fn stats_json(&self) -> String {
        self.stats().to_json()
    }

    #[must_use]
    pub fn config_json(&self) -> String {
        self.trigger.config().to_json()
    }
}
