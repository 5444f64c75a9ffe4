#![forbid(unsafe_code)]

//! Scroll trigger: a proximity watcher re-armed by a container watcher.
//!
//! # Data flow
//!
//! ```text
//! container child-list batch ──▶ ProximityWatcher::rearm
//!                                      │
//! intersection batch ──▶ dedup ──▶ on_visible(id) ──▶ consumer
//! ```
//!
//! # Failure Modes
//!
//! - **Container missing at start**: [`ScrollTrigger::start`] returns
//!   [`SentinelError::ContainerNotFound`] and nothing stays registered.
//! - **Re-arm fails inside a mutation callback**: logged at `WARN` and
//!   counted in [`StatsSnapshot::failed_rearms`]. The previous registration
//!   keeps running.
//! - **Trigger dropped**: both host observers disconnect. The mutation
//!   handler only holds a weak reference to the proximity watcher, so no
//!   reference cycle runs through the host.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::config::SentinelConfig;
use crate::container::ContainerWatcher;
use crate::error::{Result, SentinelError};
use crate::host::{IntersectionHost, MutationHost};
use crate::proximity::{OnVisible, ProximityWatcher};
use crate::stats::{StatsSnapshot, TriggerStats};

pub struct ScrollTrigger<H>
where
    H: IntersectionHost + MutationHost,
{
    config: SentinelConfig,
    stats: Rc<TriggerStats>,
    proximity: Rc<RefCell<ProximityWatcher<H>>>,
    _container: ContainerWatcher<H>,
}

impl<H> ScrollTrigger<H>
where
    H: IntersectionHost + MutationHost + 'static,
{
    /// Install the proximity watcher on the marker selector and re-arm it on
    /// every child-list batch of the container.
    pub fn start(
        host: Rc<H>,
        config: SentinelConfig,
        on_visible: impl Fn(&str) + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let container = MutationHost::query_one(&*host, &config.container_selector)?
            .ok_or_else(|| SentinelError::container_not_found(&config.container_selector))?;

        let stats = Rc::new(TriggerStats::default());
        let on_visible: OnVisible = Rc::new(on_visible);
        let mut watcher =
            ProximityWatcher::new(Rc::clone(&host), config.root_margin).with_stats(Rc::clone(&stats));
        watcher.install(&config.marker_selector, on_visible)?;
        let proximity = Rc::new(RefCell::new(watcher));

        let container = ContainerWatcher::watch(
            &*host,
            &container,
            Rc::clone(&stats),
            rearm_on_mutation(Rc::downgrade(&proximity), Rc::clone(&stats)),
        )?;

        Ok(Self {
            config,
            stats,
            proximity,
            _container: container,
        })
    }

    /// Re-arm immediately, outside of any mutation batch.
    pub fn rearm(&self) -> Result<usize> {
        self.proximity.borrow_mut().rearm()
    }

    #[must_use]
    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    #[must_use]
    pub fn observed_count(&self) -> usize {
        self.proximity.borrow().observed().len()
    }

    #[must_use]
    pub fn observed(&self) -> Vec<<H as IntersectionHost>::Element> {
        self.proximity.borrow().observed().to_vec()
    }
}

impl<H> fmt::Debug for ScrollTrigger<H>
where
    H: IntersectionHost + MutationHost,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollTrigger")
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

fn rearm_on_mutation<H>(
    proximity: Weak<RefCell<ProximityWatcher<H>>>,
    stats: Rc<TriggerStats>,
) -> impl FnMut() + 'static
where
    H: IntersectionHost + 'static,
{
    move || {
        let Some(proximity) = proximity.upgrade() else {
            return;
        };
        let Ok(mut watcher) = proximity.try_borrow_mut() else {
            warn!("proximity watcher busy; skipping re-arm");
            stats.record_failed_rearm();
            return;
        };
        if let Err(err) = watcher.rearm() {
            warn!(error = %err, "sentinel re-arm failed; keeping previous registration");
            stats.record_failed_rearm();
        }
    }
}
