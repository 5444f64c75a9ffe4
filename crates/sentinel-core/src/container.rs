//! Container mutation watcher.
//!
//! Watches the direct children of one content container and invokes a
//! callback once per delivered child-list batch. The host coalesces rapid
//! DOM changes, so N insertions delivered together yield one callback.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::batch::MutationBatch;
use crate::error::{Result, SentinelError};
use crate::host::MutationHost;
use crate::stats::TriggerStats;

pub struct ContainerWatcher<H: MutationHost> {
    _observer: H::Registration,
}

impl<H: MutationHost> ContainerWatcher<H> {
    /// Observe `container` for child-list changes.
    pub fn watch(
        host: &H,
        container: &H::Element,
        stats: Rc<TriggerStats>,
        mut on_mutation: impl FnMut() + 'static,
    ) -> Result<Self> {
        let observer = host.observe_children(
            container,
            Box::new(move |batch: MutationBatch| {
                debug!(
                    records = batch.records().len(),
                    added = batch.added_nodes(),
                    removed = batch.removed_nodes(),
                    "mutation observed"
                );
                stats.record_mutation_batch();
                on_mutation();
            }),
        )?;
        Ok(Self {
            _observer: observer,
        })
    }

    /// Resolve the container by selector, then [`watch`](Self::watch) it.
    ///
    /// A missing container is fatal: without it nothing re-arms the
    /// proximity watcher.
    pub fn watch_selector(
        host: &H,
        selector: &str,
        stats: Rc<TriggerStats>,
        on_mutation: impl FnMut() + 'static,
    ) -> Result<Self> {
        let container = host
            .query_one(selector)?
            .ok_or_else(|| SentinelError::container_not_found(selector))?;
        Self::watch(host, &container, stats, on_mutation)
    }
}

impl<H: MutationHost> fmt::Debug for ContainerWatcher<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerWatcher").finish_non_exhaustive()
    }
}
