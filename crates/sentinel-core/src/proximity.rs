#![forbid(unsafe_code)]

//! Proximity watcher: one live intersection registration over every marker.
//!
//! # Invariants
//!
//! 1. After [`install`](ProximityWatcher::install) returns `Ok`, the observed
//!    set equals the host's query result for the selector at that instant.
//! 2. Installation fully replaces the previous registration. The old host
//!    observer is dropped (disconnected) only after the new one exists, so a
//!    failed install leaves the previous registration in place.
//! 3. At most one registration is live per watcher, so a physical marker is
//!    never reported twice within one batch.
//! 4. Each batch notifies once per unique intersecting identifier, in
//!    first-seen order (see [`ObservationBatch::visible_ids`]).
//!
//! Duplicates across batches are passed through. A marker that scrolls out
//! and back in, or that is still near the viewport when the watcher
//! re-arms, is reported again.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::batch::ObservationBatch;
use crate::error::Result;
use crate::host::{BatchHandler, IntersectionHost};
use crate::margin::RootMargin;
use crate::stats::TriggerStats;

/// Consumer notification channel: called with one marker identifier.
pub type OnVisible = Rc<dyn Fn(&str)>;

/// Live binding of a selector and callback to a host observer.
pub struct Registration<H: IntersectionHost> {
    selector: String,
    on_visible: OnVisible,
    observed: Vec<H::Element>,
    _observer: H::Registration,
}

impl<H: IntersectionHost> Registration<H> {
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    #[must_use]
    pub fn observed(&self) -> &[H::Element] {
        &self.observed
    }
}

impl<H: IntersectionHost> fmt::Debug for Registration<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("selector", &self.selector)
            .field("observed", &self.observed.len())
            .finish()
    }
}

/// Watches every element matching a selector for viewport proximity.
pub struct ProximityWatcher<H: IntersectionHost> {
    host: Rc<H>,
    margin: RootMargin,
    stats: Rc<TriggerStats>,
    registration: Option<Registration<H>>,
}

impl<H: IntersectionHost> ProximityWatcher<H> {
    #[must_use]
    pub fn new(host: Rc<H>, margin: RootMargin) -> Self {
        Self {
            host,
            margin,
            stats: Rc::new(TriggerStats::default()),
            registration: None,
        }
    }

    /// Share counters with the rest of a trigger.
    #[must_use]
    pub fn with_stats(mut self, stats: Rc<TriggerStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Observe every element matching `selector`, replacing any previous
    /// registration. Returns the number of observed elements.
    ///
    /// Zero matches is not an error: the watcher idles until the next
    /// install.
    pub fn install(&mut self, selector: &str, on_visible: OnVisible) -> Result<usize> {
        let targets = self.host.query_all(selector)?;
        let handler = batch_handler(selector, Rc::clone(&on_visible), Rc::clone(&self.stats));
        let observer = self
            .host
            .observe_intersections(&self.margin, &targets, handler)?;

        let observed = targets.len();
        // Old observer disconnects here.
        self.registration = Some(Registration {
            selector: selector.to_string(),
            on_visible,
            observed: targets,
            _observer: observer,
        });
        self.stats.record_install();
        debug!(selector, observed, margin = %self.margin, "sentinel watcher installed");
        Ok(observed)
    }

    /// Re-run [`install`](Self::install) with the current selector and
    /// callback. A watcher that was never installed stays idle.
    pub fn rearm(&mut self) -> Result<usize> {
        let Some(current) = &self.registration else {
            return Ok(0);
        };
        let selector = current.selector.clone();
        let on_visible = Rc::clone(&current.on_visible);
        self.install(&selector, on_visible)
    }

    #[must_use]
    pub fn registration(&self) -> Option<&Registration<H>> {
        self.registration.as_ref()
    }

    #[must_use]
    pub fn observed(&self) -> &[H::Element] {
        self.registration
            .as_ref()
            .map(Registration::observed)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn margin(&self) -> &RootMargin {
        &self.margin
    }
}

impl<H: IntersectionHost> fmt::Debug for ProximityWatcher<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProximityWatcher")
            .field("margin", &self.margin)
            .field("registration", &self.registration)
            .finish()
    }
}

fn batch_handler(selector: &str, on_visible: OnVisible, stats: Rc<TriggerStats>) -> BatchHandler {
    let selector = selector.to_string();
    Box::new(move |batch: ObservationBatch| {
        let visible = batch.visible_ids();
        trace!(
            selector = %selector,
            entries = batch.len(),
            visible = visible.len(),
            "intersection batch"
        );
        stats.record_intersection_batch(visible.len());
        for id in &visible {
            on_visible(id.as_str());
        }
    })
}
