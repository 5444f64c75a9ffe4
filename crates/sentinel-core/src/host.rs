#![forbid(unsafe_code)]

//! Seams between the watchers and the environment that delivers observations.
//!
//! A host owns the document and the two push-based observation mechanisms.
//! The browser implementation lives in `sentinel-web`; the `lab` module is a
//! deterministic in-memory host for tests.
//!
//! # Contract
//!
//! 1. `observe_*` registers and returns immediately. Batches are delivered
//!    later, from the host's event loop, never from inside `observe_*`.
//! 2. A host never holds an internal borrow while calling a handler, so a
//!    handler may install new registrations on the same host.
//! 3. Dropping a registration disconnects it: no batch is delivered to its
//!    handler afterwards.

use crate::batch::{MutationBatch, ObservationBatch};
use crate::error::Result;
use crate::margin::RootMargin;

/// Receives every intersection batch for one registration.
pub type BatchHandler = Box<dyn FnMut(ObservationBatch)>;

/// Receives every child-list batch for one registration.
pub type MutationHandler = Box<dyn FnMut(MutationBatch)>;

/// Viewport-intersection mechanism plus the document query it observes.
pub trait IntersectionHost {
    type Element: Clone;
    /// Live observer; disconnects on drop.
    type Registration;

    /// All elements matching `selector`, in document order.
    fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>>;

    /// Observe `targets` against the viewport grown by `margin`.
    ///
    /// The first delivery after registration reports every target's current
    /// state, intersecting or not.
    fn observe_intersections(
        &self,
        margin: &RootMargin,
        targets: &[Self::Element],
        on_batch: BatchHandler,
    ) -> Result<Self::Registration>;
}

/// Child-list mutation mechanism.
pub trait MutationHost {
    type Element;
    /// Live observer; disconnects on drop.
    type Registration;

    /// First element matching `selector`, if any.
    fn query_one(&self, selector: &str) -> Result<Option<Self::Element>>;

    /// Observe direct-child additions and removals of `container`.
    fn observe_children(
        &self,
        container: &Self::Element,
        on_batch: MutationHandler,
    ) -> Result<Self::Registration>;
}
