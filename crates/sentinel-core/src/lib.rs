#![forbid(unsafe_code)]

//! Core: infinite-scroll sentinel trigger.
//!
//! A [`ProximityWatcher`](proximity::ProximityWatcher) reports sentinel
//! markers that come within the proximity margin of the viewport, once per
//! identifier per batch. A [`ContainerWatcher`](container::ContainerWatcher)
//! re-arms it whenever the content container's children change.
//! [`ScrollTrigger`](trigger::ScrollTrigger) wires the two together.
//!
//! Everything here is host-agnostic. Observation mechanisms come in through
//! the [`host`] traits. With the `test-helpers` feature, `lab` provides a
//! deterministic in-memory host.

pub mod batch;
pub mod config;
pub mod container;
pub mod error;
pub mod host;
#[cfg(any(test, feature = "test-helpers"))]
pub mod lab;
pub mod margin;
pub mod marker;
pub mod proximity;
pub mod stats;
pub mod trigger;

pub use config::SentinelConfig;
pub use error::{Result, SentinelError};
pub use marker::MarkerId;
pub use trigger::ScrollTrigger;
