#![forbid(unsafe_code)]

//! WASM frontend for the scroll sentinel trigger.
//!
//! This crate exports [`ScrollSentinel`], a `wasm-bindgen` struct that runs
//! `sentinel_core::ScrollTrigger` over the page document with real
//! `IntersectionObserver`/`MutationObserver` instances, and `initLogging`,
//! which routes `tracing` output to the devtools console through
//! `console_log`.

#[cfg(target_arch = "wasm32")]
mod dom;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{ScrollSentinel, init_logging};

#[cfg(target_arch = "wasm32")]
mod logging;

// Used by the wasm module and by native tests.
#[cfg(any(target_arch = "wasm32", test))]
mod runner_core;

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use sentinel_core::SentinelError;
    use sentinel_core::lab::{LabDocument, LabElement};

    use crate::runner_core::RunnerCore;

    fn page(container_class: &str) -> (Rc<LabDocument>, LabElement) {
        let lab = Rc::new(LabDocument::new(400.0, 100.0));
        let container = lab.create_element("", container_class);
        lab.append_child(lab.body(), container);
        (lab, container)
    }

    fn sentinel(lab: &LabDocument, parent: LabElement, id: &str, top: f64) {
        let el = lab.create_element(id, "sentinel");
        lab.set_layout(el, top, 1.0);
        lab.append_child(parent, el);
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |id: &str| sink.borrow_mut().push(id.to_string()))
    }

    fn json(text: &str) -> serde_json::Value {
        serde_json::from_str(text).expect("valid json")
    }

    #[test]
    fn runner_core_starts_with_blank_config() {
        let (lab, grid) = page("grid");
        sentinel(&lab, grid, "s1", 50.0);
        let (seen, notify) = recorder();

        let core = RunnerCore::start(Rc::clone(&lab), "  ", notify).expect("starts");
        assert_eq!(core.observed_count(), 1);

        lab.flush();
        assert_eq!(*seen.borrow(), vec!["s1"]);
    }

    #[test]
    fn runner_core_partial_config_keeps_defaults() {
        let (lab, feed) = page("feed");
        sentinel(&lab, feed, "s1", 50.0);
        let (_seen, notify) = recorder();

        let core = RunnerCore::start(
            Rc::clone(&lab),
            r#"{"container_selector":".feed"}"#,
            notify,
        )
        .expect("starts");

        let config = json(&core.config_json());
        assert_eq!(config["container_selector"], ".feed");
        assert_eq!(config["marker_selector"], ".sentinel");
        assert_eq!(config["root_margin"], "100% 0px 100% 0px");
    }

    #[test]
    fn runner_core_rejects_malformed_json() {
        let (lab, _grid) = page("grid");
        let (_seen, notify) = recorder();

        let err = RunnerCore::start(Rc::clone(&lab), "{not json", notify)
            .err()
            .expect("malformed config fails");
        assert!(matches!(err, SentinelError::InvalidConfig { .. }), "{err:?}");
        assert_eq!(lab.live_intersection_observers(), 0);
        assert_eq!(lab.live_mutation_observers(), 0);
    }

    #[test]
    fn runner_core_reports_missing_container() {
        let (lab, _grid) = page("grid");
        let (_seen, notify) = recorder();

        let err = RunnerCore::start(
            Rc::clone(&lab),
            r##"{"container_selector":"#missing"}"##,
            notify,
        )
        .err()
        .expect("missing container fails");
        assert_eq!(err, SentinelError::container_not_found("#missing"));
        assert_eq!(err.to_string(), "content container not found: #missing");
        assert_eq!(lab.live_intersection_observers(), 0);
    }

    #[test]
    fn runner_core_stats_json_tracks_rearms() {
        let (lab, grid) = page("grid");
        let (seen, notify) = recorder();
        let core = RunnerCore::start(Rc::clone(&lab), "", notify).expect("starts");
        assert_eq!(core.observed_count(), 0);

        sentinel(&lab, grid, "s1", 50.0);
        lab.flush();
        assert_eq!(core.observed_count(), 1);
        assert_eq!(*seen.borrow(), vec!["s1"]);

        let stats = json(&core.stats_json());
        assert_eq!(stats["installs"], 2);
        assert_eq!(stats["mutation_batches"], 1);
        assert_eq!(stats["notifications"], 1);
        assert_eq!(stats["failed_rearms"], 0);
    }

    #[test]
    fn runner_core_manual_rearm_picks_up_markers() {
        let (lab, grid) = page("grid");
        let (_seen, notify) = recorder();
        let core = RunnerCore::start(Rc::clone(&lab), "", notify).expect("starts");

        sentinel(&lab, grid, "s1", 500.0);
        sentinel(&lab, grid, "s2", 600.0);
        assert_eq!(core.rearm().expect("rearm"), 2);
        assert_eq!(core.stats().installs, 2);
        assert_eq!(lab.live_intersection_observers(), 1);
    }
}
