//! Browser host: `IntersectionObserver` and `MutationObserver` over the page
//! document.
//!
//! Each registration owns its observer and the JS closure it calls. Dropping
//! the registration disconnects the observer before the closure is freed, so
//! the browser never calls into a dropped closure.

use js_sys::Array;
use sentinel_core::batch::{IntersectionEntry, MutationBatch, MutationRecord, ObservationBatch};
use sentinel_core::host::{BatchHandler, IntersectionHost, MutationHandler, MutationHost};
use sentinel_core::margin::RootMargin;
use sentinel_core::{Result, SentinelError};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit,
    MutationObserver, MutationObserverInit, NodeList,
};

/// Best-effort message from a thrown JS value.
pub(crate) fn js_message(value: &JsValue) -> String {
    value
        .dyn_ref::<js_sys::Error>()
        .map(|err| String::from(err.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}

fn elements(list: &NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

#[derive(Debug, Clone)]
pub struct DomHost {
    document: Document,
}

impl DomHost {
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// Host over `window.document`.
    pub fn from_window() -> Result<Self> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| SentinelError::host("no window.document in this context"))?;
        Ok(Self::new(document))
    }
}

pub struct DomIntersectionRegistration {
    observer: IntersectionObserver,
    _callback: Closure<dyn FnMut(Array, IntersectionObserver)>,
}

impl Drop for DomIntersectionRegistration {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

pub struct DomMutationRegistration {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(Array, MutationObserver)>,
}

impl Drop for DomMutationRegistration {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

impl IntersectionHost for DomHost {
    type Element = Element;
    type Registration = DomIntersectionRegistration;

    fn query_all(&self, selector: &str) -> Result<Vec<Element>> {
        let list = self
            .document
            .query_selector_all(selector)
            .map_err(|err| SentinelError::invalid_selector(selector, js_message(&err)))?;
        Ok(elements(&list))
    }

    fn observe_intersections(
        &self,
        margin: &RootMargin,
        targets: &[Element],
        mut on_batch: BatchHandler,
    ) -> Result<DomIntersectionRegistration> {
        let callback = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
            move |entries: Array, _observer: IntersectionObserver| {
                let batch: ObservationBatch = entries
                    .iter()
                    .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                    .map(|entry| IntersectionEntry::new(entry.target().id(), entry.intersection_ratio()))
                    .collect();
                on_batch(batch);
            },
        );

        let init = IntersectionObserverInit::new();
        init.set_root_margin(&margin.to_string());
        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)
                .map_err(|err| SentinelError::host(js_message(&err)))?;
        for target in targets {
            observer.observe(target);
        }
        Ok(DomIntersectionRegistration {
            observer,
            _callback: callback,
        })
    }
}

impl MutationHost for DomHost {
    type Element = Element;
    type Registration = DomMutationRegistration;

    fn query_one(&self, selector: &str) -> Result<Option<Element>> {
        self.document
            .query_selector(selector)
            .map_err(|err| SentinelError::invalid_selector(selector, js_message(&err)))
    }

    fn observe_children(
        &self,
        container: &Element,
        mut on_batch: MutationHandler,
    ) -> Result<DomMutationRegistration> {
        let callback = Closure::<dyn FnMut(Array, MutationObserver)>::new(
            move |records: Array, _observer: MutationObserver| {
                let records = records
                    .iter()
                    .filter_map(|record| record.dyn_into::<web_sys::MutationRecord>().ok())
                    .map(|record| MutationRecord {
                        added_nodes: record.added_nodes().length() as usize,
                        removed_nodes: record.removed_nodes().length() as usize,
                    })
                    .collect();
                on_batch(MutationBatch::new(records));
            },
        );

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
            .map_err(|err| SentinelError::host(js_message(&err)))?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        observer
            .observe_with_options(container, &init)
            .map_err(|err| SentinelError::host(js_message(&err)))?;
        Ok(DomMutationRegistration {
            observer,
            _callback: callback,
        })
    }
}
