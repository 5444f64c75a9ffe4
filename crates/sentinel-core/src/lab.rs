#![forbid(unsafe_code)]

//! Deterministic in-memory host for tests.
//!
//! [`LabDocument`] models the small slice of a browser the watchers depend
//! on: a node tree with `id`/`class` attributes, a vertical layout, a
//! scrollable viewport, and the two observation mechanisms. Nothing is
//! delivered until [`LabDocument::flush`] runs, which plays the part of one
//! turn of the host event loop:
//!
//! 1. Child-list records queued since the last flush are delivered, one
//!    batch per mutation observer, repeating until no records are pending.
//! 2. Every live intersection observer reports each target whose
//!    intersecting state changed since its last report. A fresh observer
//!    reports every target once.
//!
//! Selectors are limited to compounds of `#id` and `.class` parts.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::batch::{IntersectionEntry, MutationBatch, MutationRecord, ObservationBatch};
use crate::error::{Result, SentinelError};
use crate::host::{BatchHandler, IntersectionHost, MutationHandler, MutationHost};
use crate::margin::{Rect, RootMargin};
use crate::marker::MarkerId;

/// Handle to a node in a [`LabDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabElement(usize);

const BODY: LabElement = LabElement(0);

#[derive(Debug, Default)]
struct LabNode {
    id: Option<String>,
    classes: Vec<String>,
    parent: Option<LabElement>,
    children: Vec<LabElement>,
    top: f64,
    height: f64,
}

struct IntersectionObserverState {
    margin: RootMargin,
    targets: Vec<LabElement>,
    last: Vec<Option<bool>>,
    handler: Rc<RefCell<BatchHandler>>,
}

struct MutationObserverState {
    container: LabElement,
    pending: Vec<MutationRecord>,
    handler: Rc<RefCell<MutationHandler>>,
}

struct LabState {
    nodes: Vec<LabNode>,
    scroll_y: f64,
    viewport_width: f64,
    viewport_height: f64,
    next_observer: u64,
    failing_queries: u32,
    intersections: BTreeMap<u64, IntersectionObserverState>,
    mutations: BTreeMap<u64, MutationObserverState>,
}

impl LabState {
    fn node(&self, el: LabElement) -> &LabNode {
        &self.nodes[el.0]
    }

    fn is_attached(&self, el: LabElement) -> bool {
        let mut current = el;
        loop {
            if current == BODY {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether `el` is `ancestor` or lies in its subtree.
    fn is_inclusive_ancestor(&self, ancestor: LabElement, el: LabElement) -> bool {
        let mut current = Some(el);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.node(node).parent;
        }
        false
    }

    fn record(&mut self, parent: LabElement, record: MutationRecord) {
        for observer in self.mutations.values_mut() {
            if observer.container == parent {
                observer.pending.push(record);
            }
        }
    }

    fn detach(&mut self, el: LabElement) {
        let Some(parent) = self.nodes[el.0].parent.take() else {
            return;
        };
        self.nodes[parent.0].children.retain(|&child| child != el);
        self.record(parent, MutationRecord {
            added_nodes: 0,
            removed_nodes: 1,
        });
    }

    /// Attached nodes in document order.
    fn walk(&self) -> Vec<LabElement> {
        let mut out = Vec::new();
        let mut stack = vec![BODY];
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(self.node(el).children.iter().rev().copied());
        }
        out
    }

    fn viewport(&self) -> Rect {
        Rect::new(0.0, 0.0, self.viewport_width, self.viewport_height)
    }

    fn bounding_rect(&self, el: LabElement) -> Rect {
        let node = self.node(el);
        Rect::new(0.0, node.top - self.scroll_y, self.viewport_width, node.height)
    }

    fn intersection_ratio(&self, el: LabElement, margin: &RootMargin) -> f64 {
        let root = margin.expand(self.viewport());
        let target = self.bounding_rect(el);
        match target.intersection(&root) {
            None => 0.0,
            // Zero-area targets count as fully visible once they touch the root.
            Some(_) if target.area() == 0.0 => 1.0,
            Some(overlap) => overlap.area() / target.area(),
        }
    }

    fn marker_id(&self, el: LabElement) -> MarkerId {
        MarkerId::from(self.node(el).id.clone())
    }

    fn next_id(&mut self) -> u64 {
        self.next_observer += 1;
        self.next_observer
    }
}

/// In-memory document and observation host. Clones share the same document.
#[derive(Clone)]
pub struct LabDocument {
    state: Rc<RefCell<LabState>>,
}

impl LabDocument {
    /// Empty document with a viewport of the given size, scrolled to the top.
    #[must_use]
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(LabState {
                nodes: vec![LabNode::default()],
                scroll_y: 0.0,
                viewport_width,
                viewport_height,
                next_observer: 0,
                failing_queries: 0,
                intersections: BTreeMap::new(),
                mutations: BTreeMap::new(),
            })),
        }
    }

    #[must_use]
    pub fn body(&self) -> LabElement {
        BODY
    }

    /// Detached element. An empty `id` leaves the attribute unset;
    /// `class` is a space-separated class list.
    pub fn create_element(&self, id: &str, class: &str) -> LabElement {
        let mut state = self.state.borrow_mut();
        state.nodes.push(LabNode {
            id: (!id.is_empty()).then(|| id.to_string()),
            classes: class.split_whitespace().map(str::to_string).collect(),
            ..LabNode::default()
        });
        LabElement(state.nodes.len() - 1)
    }

    /// Place `el` at document offset `top` with the given height.
    pub fn set_layout(&self, el: LabElement, top: f64, height: f64) {
        let mut state = self.state.borrow_mut();
        let node = &mut state.nodes[el.0];
        node.top = top;
        node.height = height;
    }

    /// Move `child` to the end of `parent`'s children.
    ///
    /// # Panics
    ///
    /// If `child` is `parent` or one of its ancestors, which would make the
    /// tree cyclic (the browser throws `HierarchyRequestError` here).
    pub fn append_child(&self, parent: LabElement, child: LabElement) {
        let mut state = self.state.borrow_mut();
        assert!(
            !state.is_inclusive_ancestor(child, parent),
            "cannot append {child:?} into its own subtree"
        );
        state.detach(child);
        state.nodes[child.0].parent = Some(parent);
        state.nodes[parent.0].children.push(child);
        state.record(parent, MutationRecord {
            added_nodes: 1,
            removed_nodes: 0,
        });
    }

    /// Detach `el` (and its subtree) from its parent.
    pub fn remove(&self, el: LabElement) {
        self.state.borrow_mut().detach(el);
    }

    pub fn scroll_to(&self, y: f64) {
        self.state.borrow_mut().scroll_y = y;
    }

    #[must_use]
    pub fn scroll_y(&self) -> f64 {
        self.state.borrow().scroll_y
    }

    #[must_use]
    pub fn is_attached(&self, el: LabElement) -> bool {
        self.state.borrow().is_attached(el)
    }

    #[must_use]
    pub fn element_id(&self, el: LabElement) -> MarkerId {
        self.state.borrow().marker_id(el)
    }

    #[must_use]
    pub fn live_intersection_observers(&self) -> usize {
        self.state.borrow().intersections.len()
    }

    #[must_use]
    pub fn live_mutation_observers(&self) -> usize {
        self.state.borrow().mutations.len()
    }

    /// Targets of every live intersection observer, concatenated in
    /// registration order. A target observed twice appears twice.
    #[must_use]
    pub fn observed_targets(&self) -> Vec<LabElement> {
        self.state
            .borrow()
            .intersections
            .values()
            .flat_map(|observer| observer.targets.iter().copied())
            .collect()
    }

    /// Run one event-loop turn. Returns the number of batches delivered.
    pub fn flush(&self) -> usize {
        let mut delivered = 0;
        loop {
            let pending = self.take_mutation_batches();
            if pending.is_empty() {
                break;
            }
            for (observer, handler, batch) in pending {
                if self.mutation_observer_live(observer) {
                    (*handler.borrow_mut())(batch);
                    delivered += 1;
                }
            }
        }

        for (observer, handler, batch) in self.take_intersection_batches() {
            if self.intersection_observer_live(observer) {
                (*handler.borrow_mut())(batch);
                delivered += 1;
            }
        }
        delivered
    }

    /// Deliver a hand-built batch to every live intersection observer,
    /// bypassing geometry. Returns the number of observers reached.
    pub fn inject_intersections(&self, entries: Vec<IntersectionEntry>) -> usize {
        let handlers: Vec<_> = self
            .state
            .borrow()
            .intersections
            .iter()
            .map(|(&id, observer)| (id, Rc::clone(&observer.handler)))
            .collect();
        let mut reached = 0;
        for (observer, handler) in handlers {
            if self.intersection_observer_live(observer) {
                (*handler.borrow_mut())(ObservationBatch::new(entries.clone()));
                reached += 1;
            }
        }
        reached
    }

    fn mutation_observer_live(&self, observer: u64) -> bool {
        self.state.borrow().mutations.contains_key(&observer)
    }

    fn intersection_observer_live(&self, observer: u64) -> bool {
        self.state.borrow().intersections.contains_key(&observer)
    }

    fn take_mutation_batches(&self) -> Vec<(u64, Rc<RefCell<MutationHandler>>, MutationBatch)> {
        let mut state = self.state.borrow_mut();
        state
            .mutations
            .iter_mut()
            .filter(|(_, observer)| !observer.pending.is_empty())
            .map(|(&id, observer)| {
                let records = std::mem::take(&mut observer.pending);
                (id, Rc::clone(&observer.handler), MutationBatch::new(records))
            })
            .collect()
    }

    fn take_intersection_batches(
        &self,
    ) -> Vec<(u64, Rc<RefCell<BatchHandler>>, ObservationBatch)> {
        let mut state = self.state.borrow_mut();
        let ids: Vec<u64> = state.intersections.keys().copied().collect();
        let mut out = Vec::new();
        for id in ids {
            let Some(observer) = state.intersections.get(&id) else {
                continue;
            };
            let margin = observer.margin;
            // Detached targets drop out silently.
            let ratios: Vec<Option<f64>> = observer
                .targets
                .iter()
                .map(|&target| {
                    state
                        .is_attached(target)
                        .then(|| state.intersection_ratio(target, &margin))
                })
                .collect();

            let Some(observer) = state.intersections.get_mut(&id) else {
                continue;
            };
            let mut changed = Vec::new();
            for ((&target, last), ratio) in observer
                .targets
                .iter()
                .zip(observer.last.iter_mut())
                .zip(ratios)
            {
                let Some(ratio) = ratio else {
                    continue;
                };
                let intersecting = ratio > 0.0;
                if *last != Some(intersecting) {
                    *last = Some(intersecting);
                    changed.push((target, ratio));
                }
            }
            if changed.is_empty() {
                continue;
            }
            let handler = Rc::clone(&observer.handler);
            let batch = changed
                .into_iter()
                .map(|(target, ratio)| IntersectionEntry::new(state.marker_id(target), ratio))
                .collect();
            out.push((id, handler, batch));
        }
        out
    }

    fn register_intersections(
        &self,
        margin: &RootMargin,
        targets: &[LabElement],
        handler: BatchHandler,
    ) -> LabRegistration {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.intersections.insert(id, IntersectionObserverState {
            margin: *margin,
            targets: targets.to_vec(),
            last: vec![None; targets.len()],
            handler: Rc::new(RefCell::new(handler)),
        });
        LabRegistration {
            state: Rc::downgrade(&self.state),
            id,
        }
    }

    fn register_mutations(&self, container: LabElement, handler: MutationHandler) -> LabRegistration {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.mutations.insert(id, MutationObserverState {
            container,
            pending: Vec::new(),
            handler: Rc::new(RefCell::new(handler)),
        });
        LabRegistration {
            state: Rc::downgrade(&self.state),
            id,
        }
    }

    /// Make the next `n` selector queries fail with a host error.
    pub fn fail_next_queries(&self, n: u32) {
        self.state.borrow_mut().failing_queries = n;
    }

    fn query(&self, selector: &str) -> Result<Vec<LabElement>> {
        let selector = LabSelector::parse(selector)?;
        {
            let mut state = self.state.borrow_mut();
            if state.failing_queries > 0 {
                state.failing_queries -= 1;
                return Err(SentinelError::host("injected query failure"));
            }
        }
        let state = self.state.borrow();
        Ok(state
            .walk()
            .into_iter()
            .filter(|&el| selector.matches(state.node(el)))
            .collect())
    }
}

impl fmt::Debug for LabDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("LabDocument")
            .field("nodes", &state.nodes.len())
            .field("scroll_y", &state.scroll_y)
            .field("intersection_observers", &state.intersections.len())
            .field("mutation_observers", &state.mutations.len())
            .finish()
    }
}

impl IntersectionHost for LabDocument {
    type Element = LabElement;
    type Registration = LabRegistration;

    fn query_all(&self, selector: &str) -> Result<Vec<LabElement>> {
        self.query(selector)
    }

    fn observe_intersections(
        &self,
        margin: &RootMargin,
        targets: &[LabElement],
        on_batch: BatchHandler,
    ) -> Result<LabRegistration> {
        Ok(self.register_intersections(margin, targets, on_batch))
    }
}

impl MutationHost for LabDocument {
    type Element = LabElement;
    type Registration = LabRegistration;

    fn query_one(&self, selector: &str) -> Result<Option<LabElement>> {
        Ok(self.query(selector)?.into_iter().next())
    }

    fn observe_children(
        &self,
        container: &LabElement,
        on_batch: MutationHandler,
    ) -> Result<LabRegistration> {
        Ok(self.register_mutations(*container, on_batch))
    }
}

/// Live lab observer. Dropping it disconnects the observer and discards any
/// records not yet delivered.
pub struct LabRegistration {
    state: Weak<RefCell<LabState>>,
    id: u64,
}

impl Drop for LabRegistration {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let removed = {
            let mut state = state.borrow_mut();
            (
                state.intersections.remove(&self.id),
                state.mutations.remove(&self.id),
            )
        };
        // Handlers may own consumer state; drop them outside the borrow.
        drop(removed);
    }
}

impl fmt::Debug for LabRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabRegistration").field("id", &self.id).finish()
    }
}

/// Compound selector of `#id` and `.class` parts.
#[derive(Debug, Default, PartialEq, Eq)]
struct LabSelector {
    id: Option<String>,
    classes: Vec<String>,
}

impl LabSelector {
    fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| SentinelError::invalid_selector(input, reason);
        let mut selector = Self::default();
        let mut chars = input.trim().chars().peekable();
        if chars.peek().is_none() {
            return Err(invalid("empty selector"));
        }
        while let Some(kind) = chars.next() {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                return Err(invalid("expected a name after '#' or '.'"));
            }
            match kind {
                '#' if selector.id.is_none() => selector.id = Some(name),
                '#' => return Err(invalid("more than one #id")),
                '.' => selector.classes.push(name),
                _ => return Err(invalid("only #id and .class parts are supported")),
            }
        }
        Ok(selector)
    }

    fn matches(&self, node: &LabNode) -> bool {
        self.id
            .as_ref()
            .is_none_or(|id| node.id.as_ref() == Some(id))
            && self.classes.iter().all(|class| node.classes.contains(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn recorder() -> (Rc<RefCell<Vec<ObservationBatch>>>, BatchHandler) {
        let batches = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&batches);
        (batches, Box::new(move |batch: ObservationBatch| sink.borrow_mut().push(batch)))
    }

    fn entries(batch: &ObservationBatch) -> Vec<(String, f64)> {
        batch
            .entries()
            .iter()
            .map(|e| (e.id.to_string(), e.intersection_ratio))
            .collect()
    }

    #[test]
    fn selector_parsing() {
        assert_eq!(LabSelector::parse("#a.b.c").unwrap(), LabSelector {
            id: Some("a".into()),
            classes: vec!["b".into(), "c".into()],
        });
        for bad in ["", "div", ".a .b", "#", "#a#b", ".sentinel > p"] {
            assert!(LabSelector::parse(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn query_all_is_document_order_and_skips_detached() {
        let lab = LabDocument::new(100.0, 100.0);
        let grid = lab.create_element("g", "grid");
        let a = lab.create_element("a", "sentinel");
        let b = lab.create_element("b", "sentinel");
        let loose = lab.create_element("loose", "sentinel");
        lab.append_child(lab.body(), grid);
        lab.append_child(grid, a);
        lab.append_child(lab.body(), b);

        assert_eq!(lab.query_all(".sentinel").unwrap(), vec![a, b]);
        assert!(!lab.is_attached(loose));
        assert_eq!(lab.query_one("#b").unwrap(), Some(b));
        assert_eq!(lab.query_one(".missing").unwrap(), None);
    }

    #[test]
    #[should_panic(expected = "own subtree")]
    fn appending_into_own_descendant_panics() {
        let lab = LabDocument::new(100.0, 100.0);
        let outer = lab.create_element("outer", "");
        let inner = lab.create_element("inner", "");
        lab.append_child(lab.body(), outer);
        lab.append_child(outer, inner);
        lab.append_child(inner, outer);
    }

    #[test]
    fn appending_into_itself_leaves_tree_intact() {
        let lab = LabDocument::new(100.0, 100.0);
        let el = lab.create_element("el", "sentinel");
        lab.append_child(lab.body(), el);

        let attempt = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            lab.append_child(el, el);
        }));
        assert!(attempt.is_err());
        assert!(lab.is_attached(el));
        assert_eq!(lab.query_all(".sentinel").unwrap(), vec![el]);
    }

    #[test]
    fn fresh_observer_reports_every_target_then_only_changes() {
        let lab = LabDocument::new(100.0, 100.0);
        let near = lab.create_element("near", "sentinel");
        let far = lab.create_element("far", "sentinel");
        lab.set_layout(near, 150.0, 10.0);
        lab.set_layout(far, 1_000.0, 10.0);
        lab.append_child(lab.body(), near);
        lab.append_child(lab.body(), far);

        let (batches, handler) = recorder();
        let _reg = lab
            .observe_intersections(&RootMargin::default(), &[near, far], handler)
            .unwrap();
        assert_eq!(lab.flush(), 1);
        assert_eq!(entries(&batches.borrow()[0]), vec![
            ("near".to_string(), 1.0),
            ("far".to_string(), 0.0),
        ]);

        lab.flush();
        assert_eq!(batches.borrow().len(), 1);

        lab.scroll_to(850.0);
        lab.flush();
        assert_eq!(entries(&batches.borrow()[1]), vec![
            ("near".to_string(), 0.0),
            ("far".to_string(), 1.0),
        ]);
    }

    #[test]
    fn partial_overlap_ratio_and_zero_height_targets() {
        let lab = LabDocument::new(100.0, 100.0);
        let half = lab.create_element("half", "");
        let line = lab.create_element("line", "");
        lab.set_layout(half, 95.0, 10.0);
        lab.set_layout(line, 100.0, 0.0);
        lab.append_child(lab.body(), half);
        lab.append_child(lab.body(), line);

        let (batches, handler) = recorder();
        let _reg = lab
            .observe_intersections(&RootMargin::NONE, &[half, line], handler)
            .unwrap();
        lab.flush();
        assert_eq!(entries(&batches.borrow()[0]), vec![
            ("half".to_string(), 0.5),
            ("line".to_string(), 1.0),
        ]);
    }

    #[test]
    fn dropped_registration_stops_delivery() {
        let lab = LabDocument::new(100.0, 100.0);
        let s = lab.create_element("s", "sentinel");
        lab.append_child(lab.body(), s);
        let (batches, handler) = recorder();
        let reg = lab
            .observe_intersections(&RootMargin::default(), &[s], handler)
            .unwrap();
        drop(reg);
        assert_eq!(lab.live_intersection_observers(), 0);
        assert_eq!(lab.flush(), 0);
        assert!(batches.borrow().is_empty());
    }

    #[test]
    fn handler_may_register_on_same_lab() {
        let lab = LabDocument::new(100.0, 100.0);
        let grid = lab.create_element("", "grid");
        lab.append_child(lab.body(), grid);

        let inner = lab.clone();
        let regs: Rc<RefCell<Vec<LabRegistration>>> = Rc::default();
        let keep = Rc::clone(&regs);
        let _mut_reg = lab
            .observe_children(
                &grid,
                Box::new(move |_: MutationBatch| {
                    let targets = inner.query_all(".sentinel").unwrap();
                    let reg = inner
                        .observe_intersections(&RootMargin::default(), &targets, Box::new(|_: ObservationBatch| {}))
                        .unwrap();
                    keep.borrow_mut().push(reg);
                }),
            )
            .unwrap();

        let s = lab.create_element("s", "sentinel");
        lab.append_child(grid, s);
        assert_eq!(lab.flush(), 2);
        assert_eq!(lab.observed_targets(), vec![s]);
        drop(regs);
    }
}
