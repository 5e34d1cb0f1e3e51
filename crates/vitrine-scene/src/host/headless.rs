//! Deterministic in-process host.
//!
//! Time only moves when [`TimerQueue::advance`] is called, so every timing
//! behavior of the runtime can be replayed exactly. Elements are plain
//! in-memory nodes with inline styles, classes, attributes and children.
//!
//! ```ignore
//! let page = HeadlessHost::new();
//! let card = Element::new("div").with_class("card");
//! let engine = StagedAnimationEngine::new(page.host().scheduler, sink);
//! engine.run(card.clone(), steps)?;
//! page.advance(500);
//! assert_eq!(card.style("opacity").as_deref(), Some("1"));
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use tracing::trace;

use super::{
    Clock, Host, HostWindow, MemoryProbe, MemoryUsage, Scheduler, Target, TargetId, TargetRef,
    TimerHandle, VisibilityObserver, WatchHandle, meets_threshold,
};
use crate::error::{Result, SceneError};

// =============================================================================
// CLOCK + TIMERS
// =============================================================================

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward to `ms`. Never moves backwards.
    pub fn set(&self, ms: u64) {
        if ms > self.now.get() {
            self.now.set(ms);
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Pending callbacks ordered by due time, then by scheduling order.
pub struct TimerQueue {
    clock: Rc<ManualClock>,
    pending: RefCell<BTreeMap<(u64, u64), Box<dyn FnOnce()>>>,
    due_by_handle: RefCell<HashMap<u64, u64>>,
    next_seq: Cell<u64>,
}

impl TimerQueue {
    pub fn new(clock: Rc<ManualClock>) -> Self {
        Self {
            clock,
            pending: RefCell::new(BTreeMap::new()),
            due_by_handle: RefCell::new(HashMap::new()),
            next_seq: Cell::new(1),
        }
    }

    /// Advance time by `ms`, firing every callback that falls due on the way.
    ///
    /// Each callback observes the clock at its own due time. Callbacks
    /// scheduled by callbacks fire in the same call if they fall due before
    /// the end of the window.
    pub fn advance(&self, ms: u64) {
        let until = self.clock.now_ms() + ms;
        loop {
            let next = self.pending.borrow().keys().next().copied();
            let Some(key @ (due, seq)) = next else { break };
            if due > until {
                break;
            }
            let callback = self.pending.borrow_mut().remove(&key);
            self.due_by_handle.borrow_mut().remove(&seq);
            self.clock.set(due);
            if let Some(callback) = callback {
                trace!(due, seq, "timer fired");
                callback();
            }
        }
        self.clock.set(until);
    }

    /// Number of callbacks still waiting.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Due time of the earliest pending callback.
    pub fn next_due(&self) -> Option<u64> {
        self.pending.borrow().keys().next().map(|(due, _)| *due)
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&self, delay_ms: u64, callback: Box<dyn FnOnce()>) -> TimerHandle {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let due = self.clock.now_ms() + delay_ms;
        self.pending.borrow_mut().insert((due, seq), callback);
        self.due_by_handle.borrow_mut().insert(seq, due);
        TimerHandle(seq)
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        let due = self.due_by_handle.borrow_mut().remove(&handle.0);
        match due {
            Some(due) => self.pending.borrow_mut().remove(&(due, handle.0)).is_some(),
            None => false,
        }
    }
}

// =============================================================================
// ELEMENTS
// =============================================================================

/// In-memory element.
#[derive(Debug)]
pub struct Element {
    id: TargetId,
    tag: String,
    styles: RefCell<BTreeMap<String, String>>,
    classes: RefCell<BTreeSet<String>>,
    attributes: RefCell<BTreeMap<String, String>>,
    text: RefCell<String>,
    children: RefCell<Vec<Rc<Element>>>,
    detached: Cell<bool>,
    style_writes: Cell<usize>,
}

impl Element {
    pub fn new(tag: &str) -> Rc<Self> {
        Rc::new(Self {
            id: TargetId::new(),
            tag: tag.to_ascii_lowercase(),
            styles: RefCell::new(BTreeMap::new()),
            classes: RefCell::new(BTreeSet::new()),
            attributes: RefCell::new(BTreeMap::new()),
            text: RefCell::new(String::new()),
            children: RefCell::new(Vec::new()),
            detached: Cell::new(false),
            style_writes: Cell::new(0),
        })
    }

    pub fn with_class(self: Rc<Self>, class: &str) -> Rc<Self> {
        self.classes.borrow_mut().insert(class.to_string());
        self
    }

    pub fn with_attr(self: Rc<Self>, name: &str, value: &str) -> Rc<Self> {
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(self: Rc<Self>, text: &str) -> Rc<Self> {
        *self.text.borrow_mut() = text.to_string();
        self
    }

    pub fn with_child(self: Rc<Self>, child: Rc<Element>) -> Rc<Self> {
        self.children.borrow_mut().push(child);
        self
    }

    pub fn append(&self, child: Rc<Element>) {
        self.children.borrow_mut().push(child);
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn classes(&self) -> Vec<String> {
        self.classes.borrow().iter().cloned().collect()
    }

    /// Number of successful `set_style` calls so far.
    pub fn style_writes(&self) -> usize {
        self.style_writes.get()
    }

    /// Remove the element from the page. Later style writes fail.
    pub fn detach(&self) {
        self.detached.set(true);
    }

    fn matches(&self, selector: &str) -> bool {
        if let Some(class) = selector.strip_prefix('.') {
            self.classes.borrow().contains(class)
        } else if let Some(id) = selector.strip_prefix('#') {
            self.attributes.borrow().get("id").map(String::as_str) == Some(id)
        } else if let Some(attr) = selector
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
        {
            self.attributes.borrow().contains_key(attr)
        } else {
            self.tag.eq_ignore_ascii_case(selector)
        }
    }

    fn collect_matches(&self, selector: &str, out: &mut Vec<TargetRef>) {
        for child in self.children.borrow().iter() {
            if child.matches(selector) {
                out.push(child.clone());
            }
            child.collect_matches(selector, out);
        }
    }
}

impl Target for Element {
    fn id(&self) -> TargetId {
        self.id
    }

    fn style(&self, property: &str) -> Option<String> {
        self.styles.borrow().get(property).cloned()
    }

    fn set_style(&self, property: &str, value: &str) -> Result<()> {
        if self.detached.get() {
            return Err(SceneError::Mutation {
                target: self.id,
                reason: format!("element detached while writing `{property}`"),
            });
        }
        self.styles
            .borrow_mut()
            .insert(property.to_string(), value.to_string());
        self.style_writes.set(self.style_writes.get() + 1);
        Ok(())
    }

    fn add_class(&self, class: &str) {
        self.classes.borrow_mut().insert(class.to_string());
    }

    fn remove_class(&self, class: &str) {
        self.classes.borrow_mut().remove(class);
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.borrow().contains(class)
    }

    fn query_all(&self, selector: &str) -> Vec<TargetRef> {
        let mut out = Vec::new();
        self.collect_matches(selector.trim(), &mut out);
        out
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    fn set_text(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
    }
}

// =============================================================================
// VIEWPORT / WINDOW / MEMORY
// =============================================================================

struct Watch {
    target: TargetId,
    threshold: f64,
    callback: Option<Box<dyn FnMut(f64)>>,
}

/// Simulated viewport. Tests move elements in and out of view with
/// [`ViewportSim::set_ratio`].
#[derive(Default)]
pub struct ViewportSim {
    watches: RefCell<BTreeMap<u64, Watch>>,
    ratios: RefCell<HashMap<TargetId, f64>>,
    next: Cell<u64>,
}

impl ViewportSim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the visible fraction of `target` and notify every watch whose
    /// threshold was crossed.
    pub fn set_ratio(&self, target: &dyn Target, ratio: f64) {
        let id = target.id();
        let ratio = ratio.clamp(0.0, 1.0);
        let previous = self
            .ratios
            .borrow_mut()
            .insert(id, ratio)
            .unwrap_or(0.0);

        let crossed: Vec<u64> = self
            .watches
            .borrow()
            .iter()
            .filter(|(_, w)| {
                w.target == id
                    && meets_threshold(previous, w.threshold) != meets_threshold(ratio, w.threshold)
            })
            .map(|(handle, _)| *handle)
            .collect();

        for handle in crossed {
            self.notify(handle, ratio);
        }
    }

    fn notify(&self, handle: u64, ratio: f64) {
        // Take the callback out so it can unobserve itself.
        let callback = self
            .watches
            .borrow_mut()
            .get_mut(&handle)
            .and_then(|w| w.callback.take());
        if let Some(mut callback) = callback {
            callback(ratio);
            if let Some(watch) = self.watches.borrow_mut().get_mut(&handle) {
                watch.callback = Some(callback);
            }
        }
    }

    /// Number of live watches.
    pub fn watch_count(&self) -> usize {
        self.watches.borrow().len()
    }
}

impl VisibilityObserver for ViewportSim {
    fn observe(
        &self,
        target: TargetRef,
        threshold: f64,
        callback: Box<dyn FnMut(f64)>,
    ) -> WatchHandle {
        let handle = self.next.get() + 1;
        self.next.set(handle);
        let id = target.id();
        self.watches.borrow_mut().insert(
            handle,
            Watch {
                target: id,
                threshold,
                callback: Some(callback),
            },
        );

        let current = self.ratios.borrow().get(&id).copied();
        if let Some(ratio) = current.filter(|&r| meets_threshold(r, threshold)) {
            self.notify(handle, ratio);
        }
        WatchHandle(handle)
    }

    fn unobserve(&self, handle: WatchHandle) {
        self.watches.borrow_mut().remove(&handle.0);
    }
}

/// Simulated tab/window foreground state. Starts visible.
#[derive(Debug)]
pub struct WindowSim {
    visible: Cell<bool>,
}

impl Default for WindowSim {
    fn default() -> Self {
        Self {
            visible: Cell::new(true),
        }
    }
}

impl WindowSim {
    pub fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }
}

impl HostWindow for WindowSim {
    fn is_visible(&self) -> bool {
        self.visible.get()
    }
}

/// Simulated memory introspection.
#[derive(Debug, Default)]
pub struct MemorySim {
    usage: Cell<Option<MemoryUsage>>,
}

impl MemorySim {
    pub fn set(&self, usage: MemoryUsage) {
        self.usage.set(Some(usage));
    }
}

impl MemoryProbe for MemorySim {
    fn sample(&self) -> Option<MemoryUsage> {
        self.usage.get()
    }
}

// =============================================================================
// BUNDLE
// =============================================================================

/// All headless capabilities wired to one clock.
pub struct HeadlessHost {
    pub clock: Rc<ManualClock>,
    pub timers: Rc<TimerQueue>,
    pub viewport: Rc<ViewportSim>,
    pub window: Rc<WindowSim>,
    pub memory: Rc<MemorySim>,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    pub fn new() -> Self {
        let clock = Rc::new(ManualClock::new());
        Self {
            timers: Rc::new(TimerQueue::new(clock.clone())),
            clock,
            viewport: Rc::new(ViewportSim::new()),
            window: Rc::new(WindowSim::default()),
            memory: Rc::new(MemorySim::default()),
        }
    }

    /// Host exposing every capability.
    pub fn host(&self) -> Host {
        self.bare_host()
            .with_visibility(self.viewport.clone())
            .with_memory(self.memory.clone())
    }

    /// Host exposing only the required capabilities, as on a platform with
    /// no intersection observation and no memory introspection.
    pub fn bare_host(&self) -> Host {
        Host::new(self.clock.clone(), self.timers.clone(), self.window.clone())
    }

    pub fn advance(&self, ms: u64) {
        self.timers.advance(ms);
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}
