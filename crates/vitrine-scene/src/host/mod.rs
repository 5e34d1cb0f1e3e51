//! Capabilities the runtime requires from its host page.
//!
//! Everything the components touch outside their own state goes through the
//! traits in this module: the clock, delayed callbacks, viewport visibility,
//! the foreground state of the window, memory introspection, and the
//! elements themselves. Optional platform features are selected once when a
//! [`Host`] is built; a missing capability is replaced by a no-op stand-in so
//! component code never branches on feature presence.
//!
//! [`headless`] provides a deterministic in-process implementation used by the
//! demo binary and by the tests.

pub mod headless;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};

/// Stable identity of one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

impl TargetId {
    /// Generate a new unique target ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// Shared handle to an element.
pub type TargetRef = Rc<dyn Target>;

/// A single DOM-like element whose style, classes and attributes can be read
/// and written.
///
/// Methods take `&self`: elements are shared handles owned by the page, and
/// the runtime only borrows them for the duration of a run.
pub trait Target {
    fn id(&self) -> TargetId;

    /// Current inline value of a style property.
    fn style(&self, property: &str) -> Option<String>;

    /// Write an inline style property. Fails if the element can no longer be
    /// written (e.g. it was removed from the page).
    fn set_style(&self, property: &str, value: &str) -> Result<()>;

    fn add_class(&self, class: &str);
    fn remove_class(&self, class: &str);
    fn has_class(&self, class: &str) -> bool;

    /// All descendants matching `selector`, in document order.
    fn query_all(&self, selector: &str) -> Vec<TargetRef>;

    /// First descendant matching `selector`.
    fn query(&self, selector: &str) -> Option<TargetRef> {
        self.query_all(selector).into_iter().next()
    }

    fn attribute(&self, name: &str) -> Option<String>;
    fn set_attribute(&self, name: &str, value: &str);
    fn set_text(&self, text: &str);
}

/// Milliseconds since the page started.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Handle to a pending delayed callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Delayed callbacks on the single UI thread.
pub trait Scheduler {
    /// Run `callback` once after `delay_ms`. The callback never runs inside
    /// this call, even for a zero delay.
    fn schedule(&self, delay_ms: u64, callback: Box<dyn FnOnce()>) -> TimerHandle;

    /// Drop a pending callback. Returns `false` if it already ran or was
    /// already cancelled.
    fn cancel(&self, handle: TimerHandle) -> bool;
}

/// Handle to a registered visibility watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(pub u64);

/// Whether a visible fraction counts as meeting `threshold`. A zero
/// threshold means any part of the target is in view.
pub fn meets_threshold(ratio: f64, threshold: f64) -> bool {
    if threshold <= 0.0 {
        ratio > 0.0
    } else {
        ratio >= threshold
    }
}

/// Viewport intersection service.
///
/// The callback receives the visible fraction of the target whenever it
/// crosses `threshold` in either direction, and once when observation starts
/// if the target already meets it. That first call may happen before
/// `observe` returns.
pub trait VisibilityObserver {
    fn observe(
        &self,
        target: TargetRef,
        threshold: f64,
        callback: Box<dyn FnMut(f64)>,
    ) -> WatchHandle;

    fn unobserve(&self, handle: WatchHandle);

    /// Whether this observer can ever call back.
    fn is_supported(&self) -> bool {
        true
    }
}

/// Stand-in for platforms without intersection observation. Watches are
/// accepted and never fire.
#[derive(Debug, Default)]
pub struct NoopVisibility {
    next: Cell<u64>,
}

impl VisibilityObserver for NoopVisibility {
    fn observe(&self, _: TargetRef, _: f64, _: Box<dyn FnMut(f64)>) -> WatchHandle {
        let id = self.next.get() + 1;
        self.next.set(id);
        WatchHandle(id)
    }

    fn unobserve(&self, _: WatchHandle) {}

    fn is_supported(&self) -> bool {
        false
    }
}

/// Foreground state of the host tab/window.
pub trait HostWindow {
    fn is_visible(&self) -> bool;
}

/// One memory reading from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub limit_bytes: u64,
}

/// Heap introspection, where the platform offers it.
pub trait MemoryProbe {
    fn sample(&self) -> Option<MemoryUsage>;
}

/// Sink for non-fatal failures.
pub trait ErrorSink {
    fn report_error(&self, context: &str, error: &SceneError);
}

/// The capability set chosen once at startup.
#[derive(Clone)]
pub struct Host {
    pub clock: Rc<dyn Clock>,
    pub scheduler: Rc<dyn Scheduler>,
    pub visibility: Rc<dyn VisibilityObserver>,
    pub window: Rc<dyn HostWindow>,
    pub memory: Option<Rc<dyn MemoryProbe>>,
}

impl Host {
    /// Host with the required capabilities only. Visibility observation falls
    /// back to [`NoopVisibility`] and memory sampling is disabled.
    pub fn new(
        clock: Rc<dyn Clock>,
        scheduler: Rc<dyn Scheduler>,
        window: Rc<dyn HostWindow>,
    ) -> Self {
        Self {
            clock,
            scheduler,
            visibility: Rc::new(NoopVisibility::default()),
            window,
            memory: None,
        }
    }

    pub fn with_visibility(mut self, visibility: Rc<dyn VisibilityObserver>) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_memory(mut self, memory: Rc<dyn MemoryProbe>) -> Self {
        self.memory = Some(memory);
        self
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("now_ms", &self.clock.now_ms())
            .field("visibility_supported", &self.visibility.is_supported())
            .field("memory_supported", &self.memory.is_some())
            .finish()
    }
}
