//! One-shot visibility triggers.
//!
//! `VisibilityTrigger` wraps the host's [`VisibilityObserver`]: `watch`
//! registers a callback that fires the first time a target's visible
//! fraction reaches the threshold, then unregisters itself. Later
//! fluctuations produce no further calls.
//!
//! On a host without intersection observation every `watch` is a no-op.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::host::{TargetId, TargetRef, VisibilityObserver, WatchHandle, meets_threshold};

type WatchTable = Rc<RefCell<HashMap<TargetId, WatchHandle>>>;

pub struct VisibilityTrigger {
    observer: Rc<dyn VisibilityObserver>,
    watches: WatchTable,
}

impl VisibilityTrigger {
    pub fn new(observer: Rc<dyn VisibilityObserver>) -> Self {
        Self {
            observer,
            watches: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Whether watches can ever fire on this host.
    pub fn is_supported(&self) -> bool {
        self.observer.is_supported()
    }

    /// Call `on_visible(target)` once, when at least `threshold` of `target`
    /// is in view. A target already in view fires during this call.
    ///
    /// Returns `None` without registering anything if the host cannot observe
    /// visibility, if `threshold` is outside [0, 1], or if `target` is already
    /// being watched.
    pub fn watch(
        &self,
        target: TargetRef,
        threshold: f64,
        on_visible: impl FnOnce(TargetRef) + 'static,
    ) -> Option<WatchHandle> {
        let target_id = target.id();
        if !self.observer.is_supported() {
            debug!(%target_id, "visibility observation unsupported, watch ignored");
            return None;
        }
        if !(0.0..=1.0).contains(&threshold) {
            warn!(%target_id, threshold, "visibility threshold outside [0, 1], watch ignored");
            return None;
        }
        if self.watches.borrow().contains_key(&target_id) {
            debug!(%target_id, "target already watched");
            return None;
        }

        let mut pending: Option<Box<dyn FnOnce(TargetRef)>> = Some(Box::new(on_visible));
        let watches: Weak<RefCell<HashMap<TargetId, WatchHandle>>> = Rc::downgrade(&self.watches);
        let observer: Weak<dyn VisibilityObserver> = Rc::downgrade(&self.observer);
        let watched = target.clone();
        let fired = Rc::new(Cell::new(false));
        let fired_in_callback = fired.clone();

        let handle = self.observer.observe(
            target,
            threshold,
            Box::new(move |ratio| {
                if !meets_threshold(ratio, threshold) {
                    return;
                }
                let Some(on_visible) = pending.take() else {
                    return;
                };
                fired_in_callback.set(true);
                let handle = watches
                    .upgrade()
                    .and_then(|w| w.borrow_mut().remove(&watched.id()));
                if let (Some(handle), Some(observer)) = (handle, observer.upgrade()) {
                    observer.unobserve(handle);
                }
                trace!(target_id = %watched.id(), ratio, "target became visible");
                on_visible(watched.clone());
            }),
        );

        // Already in view: the observer answered before returning a handle.
        if fired.get() {
            self.observer.unobserve(handle);
        } else {
            self.watches.borrow_mut().insert(target_id, handle);
        }
        Some(handle)
    }

    /// Stop watching `target` without firing.
    pub fn unwatch(&self, target: TargetId) -> bool {
        let handle = self.watches.borrow_mut().remove(&target);
        match handle {
            Some(handle) => {
                self.observer.unobserve(handle);
                true
            }
            None => false,
        }
    }

    pub fn is_watching(&self, target: TargetId) -> bool {
        self.watches.borrow().contains_key(&target)
    }

    pub fn active_watches(&self) -> usize {
        self.watches.borrow().len()
    }
}

impl Drop for VisibilityTrigger {
    fn drop(&mut self) {
        for (_, handle) in self.watches.borrow_mut().drain() {
            self.observer.unobserve(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NoopVisibility;
    use crate::host::Target;
    use crate::host::headless::{Element, ViewportSim};
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, impl FnOnce(TargetRef) + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, move |_: TargetRef| c.set(c.get() + 1))
    }

    #[test]
    fn test_fires_once_then_unregisters() {
        let viewport = Rc::new(ViewportSim::new());
        let trigger = VisibilityTrigger::new(viewport.clone());
        let el = Element::new("section");
        let (count, on_visible) = counter();

        assert!(trigger.watch(el.clone(), 0.25, on_visible).is_some());
        assert!(trigger.is_watching(el.id()));

        viewport.set_ratio(el.as_ref(), 0.1);
        assert_eq!(count.get(), 0);
        viewport.set_ratio(el.as_ref(), 0.5);
        assert_eq!(count.get(), 1);

        for ratio in [0.0, 0.9, 0.1, 1.0] {
            viewport.set_ratio(el.as_ref(), ratio);
        }
        assert_eq!(count.get(), 1);
        assert!(!trigger.is_watching(el.id()));
        assert_eq!(viewport.watch_count(), 0);
    }

    #[test]
    fn test_callback_receives_target() {
        let viewport = Rc::new(ViewportSim::new());
        let trigger = VisibilityTrigger::new(viewport.clone());
        let el = Element::new("section");
        let seen = Rc::new(Cell::new(None));
        let out = seen.clone();

        trigger.watch(el.clone(), 0.1, move |t| out.set(Some(t.id())));
        viewport.set_ratio(el.as_ref(), 1.0);
        assert_eq!(seen.get(), Some(el.id()));
    }

    #[test]
    fn test_unsupported_host_is_noop() {
        let trigger = VisibilityTrigger::new(Rc::new(NoopVisibility::default()));
        let el = Element::new("section");
        let (count, on_visible) = counter();

        assert!(!trigger.is_supported());
        assert!(trigger.watch(el.clone(), 0.1, on_visible).is_none());
        assert_eq!(trigger.active_watches(), 0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_rejects_bad_threshold_and_duplicates() {
        let viewport = Rc::new(ViewportSim::new());
        let trigger = VisibilityTrigger::new(viewport.clone());
        let el = Element::new("section");

        assert!(trigger.watch(el.clone(), 1.5, |_| {}).is_none());
        assert!(trigger.watch(el.clone(), f64::NAN, |_| {}).is_none());
        assert!(trigger.watch(el.clone(), 0.2, |_| {}).is_some());
        assert!(trigger.watch(el.clone(), 0.2, |_| {}).is_none());
        assert_eq!(viewport.watch_count(), 1);
    }

    #[test]
    fn test_target_already_in_view_fires_on_watch() {
        let viewport = Rc::new(ViewportSim::new());
        let trigger = VisibilityTrigger::new(viewport.clone());
        let el = Element::new("section");
        let (count, on_visible) = counter();

        viewport.set_ratio(el.as_ref(), 0.8);
        assert!(trigger.watch(el.clone(), 0.5, on_visible).is_some());
        assert_eq!(count.get(), 1);
        assert!(!trigger.is_watching(el.id()));
        assert_eq!(viewport.watch_count(), 0);

        viewport.set_ratio(el.as_ref(), 0.0);
        viewport.set_ratio(el.as_ref(), 1.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_zero_threshold_fires_on_any_visibility() {
        let viewport = Rc::new(ViewportSim::new());
        let trigger = VisibilityTrigger::new(viewport.clone());
        let el = Element::new("section");
        let (count, on_visible) = counter();

        trigger.watch(el.clone(), 0.0, on_visible);
        viewport.set_ratio(el.as_ref(), 0.0);
        assert_eq!(count.get(), 0);
        viewport.set_ratio(el.as_ref(), 0.01);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_unwatch_prevents_firing() {
        let viewport = Rc::new(ViewportSim::new());
        let trigger = VisibilityTrigger::new(viewport.clone());
        let el = Element::new("section");
        let (count, on_visible) = counter();

        trigger.watch(el.clone(), 0.1, on_visible);
        assert!(trigger.unwatch(el.id()));
        assert!(!trigger.unwatch(el.id()));
        viewport.set_ratio(el.as_ref(), 1.0);
        assert_eq!(count.get(), 0);
    }
}
