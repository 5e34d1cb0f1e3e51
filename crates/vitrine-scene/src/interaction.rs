//! Per-widget "last interaction" tracking.
//!
//! Components record a timestamp whenever the user touches a widget and ask
//! [`InteractionDebouncer::is_recently_active`] before doing anything
//! automatic to it. State lives only for the lifetime of the page.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::host::Clock;

pub struct InteractionDebouncer {
    clock: Rc<dyn Clock>,
    last: RefCell<HashMap<String, u64>>,
}

impl InteractionDebouncer {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            last: RefCell::new(HashMap::new()),
        }
    }

    /// Record that `widget` was just interacted with.
    pub fn record_interaction(&self, widget: &str) {
        let now = self.clock.now_ms();
        trace!(widget, now, "interaction recorded");
        self.last.borrow_mut().insert(widget.to_string(), now);
    }

    /// True iff an interaction with `widget` was recorded less than
    /// `window_ms` ago. A widget never interacted with is not active.
    pub fn is_recently_active(&self, widget: &str, window_ms: u64) -> bool {
        self.elapsed_since(widget)
            .is_some_and(|elapsed| elapsed < window_ms)
    }

    /// Milliseconds since the last recorded interaction with `widget`.
    pub fn elapsed_since(&self, widget: &str) -> Option<u64> {
        let last = self.last.borrow().get(widget).copied()?;
        Some(self.clock.now_ms().saturating_sub(last))
    }

    pub fn last_interaction(&self, widget: &str) -> Option<u64> {
        self.last.borrow().get(widget).copied()
    }

    /// Forget every recorded interaction.
    pub fn clear(&self) {
        self.last.borrow_mut().clear();
    }
}
