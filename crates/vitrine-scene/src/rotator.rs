//! Dashboard-style slide rotator.
//!
//! A `Rotator` owns an ordered list of slides, the index of the active one,
//! and an auto-advance timer. Slide changes are animated through the
//! [`StagedAnimationEngine`]; auto-advance consults the
//! [`InteractionDebouncer`] and the host window state first.
//!
//! # States
//!
//! ```text
//!           start()                 pause()
//!   Idle ───────────► AutoPlaying ◄─────────► Paused
//!     │                               resume()   ▲
//!     └──────────────────────────────────────────┘
//!                       pause()
//! ```
//!
//! Only one auto-advance timer is ever armed; `start` while auto-playing and
//! `pause` while paused are no-ops. Hover only ever pauses a playing
//! rotator, so a rotator the page never started stays idle.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use vitrine_config::RotatorConfig;

use crate::animation::{StagedAnimation, StagedAnimationEngine};
use crate::error::{Result, SceneError};
use crate::host::{Host, HostWindow, Scheduler, TargetRef, TimerHandle};
use crate::interaction::InteractionDebouncer;

pub const ACTIVE_CLASS: &str = "active";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotatorMode {
    Idle,
    AutoPlaying,
    Paused,
}

#[derive(Debug)]
struct RotatorState {
    current: usize,
    mode: RotatorMode,
    tick_timer: Option<TimerHandle>,
    resume_timer: Option<TimerHandle>,
    // Paused by the pointer rather than by the page.
    hover_paused: bool,
}

struct RotatorCore {
    widget: String,
    slides: Vec<TargetRef>,
    controls: Vec<TargetRef>,
    config: RotatorConfig,
    engine: StagedAnimationEngine,
    debouncer: Rc<InteractionDebouncer>,
    scheduler: Rc<dyn Scheduler>,
    window: Rc<dyn HostWindow>,
    state: RefCell<RotatorState>,
}

impl Drop for RotatorCore {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for timer in [state.tick_timer.take(), state.resume_timer.take()]
            .into_iter()
            .flatten()
        {
            self.scheduler.cancel(timer);
        }
    }
}

/// Handle to a rotator. Clones drive the same slides.
#[derive(Clone)]
pub struct Rotator {
    core: Rc<RotatorCore>,
}

impl Rotator {
    /// Build a rotator over `slides`, with one optional tab control per slide.
    ///
    /// The first slide carrying the `active` class becomes current; if none
    /// does, slide 0 is marked active. Fails if `slides` is empty or the
    /// auto-advance interval is zero.
    pub fn new(
        widget: impl Into<String>,
        slides: Vec<TargetRef>,
        controls: Vec<TargetRef>,
        host: &Host,
        engine: StagedAnimationEngine,
        debouncer: Rc<InteractionDebouncer>,
        config: RotatorConfig,
    ) -> Result<Self> {
        let widget = widget.into();
        if slides.is_empty() {
            return Err(SceneError::InvalidInput(format!(
                "rotator `{widget}` has no slides"
            )));
        }
        if config.interval_ms == 0 {
            return Err(SceneError::InvalidInput(format!(
                "rotator `{widget}` has a zero auto-advance interval"
            )));
        }
        if !controls.is_empty() && controls.len() != slides.len() {
            warn!(
                widget = %widget,
                slides = slides.len(),
                controls = controls.len(),
                "control count does not match slide count"
            );
        }

        let current = slides
            .iter()
            .position(|s| s.has_class(ACTIVE_CLASS))
            .unwrap_or(0);
        slides[current].add_class(ACTIVE_CLASS);

        let rotator = Self {
            core: Rc::new(RotatorCore {
                widget,
                slides,
                controls,
                config,
                engine,
                debouncer,
                scheduler: host.scheduler.clone(),
                window: host.window.clone(),
                state: RefCell::new(RotatorState {
                    current,
                    mode: RotatorMode::Idle,
                    tick_timer: None,
                    resume_timer: None,
                    hover_paused: false,
                }),
            }),
        };
        rotator.sync_controls(current);
        Ok(rotator)
    }

    pub fn widget(&self) -> &str {
        &self.core.widget
    }

    pub fn len(&self) -> usize {
        self.core.slides.len()
    }

    /// Always false: a rotator has at least one slide.
    pub fn is_empty(&self) -> bool {
        self.core.slides.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.core.state.borrow().current
    }

    pub fn mode(&self) -> RotatorMode {
        self.core.state.borrow().mode
    }

    /// Whether an auto-advance tick is pending.
    pub fn is_timer_armed(&self) -> bool {
        self.core.state.borrow().tick_timer.is_some()
    }

    /// Whether a deferred resume is pending.
    pub fn is_resume_pending(&self) -> bool {
        self.core.state.borrow().resume_timer.is_some()
    }

    /// Whether the page should start this rotator on load.
    pub fn auto_start(&self) -> bool {
        self.core.config.auto_start
    }

    /// Time of the last user interaction with this widget.
    pub fn last_interaction(&self) -> Option<u64> {
        self.core.debouncer.last_interaction(&self.core.widget)
    }

    /// Idle/Paused → AutoPlaying, arming the auto-advance timer.
    pub fn start(&self) {
        {
            let mut state = self.core.state.borrow_mut();
            if state.mode == RotatorMode::AutoPlaying {
                trace!(widget = %self.core.widget, "already auto-playing");
                return;
            }
            state.mode = RotatorMode::AutoPlaying;
            state.hover_paused = false;
        }
        self.cancel_resume_timer();
        self.arm_tick();
        debug!(widget = %self.core.widget, "auto-play started");
    }

    /// Any state → Paused. Cancels the auto-advance timer and any deferred
    /// resume.
    pub fn pause(&self) {
        let timers = {
            let mut state = self.core.state.borrow_mut();
            state.mode = RotatorMode::Paused;
            state.hover_paused = false;
            [state.tick_timer.take(), state.resume_timer.take()]
        };
        for timer in timers.into_iter().flatten() {
            self.core.scheduler.cancel(timer);
        }
        trace!(widget = %self.core.widget, "paused");
    }

    /// Paused → AutoPlaying, unless the widget was interacted with during
    /// the last `resume_quiet_ms`.
    ///
    /// Returns whether the rotator is auto-playing afterwards.
    pub fn resume(&self) -> bool {
        match self.mode() {
            RotatorMode::AutoPlaying => return true,
            RotatorMode::Idle => return false,
            RotatorMode::Paused => {}
        }
        if self
            .core
            .debouncer
            .is_recently_active(&self.core.widget, self.core.config.resume_quiet_ms)
        {
            debug!(widget = %self.core.widget, "resume deferred: recent interaction");
            return false;
        }
        self.start();
        true
    }

    /// Try to resume once the quiet period has elapsed, re-deferring for as
    /// long as interactions keep arriving. Only meaningful while paused.
    pub fn resume_later(&self) {
        if self.mode() != RotatorMode::Paused {
            return;
        }
        let quiet = self.core.config.resume_quiet_ms;
        let delay = match self.core.debouncer.elapsed_since(&self.core.widget) {
            Some(elapsed) if elapsed < quiet => quiet - elapsed,
            _ => quiet,
        };

        self.cancel_resume_timer();
        let weak = Rc::downgrade(&self.core);
        let timer = self.core.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(rotator) = Self::upgrade(&weak) {
                    rotator.core.state.borrow_mut().resume_timer = None;
                    if !rotator.resume() {
                        rotator.resume_later();
                    }
                }
            }),
        );
        self.core.state.borrow_mut().resume_timer = Some(timer);
    }

    /// Show slide `index` as a user action.
    ///
    /// Rejected (logged, no state change, no animation) if `index` is out of
    /// range or already current.
    pub fn switch_to(&self, index: usize) -> bool {
        let current = self.current_index();
        if index >= self.len() {
            warn!(widget = %self.core.widget, index, len = self.len(), "slide index out of range");
            return false;
        }
        if index == current {
            debug!(widget = %self.core.widget, index, "slide already active");
            return false;
        }
        self.core.debouncer.record_interaction(&self.core.widget);
        self.transition(current, index);
        true
    }

    /// Pointer entered the widget. Pauses auto-play, or holds off a resume
    /// still pending from an earlier hover. Idle and page-paused rotators are
    /// left alone.
    pub fn on_hover(&self) {
        let pausable = {
            let state = self.core.state.borrow();
            state.mode == RotatorMode::AutoPlaying || state.hover_paused
        };
        if pausable {
            self.pause();
            self.core.state.borrow_mut().hover_paused = true;
        }
    }

    /// Pointer left the widget. Resumes, after the quiet period, only what
    /// [`Rotator::on_hover`] paused.
    pub fn on_leave(&self) {
        if self.core.state.borrow().hover_paused {
            self.resume_later();
        }
    }

    fn upgrade(weak: &Weak<RotatorCore>) -> Option<Self> {
        weak.upgrade().map(|core| Self { core })
    }

    fn cancel_resume_timer(&self) {
        let timer = self.core.state.borrow_mut().resume_timer.take();
        if let Some(timer) = timer {
            self.core.scheduler.cancel(timer);
        }
    }

    fn arm_tick(&self) {
        let previous = self.core.state.borrow_mut().tick_timer.take();
        if let Some(previous) = previous {
            self.core.scheduler.cancel(previous);
        }
        let weak = Rc::downgrade(&self.core);
        let timer = self.core.scheduler.schedule(
            self.core.config.interval_ms,
            Box::new(move || {
                if let Some(rotator) = Self::upgrade(&weak) {
                    rotator.on_tick();
                }
            }),
        );
        self.core.state.borrow_mut().tick_timer = Some(timer);
    }

    fn on_tick(&self) {
        {
            let mut state = self.core.state.borrow_mut();
            state.tick_timer = None;
            if state.mode != RotatorMode::AutoPlaying {
                return;
            }
        }

        if !self.core.window.is_visible() {
            trace!(widget = %self.core.widget, "host hidden, tick skipped");
        } else if self
            .core
            .debouncer
            .is_recently_active(&self.core.widget, self.core.config.suppress_window_ms)
        {
            trace!(widget = %self.core.widget, "recent interaction, tick skipped");
        } else {
            let current = self.current_index();
            let next = (current + 1) % self.len();
            if next != current {
                self.transition(current, next);
            }
        }

        // The transition may have paused us through a mutation hook.
        if self.mode() == RotatorMode::AutoPlaying {
            self.arm_tick();
        }
    }

    fn transition(&self, from: usize, to: usize) {
        self.core.state.borrow_mut().current = to;
        self.sync_controls(to);

        let config = &self.core.config;
        let outgoing = StagedAnimation::new("slide-out")
            .then_styles(0, &[("opacity", "0"), ("transform", "translateX(-20px)")])
            .then_remove_class(config.exit_delay_ms, ACTIVE_CLASS);
        let incoming = StagedAnimation::new("slide-in")
            .then_add_class(0, ACTIVE_CLASS)
            .then_styles(0, &[("opacity", "0"), ("transform", "translateX(20px)")])
            .then_styles(config.frame_ms, &[("opacity", "1"), ("transform", "translateX(0)")]);

        for (slide, animation) in [(from, outgoing), (to, incoming)] {
            if let Err(error) = self.core.engine.run(self.core.slides[slide].clone(), animation) {
                warn!(widget = %self.core.widget, slide, %error, "slide transition not started");
            }
        }
        debug!(widget = %self.core.widget, from, to, "slide changed");
    }

    fn sync_controls(&self, active: usize) {
        for (i, control) in self.core.controls.iter().enumerate() {
            if i == active {
                control.add_class(ACTIVE_CLASS);
                control.set_attribute("aria-selected", "true");
            } else {
                control.remove_class(ACTIVE_CLASS);
                control.set_attribute("aria-selected", "false");
            }
        }
    }
}
