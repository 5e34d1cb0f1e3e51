//! Staged animation engine.
//!
//! The engine executes [`StagedAnimation`]s against targets, one step at a
//! time, through the host [`Scheduler`]. It guarantees:
//! - steps of one run are applied strictly in order, each after its own delay
//!   measured from the previous step
//! - at most one run is active per target; starting a run on a busy target
//!   cancels the old run before any step of the new one is applied
//! - a cancelled run never applies another step, because its pending timer
//!   is cleared and its entry removed
//! - a failing step aborts only its own run and is reported to the
//!   [`ErrorSink`]
//!
//! Zero-delay steps are applied in the same turn as the step (or `run` call)
//! before them; any non-zero delay goes through the scheduler.
//!
//! # Usage
//!
//! ```ignore
//! let engine = StagedAnimationEngine::new(host.scheduler.clone(), metrics.clone());
//! let handle = engine.run(slide.clone(), StagedAnimation::new("slide-out")
//!     .then_styles(0, &[("opacity", "0")])
//!     .then_remove_class(150, "active"))?;
//! assert!(engine.is_busy(slide.id()));
//! engine.cancel(handle);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use super::events::{EventQueue, RunEvent};
use super::sequence::StagedAnimation;
use super::types::{RunHandle, RunId};
use crate::error::{Result, SceneError};
use crate::host::{ErrorSink, Scheduler, TargetId, TargetRef, TimerHandle};

struct ActiveRun {
    target: TargetRef,
    animation: Rc<StagedAnimation>,
    /// Index of the next step to apply.
    cursor: usize,
    timer: Option<TimerHandle>,
}

#[derive(Default)]
struct EngineState {
    runs: HashMap<RunId, ActiveRun>,
    /// At most one run per target.
    by_target: HashMap<TargetId, RunId>,
    events: EventQueue,
}

struct EngineCore {
    state: RefCell<EngineState>,
    scheduler: Rc<dyn Scheduler>,
    errors: Rc<dyn ErrorSink>,
}

/// Handle to the engine. Clones share the same runs.
#[derive(Clone)]
pub struct StagedAnimationEngine {
    core: Rc<EngineCore>,
}

impl StagedAnimationEngine {
    pub fn new(scheduler: Rc<dyn Scheduler>, errors: Rc<dyn ErrorSink>) -> Self {
        Self {
            core: Rc::new(EngineCore {
                state: RefCell::new(EngineState::default()),
                scheduler,
                errors,
            }),
        }
    }

    /// Start `animation` on `target`.
    ///
    /// Any run already active on `target` is cancelled first. Fails only if
    /// `animation` has no steps.
    pub fn run(&self, target: TargetRef, animation: StagedAnimation) -> Result<RunHandle> {
        if animation.is_empty() {
            return Err(SceneError::InvalidInput(format!(
                "animation `{}` has no steps",
                animation.name
            )));
        }

        let target_id = target.id();
        if self.cancel_target(target_id) {
            debug!(%target_id, name = %animation.name, "superseding active run");
        }

        let id = RunId::new();
        let first_delay = animation.steps()[0].delay_ms;
        {
            let mut state = self.core.state.borrow_mut();
            state.events.push(RunEvent::Started {
                run_id: id,
                target: target_id,
                name: animation.name.clone(),
            });
            state.runs.insert(
                id,
                ActiveRun {
                    target,
                    animation: Rc::new(animation),
                    cursor: 0,
                    timer: None,
                },
            );
            state.by_target.insert(target_id, id);
        }

        if first_delay == 0 {
            self.advance(id);
        } else {
            self.schedule_step(id, first_delay);
        }

        Ok(RunHandle {
            id,
            target: target_id,
        })
    }

    /// Start `animation` only if `target` has no active run.
    ///
    /// Returns `Ok(None)` when the target is busy.
    pub fn run_if_idle(
        &self,
        target: TargetRef,
        animation: StagedAnimation,
    ) -> Result<Option<RunHandle>> {
        if self.is_busy(target.id()) {
            trace!(target_id = %target.id(), name = %animation.name, "target busy, run skipped");
            return Ok(None);
        }
        self.run(target, animation).map(Some)
    }

    /// Stop a run. Steps already applied stay applied.
    ///
    /// Returns `false` if the run already finished or was cancelled.
    pub fn cancel(&self, handle: RunHandle) -> bool {
        self.cancel_run(handle.id)
    }

    /// Cancel whatever run is active on `target`.
    pub fn cancel_target(&self, target: TargetId) -> bool {
        let id = self.core.state.borrow().by_target.get(&target).copied();
        match id {
            Some(id) => self.cancel_run(id),
            None => false,
        }
    }

    /// Cancel every active run.
    pub fn cancel_all(&self) {
        let ids: Vec<RunId> = self.core.state.borrow().runs.keys().copied().collect();
        for id in ids {
            self.cancel_run(id);
        }
    }

    /// Whether `target` has a run in flight.
    pub fn is_busy(&self, target: TargetId) -> bool {
        self.core.state.borrow().by_target.contains_key(&target)
    }

    /// Whether this particular run is still in flight.
    pub fn is_active(&self, handle: RunHandle) -> bool {
        self.core.state.borrow().runs.contains_key(&handle.id)
    }

    pub fn active_count(&self) -> usize {
        self.core.state.borrow().runs.len()
    }

    /// Drain all pending run events.
    pub fn drain_events(&self) -> Vec<RunEvent> {
        self.core.state.borrow_mut().events.drain().collect()
    }

    pub fn pending_event_count(&self) -> usize {
        self.core.state.borrow().events.len()
    }

    fn cancel_run(&self, id: RunId) -> bool {
        let timer = {
            let mut state = self.core.state.borrow_mut();
            let Some(run) = state.runs.remove(&id) else {
                return false;
            };
            let target_id = run.target.id();
            if state.by_target.get(&target_id) == Some(&id) {
                state.by_target.remove(&target_id);
            }
            state.events.push(RunEvent::Cancelled {
                run_id: id,
                target: target_id,
                name: run.animation.name.clone(),
                applied: run.cursor,
            });
            run.timer
        };
        if let Some(timer) = timer {
            self.core.scheduler.cancel(timer);
        }
        true
    }

    fn schedule_step(&self, id: RunId, delay_ms: u64) {
        let weak: Weak<EngineCore> = Rc::downgrade(&self.core);
        let timer = self.core.scheduler.schedule(
            delay_ms,
            Box::new(move || {
                if let Some(core) = weak.upgrade() {
                    StagedAnimationEngine { core }.on_timer(id);
                }
            }),
        );

        let orphaned = match self.core.state.borrow_mut().runs.get_mut(&id) {
            Some(run) => {
                run.timer = Some(timer);
                false
            }
            None => true,
        };
        if orphaned {
            self.core.scheduler.cancel(timer);
        }
    }

    fn on_timer(&self, id: RunId) {
        if let Some(run) = self.core.state.borrow_mut().runs.get_mut(&id) {
            run.timer = None;
        }
        self.advance(id);
    }

    /// Apply the step at the run's cursor, then keep going through zero-delay
    /// steps until the run completes or must wait on the scheduler.
    fn advance(&self, id: RunId) {
        loop {
            let (target, animation, cursor) = {
                let state = self.core.state.borrow();
                let Some(run) = state.runs.get(&id) else {
                    // Cancelled while the timer was pending.
                    return;
                };
                (run.target.clone(), run.animation.clone(), run.cursor)
            };

            // No engine borrow is held here: the mutation may start or cancel
            // runs, including this one.
            if let Err(error) = animation.steps()[cursor].apply(target.as_ref()) {
                self.fail(id, cursor, error);
                return;
            }

            let next_delay = {
                let mut state = self.core.state.borrow_mut();
                let Some(run) = state.runs.get_mut(&id) else {
                    return;
                };
                run.cursor += 1;
                if run.cursor < animation.len() {
                    Some(animation.steps()[run.cursor].delay_ms)
                } else {
                    let target_id = target.id();
                    state.runs.remove(&id);
                    if state.by_target.get(&target_id) == Some(&id) {
                        state.by_target.remove(&target_id);
                    }
                    state.events.push(RunEvent::Completed {
                        run_id: id,
                        target: target_id,
                        name: animation.name.clone(),
                    });
                    trace!(%target_id, name = %animation.name, "run completed");
                    None
                }
            };

            match next_delay {
                None => return,
                Some(0) => continue,
                Some(delay) => {
                    self.schedule_step(id, delay);
                    return;
                }
            }
        }
    }

    fn fail(&self, id: RunId, step: usize, error: SceneError) {
        let name = {
            let mut state = self.core.state.borrow_mut();
            let Some(run) = state.runs.remove(&id) else {
                return;
            };
            let target_id = run.target.id();
            if state.by_target.get(&target_id) == Some(&id) {
                state.by_target.remove(&target_id);
            }
            state.events.push(RunEvent::Failed {
                run_id: id,
                target: target_id,
                name: run.animation.name.clone(),
                step,
                error: error.to_string(),
            });
            run.animation.name.clone()
        };
        warn!(name = %name, step, %error, "animation step failed, run aborted");
        self.core
            .errors
            .report_error(&format!("animation `{name}` step {step}"), &error);
    }
}

// The engine lives on the UI thread only.
static_assertions::assert_not_impl_any!(StagedAnimationEngine: Send, Sync);
