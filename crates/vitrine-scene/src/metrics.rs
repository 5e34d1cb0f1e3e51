//! Page performance and error counters.
//!
//! `MetricsSink` accumulates the load time (taken once, on the first paint
//! opportunity after [`MetricsSink::start`]), a periodic memory sample, and
//! monotonically increasing error and rejection counters. It is also the
//! [`ErrorSink`] the animation engine reports failed runs to.
//!
//! Counters never reset while the page lives.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};
use vitrine_config::MetricsConfig;

use crate::error::{Result, SceneError};
use crate::host::{Clock, ErrorSink, Host, MemoryProbe, MemoryUsage, Scheduler, TimerHandle};

/// Read-only copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Milliseconds from page start to first paint.
    pub load_time_ms: Option<u64>,
    /// Most recent memory reading.
    pub memory: Option<MemoryUsage>,
    pub memory_samples: u64,
    pub error_count: u64,
    pub rejection_count: u64,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct MetricsState {
    snapshot: MetricsSnapshot,
    started: bool,
    sample_timer: Option<TimerHandle>,
}

struct MetricsCore {
    clock: Rc<dyn Clock>,
    scheduler: Rc<dyn Scheduler>,
    memory: Option<Rc<dyn MemoryProbe>>,
    sample_interval_ms: u64,
    state: RefCell<MetricsState>,
}

impl Drop for MetricsCore {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().sample_timer.take() {
            self.scheduler.cancel(timer);
        }
    }
}

#[derive(Clone)]
pub struct MetricsSink {
    core: Rc<MetricsCore>,
}

impl MetricsSink {
    /// Fails if the memory sample interval is zero.
    pub fn new(host: &Host, config: &MetricsConfig) -> Result<Self> {
        if config.memory_sample_interval_ms == 0 {
            return Err(SceneError::InvalidInput(
                "memory sample interval must be positive".to_string(),
            ));
        }
        Ok(Self {
            core: Rc::new(MetricsCore {
                clock: host.clock.clone(),
                scheduler: host.scheduler.clone(),
                memory: host.memory.clone(),
                sample_interval_ms: config.memory_sample_interval_ms,
                state: RefCell::new(MetricsState::default()),
            }),
        })
    }

    /// Schedule the load-time reading for the next paint opportunity and,
    /// if the host can introspect memory, the periodic memory sample.
    ///
    /// Only the first call has any effect.
    pub fn start(&self) {
        {
            let mut state = self.core.state.borrow_mut();
            if state.started {
                return;
            }
            state.started = true;
        }

        let weak = Rc::downgrade(&self.core);
        self.core.scheduler.schedule(
            0,
            Box::new(move || {
                if let Some(sink) = Self::upgrade(&weak) {
                    sink.record_load();
                }
            }),
        );

        if self.core.memory.is_some() {
            self.arm_sample();
        } else {
            debug!("memory introspection unavailable, sampling disabled");
        }
    }

    /// Record the load time as of now. Ignored after the first reading.
    pub fn record_load(&self) {
        let now = self.core.clock.now_ms();
        let mut state = self.core.state.borrow_mut();
        if state.snapshot.load_time_ms.is_none() {
            state.snapshot.load_time_ms = Some(now);
            debug!(load_time_ms = now, "page load recorded");
        }
    }

    /// Take one memory reading now. Returns `false` if the host has no
    /// memory introspection or the probe returned nothing.
    pub fn sample_memory(&self) -> bool {
        let Some(usage) = self.core.memory.as_ref().and_then(|probe| probe.sample()) else {
            return false;
        };
        let mut state = self.core.state.borrow_mut();
        state.snapshot.memory = Some(usage);
        state.snapshot.memory_samples += 1;
        trace!(used = usage.used_bytes, total = usage.total_bytes, "memory sampled");
        true
    }

    /// Count an unhandled rejection of an asynchronous operation.
    pub fn record_rejection(&self, reason: &str) {
        warn!(reason, "unhandled rejection");
        let mut state = self.core.state.borrow_mut();
        state.snapshot.rejection_count += 1;
        state.snapshot.error_count += 1;
        state.snapshot.last_error = Some(reason.to_string());
    }

    /// Count an error raised outside any animation run.
    pub fn record_uncaught_error(&self, message: &str) {
        error!(message, "uncaught error");
        let mut state = self.core.state.borrow_mut();
        state.snapshot.error_count += 1;
        state.snapshot.last_error = Some(message.to_string());
    }

    pub fn error_count(&self) -> u64 {
        self.core.state.borrow().snapshot.error_count
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.core.state.borrow().snapshot.clone()
    }

    /// Stop periodic sampling. Counters are kept.
    pub fn stop(&self) {
        let timer = self.core.state.borrow_mut().sample_timer.take();
        if let Some(timer) = timer {
            self.core.scheduler.cancel(timer);
        }
    }

    fn upgrade(weak: &Weak<MetricsCore>) -> Option<Self> {
        weak.upgrade().map(|core| Self { core })
    }

    fn arm_sample(&self) {
        let weak = Rc::downgrade(&self.core);
        let timer = self.core.scheduler.schedule(
            self.core.sample_interval_ms,
            Box::new(move || {
                if let Some(sink) = Self::upgrade(&weak) {
                    sink.core.state.borrow_mut().sample_timer = None;
                    sink.sample_memory();
                    sink.arm_sample();
                }
            }),
        );
        self.core.state.borrow_mut().sample_timer = Some(timer);
    }
}

impl ErrorSink for MetricsSink {
    fn report_error(&self, context: &str, err: &SceneError) {
        error!(context, error = %err, "runtime error");
        let mut state = self.core.state.borrow_mut();
        state.snapshot.error_count += 1;
        state.snapshot.last_error = Some(format!("{context}: {err}"));
    }
}
