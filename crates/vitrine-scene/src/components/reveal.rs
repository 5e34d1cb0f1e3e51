//! Scroll-triggered reveal.
//!
//! Registered sections start hidden and offset. The first time a section is
//! visible past the configured threshold it fades in, and each of its
//! `.reveal-item` children follows `stagger_ms` after the previous one.
//! A host without visibility observation reveals sections on registration.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, warn};
use vitrine_config::RevealConfig;

use crate::animation::{StagedAnimation, StagedAnimationEngine};
use crate::error::Result;
use crate::host::{TargetId, TargetRef, VisibilityObserver};
use crate::visibility::VisibilityTrigger;

pub const ITEM_SELECTOR: &str = ".reveal-item";
pub const REVEALED_CLASS: &str = "revealed";

pub struct ScrollReveal {
    engine: StagedAnimationEngine,
    trigger: VisibilityTrigger,
    config: RevealConfig,
    revealed: Rc<Cell<usize>>,
}

impl ScrollReveal {
    pub fn new(
        engine: StagedAnimationEngine,
        visibility: Rc<dyn VisibilityObserver>,
        config: RevealConfig,
    ) -> Self {
        Self {
            engine,
            trigger: VisibilityTrigger::new(visibility),
            config,
            revealed: Rc::new(Cell::new(0)),
        }
    }

    /// Hide `section` and reveal it once it scrolls into view.
    ///
    /// Returns `false` if the section is already registered or cannot be
    /// styled.
    pub fn register(&self, section: TargetRef) -> bool {
        let id = section.id();
        if self.trigger.is_watching(id) {
            debug!(target = %id, "section already registered");
            return false;
        }
        if let Err(error) = self.hide(&section) {
            warn!(target = %id, %error, "section not registered");
            return false;
        }

        if !self.trigger.is_supported() {
            reveal(&self.engine, &self.config, &self.revealed, &section);
            return true;
        }

        let engine = self.engine.clone();
        let config = self.config.clone();
        let revealed = self.revealed.clone();
        self.trigger
            .watch(section, self.config.threshold, move |section| {
                reveal(&engine, &config, &revealed, &section);
            })
            .is_some()
    }

    /// Sections revealed so far.
    pub fn revealed_count(&self) -> usize {
        self.revealed.get()
    }

    /// Sections still waiting to become visible.
    pub fn pending_count(&self) -> usize {
        self.trigger.active_watches()
    }

    pub fn is_pending(&self, section: TargetId) -> bool {
        self.trigger.is_watching(section)
    }

    fn hide(&self, section: &TargetRef) -> Result<()> {
        let offset = format!("translateY({}px)", self.config.offset_px);
        for target in std::iter::once(section.clone()).chain(section.query_all(ITEM_SELECTOR)) {
            target.set_style("opacity", "0")?;
            target.set_style("transform", &offset)?;
        }
        Ok(())
    }
}

fn reveal(
    engine: &StagedAnimationEngine,
    config: &RevealConfig,
    revealed: &Cell<usize>,
    section: &TargetRef,
) {
    let shown: &[(&str, &str)] = &[("opacity", "1"), ("transform", "translateY(0)")];

    let fade_in = StagedAnimation::new("reveal")
        .then_styles(0, shown)
        .then_add_class(0, REVEALED_CLASS);
    if let Err(error) = engine.run(section.clone(), fade_in) {
        warn!(target = %section.id(), %error, "reveal not started");
        return;
    }

    let items = section.query_all(ITEM_SELECTOR);
    let count = items.len();
    for (index, item) in items.into_iter().enumerate() {
        let item_in = StagedAnimation::new("reveal-item")
            .then_styles(index as u64 * config.stagger_ms, shown)
            .then_add_class(0, REVEALED_CLASS);
        if let Err(error) = engine.run(item, item_in) {
            warn!(index, %error, "reveal item not started");
        }
    }

    revealed.set(revealed.get() + 1);
    debug!(target = %section.id(), items = count, "section revealed");
}
