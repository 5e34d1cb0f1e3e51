//! Headless landing-page demo.
//!
//! Builds a small product page on the in-process host, replays a scripted
//! minute of visitor activity, and prints the metrics snapshot and run
//! statistics as JSON.
//!
//! Usage: `vitrine [config.toml]`. Without an argument the configuration is
//! read from `vitrine.toml` if present. `VITRINE_*` variables override either.

use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use vitrine_config::VitrineConfig;
use vitrine_scene::animation::RunEvent;
use vitrine_scene::host::headless::{Element, HeadlessHost};
use vitrine_scene::host::{MemoryUsage, TargetRef};
use vitrine_scene::{
    BillingPeriod, Component, ComponentRegistry, EventRouter, FeatureCardHover,
    InteractionDebouncer, MetricsSink, PageEvent, PricingToggle, Rotator, ScrollReveal,
    StagedAnimationEngine,
};

/// One scripted moment of the visit.
enum Cue {
    Event(PageEvent),
    /// Set the visible fraction of a page section.
    Scroll(&'static str, f64),
    TabHidden,
    TabVisible,
    Memory(u64),
}

struct DemoPage {
    host: HeadlessHost,
    registry: ComponentRegistry,
    engine: StagedAnimationEngine,
    sections: BTreeMap<&'static str, Rc<Element>>,
    // Kept alive so its visibility watches stay registered.
    _reveal: ScrollReveal,
}

fn load_config() -> Result<VitrineConfig> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => VitrineConfig::load_from_file(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => VitrineConfig::load_or_default(),
    };
    config.merge_with_env();
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn section(class: &str, items: usize) -> Rc<Element> {
    (0..items).fold(Element::new("section").with_class(class), |s, _| {
        s.with_child(Element::new("div").with_class("reveal-item"))
    })
}

fn build_page(config: &VitrineConfig) -> Result<DemoPage> {
    let host = HeadlessHost::new();
    let caps = host.host();
    let metrics =
        MetricsSink::new(&caps, &config.metrics).context("failed to build metrics sink")?;
    let engine = StagedAnimationEngine::new(caps.scheduler.clone(), Rc::new(metrics.clone()));
    let mut registry = ComponentRegistry::new(
        FeatureCardHover::new(engine.clone(), config.hover.clone()),
        metrics.clone(),
    );

    let slides: Vec<TargetRef> = ["overview", "analytics", "reports", "alerts"]
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let slide = Element::new("div")
                .with_class("dashboard-slide")
                .with_attr("data-slide", name);
            (if i == 0 { slide.with_class("active") } else { slide }) as TargetRef
        })
        .collect();
    let tabs: Vec<TargetRef> = (0..slides.len())
        .map(|_| Element::new("button").with_class("dashboard-tab") as TargetRef)
        .collect();
    let rotator = Rotator::new(
        "dashboard",
        slides,
        tabs,
        &caps,
        engine.clone(),
        Rc::new(InteractionDebouncer::new(caps.clock.clone())),
        config.rotator.clone(),
    )
    .context("failed to build dashboard rotator")?;
    registry.register("dashboard", Component::Rotator(rotator));

    let cards: Vec<TargetRef> = [("$0", "$0"), ("$19", "$190"), ("$49", "$490")]
        .iter()
        .map(|(monthly, annual)| {
            Element::new("div")
                .with_class("pricing-card")
                .with_attr("data-monthly", monthly)
                .with_attr("data-annual", annual)
                .with_child(Element::new("span").with_class("price-amount").with_text(monthly))
                as TargetRef
        })
        .collect();
    let toggle = PricingToggle::new(
        cards,
        vec![
            (BillingPeriod::Monthly, Element::new("button") as TargetRef),
            (BillingPeriod::Annual, Element::new("button") as TargetRef),
        ],
        engine.clone(),
        config.pricing.clone(),
        BillingPeriod::Monthly,
    );
    registry.register("pricing", Component::Pricing(toggle));

    for name in ["card-speed", "card-security", "card-insights"] {
        let card = Element::new("div")
            .with_class("feature-card")
            .with_child(Element::new("i").with_class("feature-icon"));
        registry.register(name, Component::FeatureCard(card));
    }

    for (name, ty) in [("signup-email", "email"), ("signup-name", "text")] {
        let field = Element::new("input")
            .with_attr("type", ty)
            .with_attr("required", "")
            .with_child(Element::new("span").with_class("field-error"));
        registry.register(name, Component::Field(field));
    }

    let reveal = ScrollReveal::new(engine.clone(), caps.visibility.clone(), config.reveal.clone());
    let mut sections = BTreeMap::new();
    for (name, items) in [("features", 3), ("pricing", 3), ("testimonials", 2)] {
        let el = section(name, items);
        reveal.register(el.clone());
        sections.insert(name, el);
    }

    metrics.start();
    let started = registry.start_rotators();
    debug!(components = registry.len(), started, "page assembled");

    Ok(DemoPage {
        host,
        registry,
        engine,
        sections,
        _reveal: reveal,
    })
}

fn timeline() -> Vec<(u64, Cue)> {
    let hover = |w: &str| Cue::Event(PageEvent::Hover { widget: w.into() });
    let leave = |w: &str| Cue::Event(PageEvent::Leave { widget: w.into() });
    let click = |w: &str, control| {
        Cue::Event(PageEvent::Click {
            widget: w.into(),
            control,
        })
    };

    vec![
        (0, Cue::Memory(24 << 20)),
        (1_200, Cue::Scroll("features", 0.3)),
        (2_000, hover("card-speed")),
        (2_150, hover("card-speed")),
        (2_600, leave("card-speed")),
        (6_500, click("dashboard", 3)),
        (7_000, hover("dashboard")),
        (9_000, leave("dashboard")),
        (15_000, Cue::Scroll("pricing", 0.5)),
        (15_800, click("pricing", 1)),
        (15_900, click("pricing", 1)),
        (17_000, Cue::TabHidden),
        (29_000, Cue::TabVisible),
        (31_000, Cue::Memory(27 << 20)),
        (40_000, Cue::Event(PageEvent::InputBlur { field: "signup-email".into() })),
        (
            41_000,
            Cue::Event(PageEvent::InputChange {
                field: "signup-email".into(),
                value: "visitor@example.com".into(),
            }),
        ),
        (42_000, Cue::Event(PageEvent::InputBlur { field: "signup-name".into() })),
        (
            45_000,
            Cue::Event(PageEvent::Rejection {
                reason: "newsletter endpoint unreachable".into(),
            }),
        ),
        (50_000, Cue::Scroll("testimonials", 1.0)),
        (60_000, Cue::Event(PageEvent::Leave { widget: "nowhere".into() })),
    ]
}

fn replay(page: &DemoPage, cues: Vec<(u64, Cue)>) {
    for (at, cue) in cues {
        page.host.advance(at.saturating_sub(page.host.now_ms()));
        match cue {
            Cue::Event(event) => {
                let handled = EventRouter::route(&page.registry, &event);
                debug!(at, ?event, handled, "event routed");
            }
            Cue::Scroll(name, ratio) => {
                if let Some(section) = page.sections.get(name) {
                    page.host.viewport.set_ratio(section.as_ref(), ratio);
                }
            }
            Cue::TabHidden => page.host.window.set_visible(false),
            Cue::TabVisible => page.host.window.set_visible(true),
            Cue::Memory(used) => page.host.memory.set(MemoryUsage {
                used_bytes: used,
                total_bytes: 64 << 20,
                limit_bytes: 2 << 30,
            }),
        }
    }
    // Let in-flight transitions settle.
    page.host.advance(1_000);
}

fn run_summary(events: &[RunEvent]) -> BTreeMap<&'static str, usize> {
    let mut summary = BTreeMap::new();
    for event in events {
        let key = match event {
            RunEvent::Started { .. } => "started",
            RunEvent::Completed { .. } => "completed",
            RunEvent::Cancelled { .. } => "cancelled",
            RunEvent::Failed { .. } => "failed",
        };
        *summary.entry(key).or_insert(0) += 1;
    }
    summary
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vitrine=info,vitrine_scene=info")),
        )
        .with_target(false)
        .init();

    let config = load_config()?;
    let page = build_page(&config)?;
    info!(
        interval_ms = config.rotator.interval_ms,
        reveal_threshold = config.reveal.threshold,
        "replaying visit"
    );

    replay(&page, timeline());
    page.registry.pause_rotators();

    let rotator = page
        .registry
        .rotator("dashboard")
        .context("dashboard rotator missing")?;
    let report = serde_json::json!({
        "elapsed_ms": page.host.now_ms(),
        "dashboard_slide": rotator.current_index(),
        "pricing_period": page.registry.pricing("pricing").map(PricingToggle::period),
        "runs": run_summary(&page.engine.drain_events()),
        "metrics": page.registry.metrics().get_metrics(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
