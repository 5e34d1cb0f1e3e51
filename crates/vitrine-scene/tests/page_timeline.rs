//! End-to-end page scenario on the headless host: every component wired the
//! way a landing page wires them, driven by routed events, timers and
//! viewport changes.

use std::rc::Rc;

use anyhow::Result;
use vitrine_config::VitrineConfig;
use vitrine_scene::animation::RunEvent;
use vitrine_scene::host::headless::{Element, HeadlessHost};
use vitrine_scene::host::{MemoryUsage, Target, TargetRef};
use vitrine_scene::{
    BillingPeriod, Component, ComponentRegistry, EventRouter, FeatureCardHover,
    InteractionDebouncer, MetricsSink, PageEvent, PricingToggle, Rotator, RotatorMode,
    ScrollReveal, StagedAnimationEngine,
};

struct Page {
    host: HeadlessHost,
    registry: ComponentRegistry,
    reveal: ScrollReveal,
    engine: StagedAnimationEngine,
    slides: Vec<Rc<Element>>,
    amounts: Vec<Rc<Element>>,
    features: Rc<Element>,
    feature_items: Vec<Rc<Element>>,
}

fn build(config: &VitrineConfig) -> Result<Page> {
    let host = HeadlessHost::new();
    let caps = host.host();
    let metrics = MetricsSink::new(&caps, &config.metrics)?;
    let engine = StagedAnimationEngine::new(caps.scheduler.clone(), Rc::new(metrics.clone()));
    let mut registry = ComponentRegistry::new(
        FeatureCardHover::new(engine.clone(), config.hover.clone()),
        metrics.clone(),
    );
    let debouncer = Rc::new(InteractionDebouncer::new(caps.clock.clone()));

    let slides: Vec<Rc<Element>> = (0..3)
        .map(|i| {
            let slide = Element::new("div").with_class("dashboard-slide");
            if i == 0 { slide.with_class("active") } else { slide }
        })
        .collect();
    let tabs: Vec<TargetRef> = (0..3).map(|_| Element::new("button") as TargetRef).collect();
    let rotator = Rotator::new(
        "dashboard",
        slides.iter().map(|s| s.clone() as TargetRef).collect(),
        tabs,
        &caps,
        engine.clone(),
        debouncer,
        config.rotator.clone(),
    )?;
    registry.register("dashboard", Component::Rotator(rotator));

    let mut amounts = Vec::new();
    let mut cards: Vec<TargetRef> = Vec::new();
    for (monthly, annual) in [("$0", "$0"), ("$29", "$290"), ("$99", "$990")] {
        let amount = Element::new("span").with_class("price-amount").with_text(monthly);
        let card = Element::new("div")
            .with_class("price-card")
            .with_attr("data-monthly", monthly)
            .with_attr("data-annual", annual)
            .with_child(amount.clone());
        amounts.push(amount);
        cards.push(card);
    }
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

    registry.register(
        "card-analytics",
        Component::FeatureCard(
            Element::new("div")
                .with_class("feature-card")
                .with_child(Element::new("i").with_class("feature-icon")),
        ),
    );

    let signup = Element::new("input")
        .with_attr("type", "email")
        .with_attr("required", "")
        .with_child(Element::new("span").with_class("field-error"));
    registry.register("signup-email", Component::Field(signup));

    let feature_items: Vec<Rc<Element>> = (0..4)
        .map(|_| Element::new("li").with_class("reveal-item"))
        .collect();
    let features = feature_items
        .iter()
        .fold(Element::new("section"), |s, item| s.with_child(item.clone()));
    let reveal = ScrollReveal::new(engine.clone(), caps.visibility.clone(), config.reveal.clone());
    reveal.register(features.clone());

    metrics.start();
    registry.start_rotators();

    Ok(Page {
        host,
        registry,
        reveal,
        engine,
        slides,
        amounts,
        features,
        feature_items,
    })
}

fn route(page: &Page, event: PageEvent) -> bool {
    EventRouter::route(&page.registry, &event)
}

#[test]
fn landing_page_timeline() -> Result<()> {
    let page = build(&VitrineConfig::default())?;
    page.host.memory.set(MemoryUsage {
        used_bytes: 8 << 20,
        total_bytes: 16 << 20,
        limit_bytes: 1 << 30,
    });

    // First paint.
    page.host.advance(0);
    let rotator = page.registry.rotator("dashboard").expect("dashboard registered");
    assert_eq!(rotator.mode(), RotatorMode::AutoPlaying);

    // Auto-advance.
    page.host.advance(4_000);
    assert_eq!(rotator.current_index(), 1);
    page.host.advance(200);
    assert!(page.slides[1].has_class("active"));
    assert!(!page.slides[0].has_class("active"));

    // User picks a slide, hovers, then leaves; auto-play returns only after
    // the quiet period.
    assert!(route(&page, PageEvent::Click { widget: "dashboard".into(), control: 0 }));
    assert!(route(&page, PageEvent::Hover { widget: "dashboard".into() }));
    page.host.advance(1_000);
    assert!(route(&page, PageEvent::Leave { widget: "dashboard".into() }));
    assert_eq!(rotator.mode(), RotatorMode::Paused);
    page.host.advance(4_000);
    assert_eq!(rotator.mode(), RotatorMode::AutoPlaying);
    // Still inside the suppression window of the click.
    page.host.advance(4_000);
    assert_eq!(rotator.current_index(), 0);

    // Pricing swap.
    assert!(route(&page, PageEvent::Click { widget: "pricing".into(), control: 1 }));
    page.host.advance(200);
    let shown: Vec<String> = page.amounts.iter().map(|a| a.text()).collect();
    assert_eq!(shown, ["$0", "$290", "$990"]);

    // Feature section scrolls into view.
    assert_eq!(page.reveal.pending_count(), 1);
    page.host.viewport.set_ratio(page.features.as_ref(), 0.4);
    page.host.advance(400);
    assert!(page.features.has_class("revealed"));
    assert!(page.feature_items.iter().all(|i| i.has_class("revealed")));

    // Signup field.
    assert!(route(&page, PageEvent::InputBlur { field: "signup-email".into() }));
    assert!(route(&page, PageEvent::InputChange {
        field: "signup-email".into(),
        value: "ada@example.com".into(),
    }));

    // Memory sample at 30s.
    page.host.advance(30_000);
    let snapshot = page.registry.metrics().get_metrics();
    assert_eq!(snapshot.load_time_ms, Some(0));
    assert!(snapshot.memory_samples >= 1);
    assert_eq!(snapshot.error_count, 0);

    let events = page.engine.drain_events();
    assert!(events.iter().any(|e| matches!(e, RunEvent::Completed { name, .. } if name == "price-swap")));
    assert!(events.iter().all(|e| !matches!(e, RunEvent::Failed { .. })));
    Ok(())
}

#[test]
fn removed_slide_fails_only_its_own_run() -> Result<()> {
    let page = build(&VitrineConfig::default())?;
    let rotator = page.registry.rotator("dashboard").expect("dashboard registered");

    page.slides[2].detach();
    assert!(rotator.switch_to(2));
    page.host.advance(500);

    // The outgoing slide still finished its exit.
    assert!(!page.slides[0].has_class("active"));
    assert_eq!(rotator.current_index(), 2);

    let snapshot = page.registry.metrics().get_metrics();
    assert_eq!(snapshot.error_count, 1);
    assert!(snapshot.last_error.is_some_and(|e| e.contains("slide-in")));

    let failed: Vec<RunEvent> = page
        .engine
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, RunEvent::Failed { .. }))
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].target(), page.slides[2].id());
    Ok(())
}

#[test]
fn hidden_tab_freezes_rotation() -> Result<()> {
    let page = build(&VitrineConfig::default())?;
    let rotator = page.registry.rotator("dashboard").expect("dashboard registered");

    page.host.window.set_visible(false);
    page.host.advance(60_000);
    assert_eq!(rotator.current_index(), 0);

    page.host.window.set_visible(true);
    page.host.advance(4_000);
    assert_eq!(rotator.current_index(), 1);
    Ok(())
}

#[test]
fn auto_start_disabled_by_config() -> Result<()> {
    let mut config = VitrineConfig::default();
    config.rotator.auto_start = false;
    let page = build(&config)?;
    let rotator = page.registry.rotator("dashboard").expect("dashboard registered");

    assert_eq!(rotator.mode(), RotatorMode::Idle);
    page.host.advance(20_000);
    assert_eq!(rotator.current_index(), 0);
    Ok(())
}
