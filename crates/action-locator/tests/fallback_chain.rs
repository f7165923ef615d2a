use std::sync::Arc;

use action_locator::{
    DirectResolver, FallbackChain, LocatorError, Stage, TargetOp, TargetResolver,
};
use action_primitives::Primitives;
use cdp_adapter::{
    SharedSurface, StubDocument, StubDriver, StubElement, StubEvent, StubSite, SurfaceDriver,
};
use memory_center::{SelectorMemory, SharedSelectorMemory};
use webpilot_core_types::ActionKind;

const ORIGIN: &str = "https://app.test";

fn site() -> StubSite {
    StubSite::new()
        .page(
            "https://app.test/login",
            StubDocument::new("Login")
                .with(
                    StubElement::new("input")
                        .with_id("email")
                        .with_attr("placeholder", "Email address")
                        .with_label("Your email"),
                )
                .with(StubElement::new("button").with_class("primary").with_text("Sign in"))
                .with(
                    StubElement::new("a")
                        .with_attr("title", "proceed to payment")
                        .with_text("Checkout"),
                ),
        )
        .page(
            "https://app.test/notice",
            StubDocument::new("Notice").with(StubElement::new("span").with_text("Accept cookies")),
        )
}

struct Harness {
    driver: StubDriver,
    surface: SharedSurface,
    memory: SharedSelectorMemory,
    chain: FallbackChain,
}

async fn harness(url: &str) -> Harness {
    let driver = StubDriver::new(site());
    let slot = driver.launch(0).await.unwrap();
    let surface = slot.open_surface().await.unwrap();
    surface
        .goto(url, std::time::Duration::from_secs(1))
        .await
        .unwrap();
    driver.clear_journal();
    let memory: SharedSelectorMemory = Arc::new(SelectorMemory::new());
    let chain = FallbackChain::new(Primitives::default(), Arc::clone(&memory));
    Harness {
        driver,
        surface,
        memory,
        chain,
    }
}

fn click_attempts(driver: &StubDriver) -> Vec<(String, bool)> {
    driver
        .journal()
        .into_iter()
        .filter_map(|event| match event {
            StubEvent::Click { descriptor, hit } => Some((descriptor, hit)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn literal_hit_is_recorded_then_served_from_memory() {
    let h = harness("https://app.test/login").await;

    let first = h
        .chain
        .perform(h.surface.as_ref(), "button.primary", TargetOp::Click)
        .await
        .unwrap();
    assert_eq!(first.stage, Stage::Literal);
    assert_eq!(first.descriptor, "button.primary");

    let second = h
        .chain
        .perform(h.surface.as_ref(), "button.primary", TargetOp::Click)
        .await
        .unwrap();
    assert_eq!(second.stage, Stage::Memory);

    let records = h
        .memory
        .lookup_records(ORIGIN, ActionKind::Click, "button.primary");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].success_count, 1);
    // One attempt per call: nothing runs after the memory hit.
    assert_eq!(click_attempts(&h.driver).len(), 2);
}

#[tokio::test]
async fn role_name_resolves_natural_language_click() {
    let h = harness("https://app.test/login").await;
    let resolution = h
        .chain
        .perform(h.surface.as_ref(), "Sign in", TargetOp::Click)
        .await
        .unwrap();
    assert_eq!(resolution.stage, Stage::Structural);
    assert_eq!(resolution.descriptor, "role=button,name=Sign in");
    assert_eq!(resolution.attempted, vec!["Sign in".to_string()]);
    assert_eq!(
        h.memory.lookup(ORIGIN, ActionKind::Click, "Sign in"),
        vec!["role=button,name=Sign in".to_string()]
    );
}

#[tokio::test]
async fn fills_by_placeholder_then_label() {
    let h = harness("https://app.test/login").await;
    let by_placeholder = h
        .chain
        .perform(h.surface.as_ref(), "Email address", TargetOp::Fill("me@app.test"))
        .await
        .unwrap();
    assert_eq!(by_placeholder.descriptor, "placeholder=Email address");

    let by_label = h
        .chain
        .perform(h.surface.as_ref(), "Your email", TargetOp::Fill("me@app.test"))
        .await
        .unwrap();
    assert_eq!(by_label.stage, Stage::Structural);
    assert_eq!(by_label.descriptor, "label=Your email");
    assert_eq!(
        h.memory.lookup(ORIGIN, ActionKind::Type, "Your email"),
        vec!["label=Your email".to_string()]
    );
}

#[tokio::test]
async fn semantic_ranking_finds_element_by_attribute_words() {
    let h = harness("https://app.test/login").await;
    let resolution = h
        .chain
        .perform(h.surface.as_ref(), "payment", TargetOp::Click)
        .await
        .unwrap();
    assert_eq!(resolution.stage, Stage::Semantic);
    assert_eq!(resolution.descriptor, "text=Checkout");
    assert_eq!(
        h.memory.lookup(ORIGIN, ActionKind::Click, "payment"),
        vec!["text=Checkout".to_string()]
    );
}

#[tokio::test]
async fn visible_text_is_the_last_resort() {
    let h = harness("https://app.test/notice").await;
    let resolution = h
        .chain
        .perform(h.surface.as_ref(), "Accept cookies", TargetOp::Click)
        .await
        .unwrap();
    assert_eq!(resolution.stage, Stage::Text);
    assert_eq!(resolution.descriptor, "text=Accept cookies");
}

#[tokio::test]
async fn stale_memory_falls_through_to_later_stages() {
    let h = harness("https://app.test/login").await;
    h.memory
        .record_success(ORIGIN, ActionKind::Click, "Sign in", "#gone");
    let resolution = h
        .chain
        .perform(h.surface.as_ref(), "Sign in", TargetOp::Click)
        .await
        .unwrap();
    assert_eq!(resolution.attempted[0], "#gone");
    assert_eq!(resolution.stage, Stage::Structural);
    let records = h.memory.lookup_records(ORIGIN, ActionKind::Click, "Sign in");
    assert_eq!(records.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn only_cached_descriptors_are_retried_on_timeouts() {
    let h = harness("https://app.test/notice").await;
    h.driver.time_out_on_missing_targets(true);
    h.memory
        .record_success(ORIGIN, ActionKind::Click, "Accept cookies", "#gone");

    let resolution = h
        .chain
        .perform(h.surface.as_ref(), "Accept cookies", TargetOp::Click)
        .await
        .unwrap();
    assert_eq!(resolution.descriptor, "text=Accept cookies");

    let attempts = click_attempts(&h.driver);
    let count = |descriptor: &str| attempts.iter().filter(|(d, _)| d == descriptor).count();
    assert_eq!(count("#gone"), 3);
    assert_eq!(count("Accept cookies"), 1);
    assert_eq!(count("role=button,name=Accept cookies"), 1);
    assert_eq!(count("text=Accept cookies"), 1);
}

#[tokio::test]
async fn exhaustion_lists_every_descriptor_tried() {
    let h = harness("https://app.test/notice").await;
    let err = h
        .chain
        .perform(h.surface.as_ref(), "Launch rocket", TargetOp::Click)
        .await
        .unwrap_err();
    let LocatorError::ResolutionExhausted { target, attempted } = err;
    assert_eq!(target, "Launch rocket");
    assert_eq!(
        attempted,
        vec![
            "Launch rocket".to_string(),
            "role=button,name=Launch rocket".to_string(),
            "text=Launch rocket".to_string(),
        ]
    );
    assert!(h.memory.list(None, None, None).is_empty());
}

#[tokio::test]
async fn direct_resolver_only_tries_css() {
    let h = harness("https://app.test/login").await;
    let resolver = DirectResolver::new(Primitives::default());
    assert_eq!(resolver.name(), "direct");
    let err = resolver
        .perform(h.surface.as_ref(), "Sign in", TargetOp::Click)
        .await
        .unwrap_err();
    assert_eq!(err.attempted(), ["Sign in".to_string()]);
    let ok = resolver
        .perform(h.surface.as_ref(), "#email", TargetOp::Fill("x"))
        .await
        .unwrap();
    assert_eq!(ok.stage, Stage::Literal);
}
