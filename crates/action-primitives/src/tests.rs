use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use cdp_adapter::{
    Locator, SharedSurface, StubDocument, StubDriver, StubElement, StubEvent, StubSite,
    SurfaceDriver,
};
use tokio::time::Instant;

use super::*;

async fn surface(driver: &StubDriver) -> SharedSurface {
    let slot = driver.launch(0).await.unwrap();
    slot.open_surface().await.unwrap()
}

fn form_site() -> StubSite {
    StubSite::new().page(
        "https://example.com/form",
        StubDocument::new("Form").with(
            StubElement::new("input")
                .with_id("q")
                .with_attr("placeholder", "Search"),
        ),
    )
}

#[test]
fn backoff_doubles_and_caps() {
    let policy = RetryPolicy::default();
    let delays: Vec<u64> = (1..=5)
        .map(|attempt| policy.backoff(attempt).as_millis() as u64)
        .collect();
    assert_eq!(delays, vec![500, 1_000, 2_000, 4_000, 4_000]);
}

#[tokio::test(start_paused = true)]
async fn retries_transient_faults_with_backoff() {
    let calls = AtomicU32::new(0);
    let started = Instant::now();
    let (value, attempts) = retry_async(&RetryPolicy::default(), "probe", |attempt| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt < 3 {
                Err(ActionError::WaitTimeout(format!("attempt {attempt}")))
            } else {
                Ok("done")
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(value, "done");
    assert_eq!(attempts, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(started.elapsed(), Duration::from_millis(1_500));
}

#[tokio::test(start_paused = true)]
async fn final_error_is_returned_unmodified() {
    let err = retry_async(&RetryPolicy::default(), "probe", |attempt| async move {
        Err::<(), _>(ActionError::Detached(format!("attempt {attempt}")))
    })
    .await
    .unwrap_err();
    assert_eq!(err, ActionError::Detached("attempt 3".into()));
}

#[tokio::test(start_paused = true)]
async fn permanent_errors_are_not_retried() {
    let calls = AtomicU32::new(0);
    let err = retry_async(&RetryPolicy::default(), "probe", |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(ActionError::NotFound("#missing".into())) }
    })
    .await
    .unwrap_err();
    assert!(matches!(err, ActionError::NotFound(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn navigate_survives_two_timeouts_but_not_three() {
    let driver = StubDriver::new(StubSite::demo());
    let page = surface(&driver).await;
    let primitives = Primitives::default();

    driver.fail_next_gotos(2);
    let report = primitives
        .navigate(page.as_ref(), "https://example.com")
        .await
        .unwrap();
    assert_eq!(report.attempts, 3);

    driver.fail_next_gotos(3);
    let err = primitives
        .navigate(page.as_ref(), "https://example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::NavTimeout(_)));
    let failures = driver
        .journal()
        .into_iter()
        .filter(|event| matches!(event, StubEvent::GotoFailed(_)))
        .count();
    assert_eq!(failures, 5);
}

#[tokio::test]
async fn click_and_fill_report_descriptors() {
    let driver = StubDriver::new(form_site());
    let page = surface(&driver).await;
    let primitives = Primitives::default();
    primitives
        .navigate(page.as_ref(), "https://example.com/form")
        .await
        .unwrap();

    let report = primitives
        .fill(page.as_ref(), &Locator::Placeholder("Search".into()), "rust")
        .await
        .unwrap();
    assert_eq!(report.target, "placeholder=Search");
    assert_eq!(report.attempts, 1);

    let err = primitives
        .click(page.as_ref(), &Locator::css("#nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn pause_clamps_negative_durations() {
    assert_eq!(pause(-5).await, Duration::ZERO);
    let started = Instant::now();
    assert_eq!(pause(250).await, Duration::from_millis(250));
    assert_eq!(started.elapsed(), Duration::from_millis(250));
}
