mod common;

use common::{Harness, NavStep, Script, example_metadata};
use kodegen_tools_pagemeta::{ErrorCategory, ScrapeError};
use std::time::Duration;

const BUDGET: Duration = Duration::from_secs(20);

#[tokio::test]
async fn invalid_input_never_launches_a_browser() {
    let harness = Harness::new(Script::default());
    let handler = harness.handler(BUDGET);

    for raw in [
        None,
        Some(""),
        Some("   "),
        Some("not a url"),
        Some("ftp://example.com"),
        Some("javascript:alert(1)"),
    ] {
        let err = handler.handle(raw).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidUrl, "input: {raw:?}");
    }

    assert_eq!(harness.counters.launches(), 0);
}

#[tokio::test]
async fn valid_url_returns_metadata() {
    let harness = Harness::new(Script::default());
    let handler = harness.handler(BUDGET);

    let metadata = handler.handle(Some("https://example.com")).await.unwrap();

    assert_eq!(metadata, example_metadata(200));
    assert_eq!(harness.observer.count("finished ok"), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_launch_times_out_at_budget_and_still_tears_down() {
    let harness = Harness::new(Script {
        launch_delay: Duration::from_secs(25),
        ..Script::default()
    });
    let handler = harness.handler(BUDGET);

    let started = tokio::time::Instant::now();
    let err = handler.handle(Some("https://example.com")).await.unwrap_err();

    assert!(matches!(err, ScrapeError::Timeout(budget) if budget == BUDGET));
    assert_eq!(started.elapsed(), BUDGET);
    assert_eq!(harness.counters.closes(), 0);
    assert_eq!(harness.observer.count("finished Timeout"), 1);

    // The detached pipeline finishes launching, sees the cancellation and
    // releases the session without navigating.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.counters.launches(), 1);
    assert_eq!(harness.counters.gotos(), 0);
    assert_eq!(harness.counters.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn hung_navigation_times_out_and_tears_down_promptly() {
    let harness = Harness::new(Script {
        nav_steps: vec![NavStep::Hang],
        ..Script::default()
    });
    let handler = harness.handler(BUDGET);

    let started = tokio::time::Instant::now();
    let err = handler.handle(Some("https://example.com")).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Timeout);
    assert_eq!(started.elapsed(), BUDGET);

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(harness.counters.closes(), 1);
}

#[tokio::test]
async fn navigation_failure_is_generic_failure() {
    let harness = Harness::new(Script {
        nav_steps: vec![NavStep::Fail("net::ERR_CONNECTION_REFUSED")],
        ..Script::default()
    });
    let handler = harness.handler(BUDGET);

    let err = handler.handle(Some("https://example.com")).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Failure);
    assert_eq!(harness.observer.count("finished Failure"), 1);
}

#[tokio::test(start_paused = true)]
async fn hung_teardown_does_not_turn_success_into_timeout() {
    let harness = Harness::new(Script {
        close_hangs: true,
        ..Script::default()
    });
    let handler = harness.handler(BUDGET);

    let started = tokio::time::Instant::now();
    let metadata = handler.handle(Some("https://example.com")).await.unwrap();

    assert_eq!(metadata, example_metadata(200));
    assert!(started.elapsed() < BUDGET);
    assert_eq!(harness.observer.count("teardown_failed"), 1);
    assert_eq!(harness.observer.count("finished ok"), 1);
}

#[tokio::test(start_paused = true)]
async fn dropped_request_cancels_the_pipeline() {
    let harness = Harness::new(Script {
        nav_steps: vec![NavStep::Hang],
        ..Script::default()
    });
    let handler = harness.handler(BUDGET);

    let request = tokio::spawn(async move { handler.handle(Some("https://example.com")).await });
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(harness.counters.gotos(), 1);
    assert_eq!(harness.counters.closes(), 0);

    request.abort();
    assert!(request.await.unwrap_err().is_cancelled());

    // Well before the 15s attempt timeout or the request budget
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(harness.counters.closes(), 1);
    assert_eq!(harness.counters.gotos(), 1);
}
