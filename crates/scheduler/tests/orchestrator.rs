mod common;

use std::sync::Arc;

use browser_pool::PoolConfig;
use event_store::RunStore;
use permissions_broker::PermissionPolicy;
use tokio_util::sync::CancellationToken;
use webpilot_scheduler::{
    ObservationValidator, OrchestratorConfig, RunOutcome, ValidationResult,
};

use common::{build, mock, ScriptedPlanner, Setup};

const GOAL: &str = "Open https://example.com and extract title";

#[tokio::test]
async fn goal_on_allowlisted_site_completes() {
    let planner = mock();
    let (orchestrator, harness) = build(Setup::default(), planner.clone());

    let result = orchestrator
        .run(GOAL, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(
        result.observations,
        vec![
            "navigated:https://example.com".to_string(),
            "extract:title:Example Domain".to_string(),
        ]
    );
    assert_eq!(result.replans, 0);
    assert_eq!(result.summary, result.observations.join("\n"));
    assert!(result.analysis.is_some());
    assert_eq!(harness.pool.outstanding(), 0);

    let log = harness.store.run_log(&result.run_id).await.unwrap();
    let actions: Vec<_> = log.steps.iter().map(|s| s.action.as_str()).collect();
    assert_eq!(
        actions,
        vec!["base:open(\"https://example.com\")", "base:extract(\"title\")"]
    );
    let names: Vec<_> = log.artifacts.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["analysis.txt", "summary.txt"]);
}

#[tokio::test]
async fn disallowed_domain_replans_until_exhausted() {
    let planner = mock();
    let (orchestrator, _harness) = build(Setup::default(), planner.clone());

    let result = orchestrator
        .run(
            "Open https://blocked.test and extract title",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(result.observations[0]
        .starts_with("Error: Policy denied: navigation blocked by security policy"));
    assert!(result.observations[0].contains("\nDOM: "));
    assert_eq!(result.outcome, RunOutcome::Exhausted);
    assert_eq!(result.replans, 3);
    assert_eq!(planner.replan_calls(), 3);
    assert_eq!(result.observations.len(), 4);
}

struct RejectEverything;

impl ObservationValidator for RejectEverything {
    fn validate(&self, _observation: &str) -> ValidationResult {
        ValidationResult::reject("never satisfied")
    }
}

#[tokio::test]
async fn always_rejecting_validator_terminates() {
    let planner = mock();
    let setup = Setup {
        orchestrator: OrchestratorConfig {
            max_replans: 2,
            ..OrchestratorConfig::default()
        },
        ..Setup::default()
    };
    let (orchestrator, harness) = build(setup, planner.clone());
    let orchestrator = orchestrator.with_validator(Arc::new(RejectEverything));

    let result = orchestrator
        .run(GOAL, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.outcome, RunOutcome::Exhausted);
    assert_eq!(result.replans, 2);
    assert_eq!(planner.replan_calls(), 2);
    assert_eq!(
        result.observations,
        vec!["navigated:https://example.com".to_string(); 3]
    );
    assert_eq!(harness.pool.outstanding(), 0);
}

#[tokio::test]
async fn stop_signal_before_first_step_aborts() {
    let (orchestrator, harness) = build(Setup::default(), mock());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = orchestrator.run(GOAL, &cancel).await.unwrap();

    assert_eq!(result.outcome, RunOutcome::Aborted);
    assert!(result.observations.is_empty());
    assert!(harness.driver.journal().is_empty());
    assert_eq!(harness.pool.outstanding(), 0);
    let log = harness.store.run_log(&result.run_id).await.unwrap();
    assert!(log.steps.is_empty());
    assert!(log.artifacts.iter().any(|a| a.name == "summary.txt"));
}

#[tokio::test]
async fn pool_exhaustion_fails_the_run() {
    let setup = Setup {
        pool: PoolConfig {
            browsers: 1,
            pages_per_browser: 1,
            acquire_timeout_ms: 20,
            max_overflow: 0,
        },
        ..Setup::default()
    };
    let (orchestrator, harness) = build(setup, mock());
    let _held = harness.pool.acquire_default().await.unwrap();

    let result = orchestrator
        .run(GOAL, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.outcome, RunOutcome::Failed);
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .starts_with("resource exhaustion"));
    assert!(result.observations.is_empty());
}

#[tokio::test]
async fn login_steps_need_permission() {
    let planner = ScriptedPlanner::new(&[&["click(\"Sign in\")"], &["wait(\"10ms\")"]]);
    let (orchestrator, _harness) = build(Setup::default(), planner.clone());

    let result = orchestrator
        .run("log into the app", &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.observations[0].starts_with("Error: Not permitted: login"));
    assert_eq!(result.observations[1], "waited_ms:10");
    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(result.replans, 1);
    assert_eq!(planner.reflections(), 1);
    assert_eq!(result.plan, vec!["wait(\"10ms\")".to_string()]);
}

#[tokio::test]
async fn loose_steps_are_interpreted_when_enabled() {
    let planner = ScriptedPlanner::new(&[&[
        "Search for rust async",
        "Navigate to https://example.com",
        "Extract the title",
        "Ponder the results",
    ]]);
    let setup = Setup {
        allowed: vec!["example.com", "google.com"],
        orchestrator: OrchestratorConfig {
            loose_steps: true,
            ..OrchestratorConfig::default()
        },
        ..Setup::default()
    };
    let (orchestrator, _harness) = build(setup, planner);

    let result = orchestrator
        .run("find things", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(
        result.observations,
        vec![
            "searched:rust async".to_string(),
            "navigated:https://example.com".to_string(),
            "extract:title:Example Domain".to_string(),
            "noop:Ponder the results".to_string(),
        ]
    );
}

#[tokio::test]
async fn screenshots_follow_successful_steps() {
    let dir = tempfile::tempdir().unwrap();
    let shots = dir.path().join("shots");
    let setup = Setup {
        orchestrator: OrchestratorConfig {
            screenshots_dir: Some(shots.clone()),
            ..OrchestratorConfig::default()
        },
        ..Setup::default()
    };
    let (orchestrator, _harness) = build(setup, mock());

    orchestrator
        .run(GOAL, &CancellationToken::new())
        .await
        .unwrap();

    assert!(shots.join("step_1_base.png").exists());
    assert!(shots.join("step_2_base.png").exists());
}

#[tokio::test]
async fn summary_keeps_the_last_observations() {
    let steps: Vec<String> = (1..=7).map(|n| format!("wait(\"{n}ms\")")).collect();
    let refs: Vec<&str> = steps.iter().map(String::as_str).collect();
    let planner = ScriptedPlanner::new(&[&refs]);
    let (orchestrator, harness) = build(Setup::default(), planner);

    let result = orchestrator
        .run("wait a bit", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.observations.len(), 7);
    assert_eq!(
        result.summary,
        "waited_ms:3\nwaited_ms:4\nwaited_ms:5\nwaited_ms:6\nwaited_ms:7"
    );
    let context = harness.store.recent_context(2).await.unwrap();
    assert_eq!(
        context,
        "Goal: wait a bit\nbase:wait(\"6ms\") -> waited_ms:6\nbase:wait(\"7ms\") -> waited_ms:7"
    );
}
