mod common;

use std::sync::Arc;

use webpilot_scheduler::{RunManager, RunOutcome};

use common::{build, ScriptedPlanner, Setup};

#[tokio::test(start_paused = true)]
async fn stopping_one_run_leaves_the_other_running() {
    let planner = ScriptedPlanner::new(&[&["wait(\"5s\")", "wait(\"5s\")", "wait(\"5s\")"]]);
    let (orchestrator, harness) = build(Setup::default(), planner);
    let manager = RunManager::new(Arc::new(orchestrator));

    let stopped = manager.submit("first").await.unwrap();
    let kept = manager.submit("second").await.unwrap();
    assert!(manager.is_running(stopped.run_id()));
    assert_eq!(manager.running().len(), 2);

    assert!(manager.stop(stopped.run_id()));
    let stopped_id = stopped.run_id().clone();

    let aborted = stopped.wait().await.unwrap();
    let completed = kept.wait().await.unwrap();

    assert_eq!(aborted.outcome, RunOutcome::Aborted);
    assert!(aborted.observations.len() < 3);
    assert_eq!(completed.outcome, RunOutcome::Completed);
    assert_eq!(completed.observations, vec!["waited_ms:5000".to_string(); 3]);
    assert!(!manager.is_running(&stopped_id));
    assert!(!manager.stop(&stopped_id));
    assert!(manager.running().is_empty());
    assert_eq!(harness.pool.outstanding(), 0);
}

#[tokio::test(start_paused = true)]
async fn stop_all_signals_every_run() {
    let planner = ScriptedPlanner::new(&[&["wait(\"1s\")"]]);
    let (orchestrator, _harness) = build(Setup::default(), planner);
    let manager = RunManager::new(Arc::new(orchestrator));

    let a = manager.submit("a").await.unwrap();
    let b = manager.submit("b").await.unwrap();
    assert_eq!(manager.stop_all(), 2);

    assert_eq!(a.wait().await.unwrap().outcome, RunOutcome::Aborted);
    assert_eq!(b.wait().await.unwrap().outcome, RunOutcome::Aborted);
}

#[tokio::test]
async fn handle_token_cancels_its_run() {
    let planner = ScriptedPlanner::new(&[&["wait(\"1ms\")"]]);
    let (orchestrator, _harness) = build(Setup::default(), planner);
    let manager = RunManager::new(Arc::new(orchestrator));

    let handle = manager.submit("c").await.unwrap();
    handle.cancellation_token().cancel();
    assert_eq!(handle.wait().await.unwrap().outcome, RunOutcome::Aborted);
}
