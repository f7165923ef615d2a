use super::*;

#[tokio::test]
async fn records_steps_and_artifacts_per_run() {
    let store = InMemoryRunStore::new();
    let first = store.create_run("first goal").await.unwrap();
    let second = store.create_run("second goal").await.unwrap();
    store.add_step(&first, 1, "base:open", "navigated:a").await.unwrap();
    store.add_step(&second, 1, "base:extract", "extract:title:A").await.unwrap();
    store.add_artifact(&second, "summary.txt", "done").await.unwrap();

    let log = store.run_log(&second).await.unwrap();
    assert_eq!(log.steps.len(), 1);
    assert_eq!(log.steps[0].observation, "extract:title:A");
    assert_eq!(log.artifacts[0].name, "summary.txt");
    assert_eq!(store.run(&first).await.unwrap().unwrap().goal, "first goal");
    assert_eq!(store.run_count(), 2);
}

#[tokio::test]
async fn unknown_runs_are_rejected() {
    let store = InMemoryRunStore::new();
    let ghost = webpilot_core_types::RunId::new();
    let err = store.add_step(&ghost, 1, "a", "b").await.unwrap_err();
    assert!(matches!(err.kind(), StoreErrorKind::UnknownRun(_)));
    assert!(store.run(&ghost).await.unwrap().is_none());
}

#[tokio::test]
async fn recent_context_has_latest_goal_and_tail_of_steps() {
    let store = InMemoryRunStore::new();
    assert_eq!(store.recent_context(5).await.unwrap(), "Goal: ");
    let run = store.create_run("read the news").await.unwrap();
    for idx in 1..=4 {
        store
            .add_step(&run, idx, &format!("step{idx}"), &format!("obs{idx}"))
            .await
            .unwrap();
    }
    assert_eq!(
        store.recent_context(2).await.unwrap(),
        "Goal: read the news\nstep3 -> obs3\nstep4 -> obs4"
    );
}

#[tokio::test]
async fn persists_and_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runs").join("store.json");
    let run = {
        let store = InMemoryRunStore::open(&path).await.unwrap();
        let run = store.create_run("persisted").await.unwrap();
        store.add_step(&run, 1, "base:x", "noop:x").await.unwrap();
        store.add_artifact(&run, "summary.txt", "noop:x").await.unwrap();
        run
    };
    let reopened = InMemoryRunStore::open(&path).await.unwrap();
    let log = reopened.run_log(&run).await.unwrap();
    assert_eq!(log.steps.len(), 1);
    assert_eq!(log.artifacts.len(), 1);
    assert!(reopened
        .recent_context(5)
        .await
        .unwrap()
        .starts_with("Goal: persisted"));
}
