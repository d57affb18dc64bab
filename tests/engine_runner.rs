//! Command runner driven through the public API with the default sinks.

use datagen::core::ModelDefinition;
use datagen::engine::{
    CommandRunner, CommandStatus, CommandStore, EngineError, GenerationRequest, RunnerConfig,
};
use datagen::generator::Dictionaries;
use datagen::sinks::{properties, DefaultSinkFactory, SinkKind, SinkSpec};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const EVENTS: &str = r#"
model_name: events
fields:
  - name: seq
    type: increment_integer
  - name: kind
    type: string
    possible_values: [click, view, buy]
  - name: price
    type: float
    min: 1
    max: 10
  - name: doubled
    type: float
    formula: "$price * 2"
"#;

fn start_runner(dir: &TempDir, store: bool) -> CommandRunner {
    let config = RunnerConfig {
        runner_threads: 2,
        scheduler_tick: Duration::from_millis(10),
        store_path: store.then(|| dir.path().join("state").join("commands.json")),
        ..Default::default()
    };
    CommandRunner::start(
        config,
        Arc::new(DefaultSinkFactory::new(dir.path().join("out"))),
        Arc::new(Dictionaries::embedded()),
    )
    .unwrap()
}

fn request() -> GenerationRequest {
    let mut request = GenerationRequest::new(ModelDefinition::from_yaml(EVENTS).unwrap());
    request.threads = Some(3);
    request.batches = Some(5);
    request.rows_per_batch = Some(8);
    request
}

#[test]
fn test_single_file_sinks_receive_every_row() {
    let dir = TempDir::new().unwrap();
    let runner = start_runner(&dir, false);

    let mut request = request();
    request.sinks = vec![SinkSpec::new(SinkKind::Csv), SinkSpec::new(SinkKind::Json)];
    request
        .properties
        .insert(properties::ONE_FILE_PER_ITERATION.to_string(), "false".to_string());
    let id = runner.submit(request).unwrap();
    let snapshot = runner.wait_for(id, Duration::from_secs(30)).unwrap();
    assert_eq!(snapshot.status, CommandStatus::Finished);

    let csv = fs::read_to_string(dir.path().join("out/events.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("seq,kind,price,doubled"));
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 40);
    for row in rows {
        let cols: Vec<&str> = row.split(',').collect();
        assert!(["click", "view", "buy"].contains(&cols[1]));
        let price: f64 = cols[2].parse().unwrap();
        let doubled: f64 = cols[3].parse().unwrap();
        assert!((doubled - price * 2.0).abs() < 1e-6);
    }

    let json = fs::read_to_string(dir.path().join("out/events.json")).unwrap();
    assert_eq!(json.lines().count(), 40);
}

#[test]
fn test_unknown_output_directory_fails_command() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let runner = start_runner(&dir, false);

    let mut request = request();
    request.sinks = vec![SinkSpec::new(SinkKind::Csv)
        .with_property(properties::OUTPUT_DIR, blocker.join("nested").display().to_string())];
    let id = runner.submit(request).unwrap();
    let snapshot = runner.wait_for(id, Duration::from_secs(30)).unwrap();

    assert_eq!(snapshot.status, CommandStatus::Failed);
    assert!(snapshot.error.is_some());
    assert_eq!(runner.list_by_status(CommandStatus::Failed).len(), 1);
}

#[test]
fn test_scheduled_command_persisted_without_credentials() {
    let dir = TempDir::new().unwrap();
    let runner = start_runner(&dir, true);

    let mut request = request();
    request.sinks = vec![SinkSpec::new(SinkKind::Memory)];
    request.delay = Some(Duration::from_secs(3600));
    request.owner = Some("qa".to_string());
    request
        .credentials
        .insert("password".to_string(), "s3cr3t".to_string());
    let id = runner.submit(request).unwrap();
    runner.wait_for(id, Duration::from_secs(30)).unwrap();
    drop(runner);

    let store = CommandStore::new(dir.path().join("state").join("commands.json"));
    let raw = fs::read_to_string(store.path()).unwrap();
    assert!(!raw.contains("s3cr3t"));
    let stored = store.load().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].command.id, id);
    assert_eq!(stored[0].command.owner.as_deref(), Some("qa"));
    assert_eq!(stored[0].command.status, CommandStatus::Finished);

    let restarted = start_runner(&dir, true);
    assert_eq!(restarted.list_scheduled().len(), 1);
    restarted.remove_scheduled(&id).unwrap();
    assert_eq!(
        restarted.status(&id).map(|s| s.status),
        Some(CommandStatus::Removed)
    );
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn test_wait_for_unknown_command() {
    let dir = TempDir::new().unwrap();
    let runner = start_runner(&dir, false);
    let id = "6f1c1d2e-0000-4000-8000-000000000000".parse().unwrap();
    assert!(matches!(
        runner.wait_for(id, Duration::from_millis(10)),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn test_removed_during_run_is_never_restored() {
    let dir = TempDir::new().unwrap();
    let runner = start_runner(&dir, true);

    let mut request = request();
    request.sinks = vec![SinkSpec::new(SinkKind::Memory)];
    request.threads = Some(1);
    request.batches = Some(5_000);
    request.rows_per_batch = Some(50);
    request.delay = Some(Duration::from_secs(3600));
    let id = runner.submit(request).unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(30);
    while runner.status(&id).map(|s| s.status) == Some(CommandStatus::Queued) {
        assert!(std::time::Instant::now() < deadline);
        std::thread::sleep(Duration::from_millis(1));
    }
    runner.remove_scheduled(&id).unwrap();

    let snapshot = runner.wait_for(id, Duration::from_secs(60)).unwrap();
    assert_eq!(snapshot.status, CommandStatus::Removed);
    assert!(runner.list_scheduled().is_empty());
    drop(runner);

    let store = CommandStore::new(dir.path().join("state").join("commands.json"));
    assert!(store.load().unwrap().is_empty());
    let restarted = start_runner(&dir, true);
    assert!(restarted.list_scheduled().is_empty());
}

#[test]
fn test_concurrent_submits_all_persisted() {
    let dir = TempDir::new().unwrap();
    let runner = start_runner(&dir, true);

    let ids: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let runner = &runner;
                scope.spawn(move || {
                    let mut request = request();
                    request.sinks = vec![SinkSpec::new(SinkKind::Memory)];
                    request.delay = Some(Duration::from_secs(3600));
                    runner.submit(request).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for id in &ids {
        let snapshot = runner.wait_for(*id, Duration::from_secs(30)).unwrap();
        assert_eq!(snapshot.status, CommandStatus::Finished);
    }
    drop(runner);

    let store = CommandStore::new(dir.path().join("state").join("commands.json"));
    let mut stored: Vec<_> = store.load().unwrap().into_iter().map(|s| s.command.id).collect();
    let mut expected = ids.clone();
    stored.sort();
    expected.sort();
    assert_eq!(stored, expected);
}
