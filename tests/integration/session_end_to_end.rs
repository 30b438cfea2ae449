//! Whole-session lifecycles through the public API

use loadscreen::host::{EntrypointGroup, EntrypointOwner, StaticProvider};
use loadscreen::session::{LoadingSession, SessionConfig};
use std::fs;
use tempfile::TempDir;

use super::helpers::RecordingSink;

fn group(name: &str, kind: &str, owners: &[&str]) -> EntrypointGroup {
    EntrypointGroup {
        name: name.to_string(),
        kind: kind.to_string(),
        owners: owners
            .iter()
            .map(|id| EntrypointOwner {
                id: id.to_string(),
                name: id.to_string(),
            })
            .collect(),
    }
}

fn session_config(config_dir: &TempDir, enable_memory: bool) -> SessionConfig {
    fs::write(
        config_dir.path().join("config.toml"),
        format!("enable_memory_display = {enable_memory}\n"),
    )
    .unwrap();
    SessionConfig {
        game_label: Some("Example Game 1.0".to_string()),
        config_dir: config_dir.path().to_path_buf(),
        ..SessionConfig::default()
    }
}

#[test]
fn test_typical_loading_run_closes_after_client_group() {
    let config_dir = TempDir::new().unwrap();
    let groups = vec![
        group("pre_launch", "PreLaunchEntrypoint", &["early"]),
        group("main", "ModInitializer", &["a", "b"]),
        group("client", "ClientModInitializer", &["a"]),
    ];
    let provider = StaticProvider {
        groups: groups.clone(),
        modules: vec![],
    };

    let mut session = LoadingSession::new(session_config(&config_dir, false), Box::new(provider));
    let (sink, events) = RecordingSink::new();
    session.open_with_sink(Box::new(sink)).unwrap();

    for g in &groups {
        session.run_group(g, |_| Ok(())).unwrap();
    }

    // `client` is a final group, so the session closed itself.
    assert!(!session.is_open());
    assert!(session.tracker().is_empty());

    let events = events.lock().unwrap();
    assert_eq!(events.first().unwrap(), "open:Loading Example Game 1.0");
    assert_eq!(events.last().unwrap(), "close");
    assert_eq!(events.iter().filter(|e| *e == "close").count(), 1);
    // Bars came and went in group order.
    let adds: Vec<_> = events.iter().filter(|e| e.starts_with("add:")).collect();
    assert_eq!(
        adds,
        vec![
            "add:pre_launch:PreLaunchEntrypoint:1",
            "add:main:ModInitializer:2",
            "add:client:ClientModInitializer:1",
        ]
    );
}

#[test]
fn test_server_run_ignores_client_only_groups() {
    let config_dir = TempDir::new().unwrap();
    let groups = vec![
        group("main", "ModInitializer", &["a"]),
        group("server", "DedicatedServerModInitializer", &["a"]),
    ];
    let provider = StaticProvider {
        groups: groups.clone(),
        modules: vec![],
    };

    let mut session = LoadingSession::new(session_config(&config_dir, false), Box::new(provider));
    let (sink, _events) = RecordingSink::new();
    session.open_with_sink(Box::new(sink)).unwrap();

    session.run_group(&groups[0], |_| Ok(())).unwrap();
    assert!(session.is_open(), "main is not a final group");

    session.run_group(&groups[1], |_| Ok(())).unwrap();
    assert!(!session.is_open());
}

#[cfg(target_os = "linux")]
#[test]
fn test_memory_samples_reach_the_sink() {
    let config_dir = TempDir::new().unwrap();
    let mut session = LoadingSession::new(
        session_config(&config_dir, true),
        Box::new(StaticProvider::default()),
    );
    let (sink, events) = RecordingSink::new();
    session.open_with_sink(Box::new(sink)).unwrap();

    // The sampler emits immediately and then every 100ms.
    std::thread::sleep(std::time::Duration::from_millis(350));
    session.close();

    let events = events.lock().unwrap();
    let samples = events.iter().filter(|e| e.starts_with("memory:")).count();
    assert!(samples >= 1, "expected at least one memory sample");

    // Closing stopped the sampler; nothing arrives afterwards.
    assert_eq!(events.last().unwrap(), "close");
}

#[test]
fn test_reopen_after_close_is_a_fresh_cycle() {
    let config_dir = TempDir::new().unwrap();
    let mut session = LoadingSession::new(
        session_config(&config_dir, false),
        Box::new(StaticProvider::default()),
    );

    let (sink, _) = RecordingSink::new();
    session.open_with_sink(Box::new(sink)).unwrap();
    session.group_begin("main", "ModInitializer", 1);
    session.maybe_close_after("client");
    assert!(!session.is_open());

    let (sink, events) = RecordingSink::new();
    session.open_with_sink(Box::new(sink)).unwrap();
    assert!(session.is_open());
    assert!(session.tracker().is_empty(), "no state leaks across cycles");
    assert_eq!(
        *events.lock().unwrap(),
        vec!["open:Loading Example Game 1.0"]
    );
}
