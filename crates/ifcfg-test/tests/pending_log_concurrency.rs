//! Pending change log tests under concurrent writers

use std::sync::Arc;

use ifcfg_common::field_values;
use ifcfg_model::{MutationStatus, PendingChangeLog};
use ifcfg_test::{ConfigFixture, TestEnv};
use tempfile::TempDir;

/// Scenario:
/// 1. Spawn N tasks, each appending one retired name
/// 2. Verify the log holds exactly N distinct, well-formed lines
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_append_every_line() {
    const REQUESTS: usize = 64;

    let dir = TempDir::new().unwrap();
    let log = Arc::new(PendingChangeLog::new(dir.path().join(".vlans.removed")));

    let tasks: Vec<_> = (1..=REQUESTS)
        .map(|tag| {
            let log = Arc::clone(&log);
            tokio::task::spawn_blocking(move || log.append(&format!("igb0_vlan{}", tag)))
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let raw = std::fs::read_to_string(log.path()).unwrap();
    let lines: Vec<&str> = raw.split_terminator('\n').collect();
    assert_eq!(lines.len(), REQUESTS);
    assert!(lines.iter().all(|line| {
        line.strip_prefix("igb0_vlan")
            .is_some_and(|tag| tag.parse::<u16>().is_ok())
    }));

    let mut drained = log.drain().unwrap();
    drained.sort();
    drained.dedup();
    assert_eq!(drained.len(), REQUESTS);
    assert!(log.entries().unwrap().is_empty());
}

/// Deletes issued from many threads against one controller queue one line
/// per deleted VLAN.
#[test]
fn test_concurrent_deletes_through_controller() {
    const VLANS: u16 = 24;

    let fixture = (1..=VLANS).fold(ConfigFixture::new(), |fixture, tag| {
        fixture.with_vlan(&format!("vlan-{}", tag), "ix0", tag)
    });
    let env = Arc::new(TestEnv::start(fixture.build()).unwrap());

    std::thread::scope(|scope| {
        for tag in 1..=VLANS {
            let env = Arc::clone(&env);
            scope.spawn(move || {
                let result = env.vlans.del_item(&format!("vlan-{}", tag)).unwrap();
                assert_eq!(result.result, MutationStatus::Deleted);
            });
        }
    });

    let mut pending = env.vlans.pending_removals().unwrap();
    assert_eq!(pending.len(), usize::from(VLANS));
    pending.sort();
    pending.dedup();
    assert_eq!(pending.len(), usize::from(VLANS));
    assert!(env.reload().unwrap().records("vlans.vlan").is_empty());
    assert_eq!(env.snapshot().revision(), u64::from(VLANS));
}

#[test]
fn test_failed_mutation_appends_nothing() {
    let env = TestEnv::start(ConfigFixture::new().with_vlan("v", "em0", 10).build()).unwrap();
    let result = env
        .vlans
        .set_item("v", &field_values! { "tag" => "5000" })
        .unwrap();
    assert_eq!(result.result, MutationStatus::Failed);
    assert!(!env.pending_path().exists());
}
