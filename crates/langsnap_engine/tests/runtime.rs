//! Cancellation, retries and concurrent runs.

mod common;

use common::{panicking_registry, recorded_registry, WriteLog};
use langsnap_engine::domains::catalogue;
use langsnap_engine::{EngineConfig, SnapshotTarget, TransferConfig, TransferError, TransferState};
use langsnap_testkit::*;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

#[test]
fn cancelled_run_stops_at_the_next_transition() {
    let (env, _) = TestEnvironment::seeded();
    let orchestrator = env.orchestrator();
    let target = SnapshotTarget::new(ENG_ID, "snap-1");

    orchestrator.cancel_handle().cancel();
    let err = orchestrator.export(&catalogue(), &target).unwrap_err();
    assert!(matches!(err.root_cause(), TransferError::Cancelled));
    assert!(matches!(
        orchestrator.state(),
        TransferState::Failed { resource: "language", .. }
    ));
    assert!(env.storage.is_empty());

    orchestrator.reset_cancel();
    orchestrator.export(&catalogue(), &target).unwrap();
    assert_eq!(orchestrator.state(), TransferState::Done);
}

#[test]
fn in_flight_write_completes_before_cancellation() {
    let (source, _) = TestEnvironment::seeded();
    let target = SnapshotTarget::new(ENG_ID, "snap-1");
    let log = WriteLog::default();
    source
        .orchestrator()
        .export(&[recorded_registry(&log, None)], &target)
        .unwrap();

    let dest = source.sibling(shared_store());
    let orchestrator = dest.orchestrator();
    let registries = [recorded_registry(&log, Some(orchestrator.cancel_handle()))];
    let err = orchestrator
        .import(&registries, &target, &mut TransferConfig::import())
        .unwrap_err();

    let TransferError::PartialRun { resource, completed, source } = err else {
        panic!("expected a partial run");
    };
    assert_eq!(resource, "gloss");
    assert_eq!(completed, vec!["language", "phrase"]);
    assert!(matches!(*source, TransferError::Cancelled));
    assert_eq!(dest.store.count("phrase"), 2);
    assert_eq!(dest.store.count("gloss"), 0);
}

#[test]
fn transient_store_failures_are_retried() {
    let (env, _) = TestEnvironment::seeded();
    let orchestrator = env.orchestrator();
    env.store.fail_next(2);

    orchestrator
        .export(&catalogue(), &SnapshotTarget::new(ENG_ID, "snap-1"))
        .unwrap();
    assert_eq!(orchestrator.stats().retries, 2);
}

#[test]
fn retries_give_up_after_max_attempts() {
    let (env, _) = TestEnvironment::seeded();
    let orchestrator = env.orchestrator_with(EngineConfig::new().with_retry(quick_retry(2)));
    env.store.fail_next(2);

    let err = orchestrator
        .export(&catalogue(), &SnapshotTarget::new(ENG_ID, "snap-1"))
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err.root_cause(), TransferError::TransientIo(_)));

    let stats = orchestrator.stats();
    assert_eq!(stats.retries, 1);
    assert_eq!(stats.runs_failed, 1);
    assert!(stats.last_error.is_some());
}

#[test]
fn storage_outage_fails_the_resource() {
    let (env, _) = TestEnvironment::seeded();
    env.storage.set_available(false);
    let orchestrator = env.orchestrator_with(EngineConfig::new().with_retry(quick_retry(1)));

    let err = orchestrator
        .export(&catalogue(), &SnapshotTarget::new(ENG_ID, "snap-1"))
        .unwrap_err();
    assert!(err.is_retryable());

    env.storage.set_available(true);
    orchestrator
        .export(&catalogue(), &SnapshotTarget::new(ENG_ID, "snap-1"))
        .unwrap();
}

#[test]
fn languages_transfer_concurrently() {
    let (source, _) = TestEnvironment::seeded();
    seed_language(&source.store, "lang-spa", "spa");
    let languages = [ENG_ID, "lang-spa"];

    thread::scope(|s| {
        for language in languages {
            let env = &source;
            s.spawn(move || {
                env.orchestrator()
                    .export(&catalogue(), &SnapshotTarget::new(language, "snap-1"))
                    .unwrap()
            });
        }
    });

    let dest = source.sibling(shared_store());
    let configs: Vec<TransferConfig> = thread::scope(|s| {
        let handles: Vec<_> = languages
            .into_iter()
            .map(|language| {
                let env = &dest;
                s.spawn(move || {
                    let mut config = TransferConfig::import();
                    env.orchestrator()
                        .import(&catalogue(), &SnapshotTarget::new(language, "snap-1"), &mut config)
                        .unwrap();
                    config
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(dest.store.count("language"), 2);
    assert_eq!(dest.store.count("phrase"), 4);
    for (config, source_id) in configs.iter().zip(languages) {
        let language = config
            .mappers
            .lookup("language", &source_id.into())
            .cloned()
            .unwrap();
        let language_id = language.as_text().unwrap();
        assert_eq!(language_rows(&dest.store, "phrase", language_id).len(), 2);
        assert_eq!(language_rows(&dest.store, "phrase_word", language_id).len(), 3);
        assert_eq!(language_rows(&dest.store, "gloss", language_id).len(), 2);
    }
}

#[test]
fn panicking_plugin_does_not_wedge_the_orchestrator() {
    let (source, _) = TestEnvironment::seeded();
    let target = SnapshotTarget::new(ENG_ID, "snap-1");
    let log = WriteLog::default();
    source
        .orchestrator()
        .export(&[recorded_registry(&log, None)], &target)
        .unwrap();

    let dest = source.sibling(shared_store());
    let orchestrator = dest.orchestrator();
    let panicked = panic::catch_unwind(AssertUnwindSafe(|| {
        orchestrator.import(&[panicking_registry(&log)], &target, &mut TransferConfig::import())
    }));
    assert!(panicked.is_err());
    assert_eq!(orchestrator.state(), TransferState::Writing("phrase"));

    orchestrator
        .import(&[recorded_registry(&log, None)], &target, &mut TransferConfig::import())
        .unwrap();
    assert_eq!(orchestrator.state(), TransferState::Done);
    assert_eq!(dest.store.count("gloss"), 2);
}
