//! Export then restore within one environment.

use langsnap_codec::Value;
use langsnap_engine::domains::catalogue;
use langsnap_engine::store::{RelationalStore, Scope, ScopeFilter};
use langsnap_engine::{
    EngineConfig, Orchestrator, ResourceStatus, SkipReason, SnapshotTarget, TransferConfig, TransferError,
    TransferState,
};
use langsnap_storage::SnapshotStorage;
use langsnap_testkit::*;
use std::collections::BTreeMap;
use std::sync::Arc;

fn snapshot_of(env: &TestEnvironment, language_id: &str) -> BTreeMap<&'static str, Vec<langsnap_engine::Record>> {
    ROUND_TRIP_RESOURCES
        .iter()
        .map(|r| (*r, language_rows(&env.store, r, language_id)))
        .collect()
}

fn wipe_phrases(env: &TestEnvironment) {
    let scope = Scope::new(ScopeFilter::Column("language_id"), Value::from(ENG_ID));
    env.store.delete("phrase", &scope).unwrap();
    env.store.delete("tracking_event", &scope).unwrap();
    assert!(language_rows(&env.store, "gloss", ENG_ID).is_empty());
}

#[test]
fn export_writes_one_object_per_readable_resource() {
    let (env, _) = TestEnvironment::seeded();
    let target = SnapshotTarget::new(ENG_ID, "snap-1");
    let report = env.orchestrator().export(&catalogue(), &target).unwrap();

    let mut keys = env.storage.keys_with_prefix("lang-eng/snap-1/");
    keys.sort();
    let mut expected: Vec<String> = ROUND_TRIP_RESOURCES.iter().map(|r| format!("lang-eng/snap-1/{r}")).collect();
    expected.sort();
    assert_eq!(keys, expected);

    assert_eq!(report.resources_processed(), 10);
    assert_eq!(report.get("phrase").unwrap().records, 2);
    assert_eq!(report.get("phrase_word").unwrap().records, 3);
    assert_eq!(
        report.get("machine_gloss").unwrap().status,
        ResourceStatus::Skipped(SkipReason::NotExported)
    );

    let phrase_words = env.storage.fetch("lang-eng/snap-1/phrase_word").unwrap().unwrap();
    let text = String::from_utf8(phrase_words).unwrap();
    assert_eq!(text.lines().count(), 4);
    assert!(text.ends_with("\\.\n"));
}

#[test]
fn restore_reproduces_the_exported_rows() {
    let (env, _) = TestEnvironment::seeded();
    let before = snapshot_of(&env, ENG_ID);
    let target = SnapshotTarget::new(ENG_ID, "snap-1");
    let orchestrator = env.orchestrator();
    orchestrator.export(&catalogue(), &target).unwrap();

    wipe_phrases(&env);
    let mut config = TransferConfig::restore().with_scope_code(ENG_CODE);
    let report = orchestrator.import(&catalogue(), &target, &mut config).unwrap();

    assert_eq!(snapshot_of(&env, ENG_ID), before);
    assert_eq!(orchestrator.state(), TransferState::Done);
    assert_eq!(
        report.get("machine_gloss").unwrap().status,
        ResourceStatus::Skipped(SkipReason::ClearedOnly)
    );
    let footnote = &language_rows(&env.store, "footnote", ENG_ID)[0];
    assert_eq!(footnote.value("content"), Value::from(TRICKY_NOTE));
}

#[test]
fn restore_twice_is_stable() {
    let (env, _) = TestEnvironment::seeded();
    let before = snapshot_of(&env, ENG_ID);
    let target = SnapshotTarget::new(ENG_ID, "snap-1");
    let orchestrator = env.orchestrator();
    orchestrator.export(&catalogue(), &target).unwrap();

    let mut config = TransferConfig::restore();
    orchestrator.import(&catalogue(), &target, &mut config).unwrap();
    orchestrator.import(&catalogue(), &target, &mut config).unwrap();

    assert_eq!(snapshot_of(&env, ENG_ID), before);
    assert_eq!(orchestrator.stats().runs_completed, 3);
}

#[test]
fn restore_clears_suggestions_that_are_never_exported() {
    let (env, _) = TestEnvironment::seeded();
    seed_language(&env.store, "lang-spa", "spa");
    let target = SnapshotTarget::new(ENG_ID, "snap-1");
    let orchestrator = env.orchestrator();
    orchestrator.export(&catalogue(), &target).unwrap();
    assert!(env.storage.fetch("lang-eng/snap-1/machine_gloss").unwrap().is_none());
    assert_eq!(language_rows(&env.store, "machine_gloss", ENG_ID).len(), 1);

    let report = orchestrator
        .import(&catalogue(), &target, &mut TransferConfig::restore())
        .unwrap();

    assert!(language_rows(&env.store, "machine_gloss", ENG_ID).is_empty());
    assert_eq!(language_rows(&env.store, "machine_gloss", "lang-spa").len(), 1);
    let machine_gloss = report.get("machine_gloss").unwrap();
    assert_eq!(machine_gloss.status, ResourceStatus::Skipped(SkipReason::ClearedOnly));
    assert_eq!(machine_gloss.records, 0);
    assert_eq!(report.resources_processed(), 10);
}

#[test]
fn restore_through_a_filesystem_bucket() {
    let (env, _) = TestEnvironment::seeded();
    let before = snapshot_of(&env, ENG_ID);
    let bucket = TempBucket::new();
    let orchestrator = Orchestrator::new(EngineConfig::new(), Arc::clone(&env.store), Arc::clone(&bucket.storage));
    let target = SnapshotTarget::new(ENG_ID, "snap-fs");

    orchestrator.export(&catalogue(), &target).unwrap();
    assert!(bucket.storage.root().join("lang-eng/snap-fs/gloss").exists());

    wipe_phrases(&env);
    orchestrator
        .import(&catalogue(), &target, &mut TransferConfig::restore())
        .unwrap();
    assert_eq!(snapshot_of(&env, ENG_ID), before);
}

#[test]
fn clearing_twice_leaves_the_same_state() {
    let (env, _) = TestEnvironment::seeded();
    seed_language(&env.store, "lang-spa", "spa");
    let registries = catalogue();
    let scope = Value::from(ENG_ID);

    for name in ["phrase_word", "gloss", "phrase", "tracking_event"] {
        let plugin = registries.iter().find_map(|r| r.get(name)).unwrap();
        plugin.clear(env.store.as_ref(), &scope).unwrap();
        let once = env.store.dump();
        assert_eq!(plugin.clear(env.store.as_ref(), &scope).unwrap(), 0);
        assert_eq!(env.store.dump(), once);
    }

    assert!(language_rows(&env.store, "phrase", ENG_ID).is_empty());
    assert_eq!(language_rows(&env.store, "phrase", "lang-spa").len(), 2);
    assert_eq!(language_rows(&env.store, "gloss", "lang-spa").len(), 2);
}

#[test]
fn corrupt_payload_leaves_destination_untouched() {
    let (env, _) = TestEnvironment::seeded();
    let target = SnapshotTarget::new(ENG_ID, "snap-1");
    let orchestrator = env.orchestrator();
    orchestrator.export(&catalogue(), &target).unwrap();
    let before = env.store.dump();

    env.storage.insert("lang-eng/snap-1/phrase", b"1\tlang-eng\n".to_vec());
    let err = orchestrator
        .import(&catalogue(), &target, &mut TransferConfig::restore())
        .unwrap_err();

    let TransferError::PartialRun { resource, completed, source } = err else {
        panic!("expected a partial run");
    };
    assert_eq!(resource, "phrase");
    assert_eq!(completed, vec!["language", "language_member_role"]);
    assert!(matches!(*source, TransferError::CorruptPayload { .. }));
    assert_eq!(env.store.rows("phrase"), before["phrase"]);
    assert_eq!(orchestrator.stats().runs_failed, 1);
}

#[test]
fn payload_with_trailing_data_is_corrupt() {
    let (env, _) = TestEnvironment::seeded();
    let target = SnapshotTarget::new(ENG_ID, "snap-1");
    let orchestrator = env.orchestrator();
    orchestrator.export(&catalogue(), &target).unwrap();
    let before = language_rows(&env.store, "language_member_role", ENG_ID);

    let key = "lang-eng/snap-1/language_member_role";
    let mut payload = env.storage.fetch(key).unwrap().unwrap();
    payload.extend_from_slice(b"lang-eng\tuser-ben\tADMIN\n");
    env.storage.insert(key, payload);

    let err = orchestrator
        .import(&catalogue(), &target, &mut TransferConfig::restore())
        .unwrap_err();
    assert!(matches!(
        err.root_cause(),
        TransferError::CorruptPayload { resource, .. } if resource == "language_member_role"
    ));
    assert_eq!(language_rows(&env.store, "language_member_role", ENG_ID), before);
}

#[test]
fn export_of_unknown_language_fails_on_the_scope() {
    let (env, _) = TestEnvironment::seeded();
    let err = env
        .orchestrator()
        .export(&catalogue(), &SnapshotTarget::new("lang-none", "snap-1"))
        .unwrap_err();
    assert!(matches!(err.root_cause(), TransferError::ScopeNotFound { .. }));
    assert!(!err.is_retryable());
    assert!(env.storage.is_empty());
}
