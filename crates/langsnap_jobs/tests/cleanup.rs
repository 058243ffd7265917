//! Export artifact retention.

use chrono::{DateTime, Duration, Utc};
use langsnap_jobs::{ExportArtifact, ExportCleanupJob, InMemoryArtifactRepository, RetentionConfig};
use langsnap_storage::{InMemoryObjectStore, SnapshotStorage};
use std::sync::Arc;

struct Fixture {
    repository: Arc<InMemoryArtifactRepository>,
    storage: Arc<InMemoryObjectStore>,
    job: ExportCleanupJob<InMemoryArtifactRepository, InMemoryObjectStore>,
}

fn fixture() -> Fixture {
    let repository = Arc::new(InMemoryArtifactRepository::new());
    let storage = Arc::new(InMemoryObjectStore::new());
    let job = ExportCleanupJob::new(Arc::clone(&repository), Arc::clone(&storage), RetentionConfig::new(7).unwrap());
    Fixture {
        repository,
        storage,
        job,
    }
}

impl Fixture {
    fn add(&self, id: &str, requested_at: DateTime<Utc>, expires_at: Option<DateTime<Utc>>) {
        let key = format!("exports/{id}.zip");
        self.storage.insert(key.clone(), b"PK".to_vec());
        self.repository.insert(ExportArtifact {
            id: id.into(),
            requested_at,
            expires_at,
            export_key: Some(key),
            download_url: Some(format!("https://cdn.example.org/{id}")),
        });
    }

    fn object_exists(&self, id: &str) -> bool {
        self.storage.fetch(&format!("exports/{id}.zip")).unwrap().is_some()
    }

    fn pointers_cleared(&self, id: &str) -> bool {
        let artifact = self.repository.get(id).unwrap();
        artifact.export_key.is_none() && artifact.download_url.is_none()
    }
}

#[test]
fn explicit_expiry_in_the_past_is_deleted() {
    let f = fixture();
    let now = Utc::now();
    f.add("past", now - Duration::days(2), Some(now - Duration::seconds(1)));

    let report = f.job.run(now).unwrap();
    assert_eq!(report.deleted, vec!["past"]);
    assert!(!f.object_exists("past"));
    assert!(f.pointers_cleared("past"));
}

#[test]
fn fallback_window_applies_without_expiry() {
    let f = fixture();
    let now = Utc::now();
    f.add("old", now - Duration::days(8), None);
    f.add("recent", now - Duration::days(1), None);

    let report = f.job.run(now).unwrap();
    assert_eq!(report.examined, 2);
    assert_eq!(report.deleted, vec!["old"]);
    assert!(!f.object_exists("old"));
    assert!(f.pointers_cleared("old"));
    assert!(f.object_exists("recent"));
    assert!(!f.pointers_cleared("recent"));
}

#[test]
fn one_failure_does_not_block_the_rest() {
    let f = fixture();
    let now = Utc::now();
    f.add("a", now - Duration::days(9), None);
    f.add("b", now - Duration::days(9), None);
    // A pointer the store rejects outright.
    f.repository.insert(ExportArtifact {
        id: "broken".into(),
        requested_at: now - Duration::days(9),
        expires_at: None,
        export_key: Some("exports/../escape".into()),
        download_url: None,
    });

    let report = f.job.run(now).unwrap();
    assert_eq!(report.deleted, vec!["a", "b"]);
    assert_eq!(report.failed, vec!["broken"]);
    assert!(f.repository.get("broken").unwrap().export_key.is_some());

    let again = f.job.run(now).unwrap();
    assert_eq!(again.examined, 1);
    assert_eq!(again.failed, vec!["broken"]);
}

#[test]
fn unreadable_repository_fails_the_pass() {
    let f = fixture();
    f.repository.set_available(false);
    let err = f.job.run(Utc::now()).unwrap_err();
    assert!(err.is_retryable());
}

#[test]
fn negative_retention_is_rejected_before_any_delete() {
    let parsed = serde_json::from_str::<langsnap_jobs::JobConfig>(r#"{"retention": {"fallbackDays": -1}}"#);
    assert!(parsed.is_err());

    let f = fixture();
    let now = Utc::now();
    f.add("fresh", now - Duration::hours(1), None);
    let report = f.job.run(now).unwrap();
    assert!(report.deleted.is_empty());
    assert!(f.object_exists("fresh"));
}
