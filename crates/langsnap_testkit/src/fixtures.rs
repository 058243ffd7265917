//! Seeded stores and environments.
//!
//! The seeded graph is the two-phrase `eng` language used throughout the
//! engine's tests: phrase 1 links words `w1` and `w2` with the approved
//! gloss "word"; phrase 2 links `w3` with the gloss "of God". Notes,
//! roles, tracking events and statistics hang off the same phrases so every
//! exportable resource has at least one row.

use langsnap_codec::Value;
use langsnap_engine::domains::schema;
use langsnap_engine::store::{InMemoryStore, RelationalStore};
use langsnap_engine::{EngineConfig, Orchestrator, Record, RetryConfig};
use langsnap_storage::{FileObjectStore, InMemoryObjectStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Users present in every seeded environment.
pub const USERS: [&str; 2] = ["user-ana", "user-ben"];

/// Words present in every seeded environment.
pub const WORDS: [&str; 3] = ["w1", "w2", "w3"];

/// Source identifier of the seeded `eng` language.
pub const ENG_ID: &str = "lang-eng";

/// Business key of the seeded language.
pub const ENG_CODE: &str = "eng";

/// A footnote body that needs every bulk-load escape.
pub const TRICKY_NOTE: &str = "see\tverse 3\nline two \\ end";

/// Resources with a read and a write side, i.e. those a snapshot restores.
pub const ROUND_TRIP_RESOURCES: [&str; 10] = [
    "language",
    "language_member_role",
    "phrase",
    "phrase_word",
    "gloss",
    "footnote",
    "translator_note",
    "tracking_event",
    "weekly_contribution_statistics",
    "weekly_gloss_statistics",
];

/// Identifiers of a seeded language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededLanguage {
    /// Language primary key.
    pub id: String,
    /// Language code.
    pub code: String,
    /// Phrase primary keys, in creation order.
    pub phrase_ids: Vec<i64>,
}

/// Creates an empty store with the platform schema.
pub fn empty_store() -> InMemoryStore {
    InMemoryStore::new(schema())
}

/// Creates a store holding the shared users and words.
pub fn shared_store() -> InMemoryStore {
    let store = empty_store();
    seed_shared(&store);
    store
}

/// Creates a store holding the shared rows and the `eng` language.
pub fn seeded_store() -> (InMemoryStore, SeededLanguage) {
    let store = shared_store();
    let language = seed_language(&store, ENG_ID, ENG_CODE);
    (store, language)
}

/// Inserts the users and words every environment shares.
pub fn seed_shared(store: &InMemoryStore) {
    for (n, user) in USERS.iter().enumerate() {
        insert(
            store,
            "users",
            Record::new().with("id", *user).with("email", format!("user{n}@example.org")),
        );
    }
    for word in WORDS {
        insert(store, "word", Record::new().with("id", word).with("text", word.to_uppercase()));
    }
}

/// Inserts a language with the two-phrase graph.
///
/// Phrase ids come from the store's sequence, so several languages can be
/// seeded into one store.
pub fn seed_language(store: &InMemoryStore, id: &str, code: &str) -> SeededLanguage {
    let [ana, ben] = USERS;
    insert(
        store,
        "language",
        Record::new()
            .with("id", id)
            .with("code", code)
            .with("english_name", format!("Language {code}"))
            .with("local_name", Value::Null)
            .with("font", "Noto Sans")
            .with("text_direction", "ltr")
            .with("translation_ids", Value::Null),
    );
    for (user, role) in [(ana, "ADMIN"), (ana, "TRANSLATOR"), (ben, "VIEWER")] {
        insert(
            store,
            "language_member_role",
            Record::new().with("language_id", id).with("user_id", user).with("role", role),
        );
    }

    let phrases = [(&["w1", "w2"][..], "word", ana), (&["w3"][..], "of God", ben)];
    let mut phrase_ids = Vec::new();
    for (n, (words, gloss, author)) in phrases.into_iter().enumerate() {
        let phrase_id = next_phrase_id(store);
        phrase_ids.push(phrase_id);
        let created_at = format!("2024-03-0{}T10:00:00Z", n + 1);
        insert(
            store,
            "phrase",
            Record::new()
                .with("id", phrase_id)
                .with("language_id", id)
                .with("created_at", created_at.as_str())
                .with("created_by", author)
                .with("deleted_at", Value::Null)
                .with("deleted_by", Value::Null),
        );
        for word in words {
            insert(
                store,
                "phrase_word",
                Record::new().with("phrase_id", phrase_id).with("word_id", *word),
            );
        }
        insert(
            store,
            "gloss",
            Record::new()
                .with("phrase_id", phrase_id)
                .with("gloss", gloss)
                .with("state", "APPROVED")
                .with("updated_at", created_at.as_str())
                .with("updated_by", author)
                .with("source", "USER"),
        );
    }

    insert(
        store,
        "footnote",
        Record::new()
            .with("phrase_id", phrase_ids[0])
            .with("author_id", ana)
            .with("timestamp", "2024-03-05T09:30:00Z")
            .with("content", TRICKY_NOTE),
    );
    insert(
        store,
        "translator_note",
        Record::new()
            .with("phrase_id", phrase_ids[1])
            .with("author_id", ben)
            .with("timestamp", "2024-03-06T09:30:00Z")
            .with("content", "check the Greek"),
    );
    insert(
        store,
        "machine_gloss",
        Record::new()
            .with("word_id", "w1")
            .with("language_id", id)
            .with("gloss", "word")
            .with("model", "google-translate"),
    );
    insert(
        store,
        "tracking_event",
        Record::new()
            .with("id", Value::Null)
            .with("type", "approved_gloss")
            .with("user_id", ana)
            .with("language_id", id)
            .with("data", format!("{{\"phraseId\":{}}}", phrase_ids[0]))
            .with("created_at", "2024-03-01T10:05:00Z"),
    );
    insert(
        store,
        "weekly_contribution_statistics",
        Record::new()
            .with("week", "2024-03-03")
            .with("language_id", id)
            .with("user_id", ana)
            .with("book_id", 40_i64)
            .with("approved_count", 2_i64)
            .with("revised_count", 1_i64)
            .with("unapproved_count", 0_i64),
    );
    insert(
        store,
        "weekly_gloss_statistics",
        Record::new()
            .with("week", "2024-03-03")
            .with("language_id", id)
            .with("book_id", 40_i64)
            .with("approved_count", 2_i64)
            .with("unapproved_count", 0_i64),
    );

    SeededLanguage {
        id: id.to_string(),
        code: code.to_string(),
        phrase_ids,
    }
}

/// Returns a resource's rows sorted for comparison.
pub fn sorted_rows(store: &InMemoryStore, table: &str) -> Vec<Record> {
    let mut rows = store.rows(table);
    rows.sort();
    rows
}

/// Returns the rows of `table` belonging to `language_id`, directly or
/// through their phrase.
pub fn language_rows(store: &InMemoryStore, table: &str, language_id: &str) -> Vec<Record> {
    let phrases: Vec<Value> = store
        .rows("phrase")
        .into_iter()
        .filter(|p| p.value("language_id").as_text() == Some(language_id))
        .map(|p| p.value("id"))
        .collect();
    let mut rows: Vec<Record> = store
        .rows(table)
        .into_iter()
        .filter(|row| match row.get("language_id") {
            Some(lang) => lang.as_text() == Some(language_id),
            None if table == "language" => row.value("id").as_text() == Some(language_id),
            None => phrases.contains(&row.value("phrase_id")),
        })
        .collect();
    rows.sort();
    rows
}

/// A retry policy fast enough for tests.
pub fn quick_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::new(max_attempts)
        .with_initial_delay(Duration::from_millis(1))
        .with_max_delay(Duration::from_millis(5))
        .with_jitter(false)
}

/// A relational store and object store shared by one or more orchestrators.
#[derive(Debug, Clone)]
pub struct TestEnvironment {
    /// Relational store.
    pub store: Arc<InMemoryStore>,
    /// Object store.
    pub storage: Arc<InMemoryObjectStore>,
}

impl TestEnvironment {
    /// Wraps a store with an empty object store.
    pub fn new(store: InMemoryStore) -> Self {
        Self {
            store: Arc::new(store),
            storage: Arc::new(InMemoryObjectStore::new()),
        }
    }

    /// An environment holding the seeded `eng` language.
    pub fn seeded() -> (Self, SeededLanguage) {
        let (store, language) = seeded_store();
        (Self::new(store), language)
    }

    /// A second environment sharing this one's object store but with its
    /// own relational store, as when seeding another deployment.
    pub fn sibling(&self, store: InMemoryStore) -> Self {
        Self {
            store: Arc::new(store),
            storage: Arc::clone(&self.storage),
        }
    }

    /// Creates an orchestrator over this environment with quick retries.
    pub fn orchestrator(&self) -> Orchestrator<InMemoryStore, InMemoryObjectStore> {
        self.orchestrator_with(EngineConfig::new().with_retry(quick_retry(3)))
    }

    /// Creates an orchestrator with an explicit configuration.
    pub fn orchestrator_with(&self, config: EngineConfig) -> Orchestrator<InMemoryStore, InMemoryObjectStore> {
        Orchestrator::new(config, Arc::clone(&self.store), Arc::clone(&self.storage))
    }
}

/// A filesystem bucket in a temporary directory.
pub struct TempBucket {
    /// The bucket.
    pub storage: Arc<FileObjectStore>,
    _dir: TempDir,
}

impl TempBucket {
    /// Creates an empty bucket.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let storage = FileObjectStore::open(dir.path()).expect("Failed to open bucket");
        Self {
            storage: Arc::new(storage),
            _dir: dir,
        }
    }
}

impl Default for TempBucket {
    fn default() -> Self {
        Self::new()
    }
}

fn next_phrase_id(store: &InMemoryStore) -> i64 {
    store
        .next_id("phrase")
        .expect("phrase has a sequence")
        .as_integer()
        .expect("sequence ids are integers")
}

fn insert(store: &InMemoryStore, table: &str, record: Record) {
    if let Err(e) = store.insert(table, record) {
        panic!("Failed to seed {table}: {e}");
    }
}
