//! Plugins shared by the integration tests.

#![allow(dead_code)]

use langsnap_codec::FieldType::{Integer, Text};
use langsnap_codec::Value;
use langsnap_engine::domains::{LanguagePlugin, LANGUAGE, USER, USER_ALLOCATION};
use langsnap_engine::plugin::{PayloadReader, RecordStream};
use langsnap_engine::store::{RelationalStore, ScopeFilter};
use langsnap_engine::{
    CancelHandle, Capabilities, FieldSpec, IdAllocation, PluginRegistry, ResourcePlugin, TablePlugin,
    TransferConfig, TransferResult,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Resources whose `write` has returned, in order.
pub type WriteLog = Arc<Mutex<Vec<&'static str>>>;

/// Wraps a plugin to check, on every write, that the resources it references
/// were written earlier in the run.
pub struct Recorded<P> {
    pub inner: P,
    pub log: WriteLog,
    /// Cancels the run once this plugin's write returns.
    pub cancel_after_write: Option<CancelHandle>,
    /// Panics instead of writing.
    pub panic_on_write: bool,
}

impl<P> Recorded<P> {
    pub fn new(inner: P, log: WriteLog) -> Self {
        Self {
            inner,
            log,
            cancel_after_write: None,
            panic_on_write: false,
        }
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_write = true;
        self
    }

    pub fn cancelling(mut self, handle: CancelHandle) -> Self {
        self.cancel_after_write = Some(handle);
        self
    }
}

impl<P: ResourcePlugin> ResourcePlugin for Recorded<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn fields(&self) -> &[FieldSpec] {
        self.inner.fields()
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn identity(&self) -> Option<IdAllocation> {
        self.inner.identity()
    }

    fn read<'s>(&self, store: &'s dyn RelationalStore, scope: &Value) -> TransferResult<RecordStream<'s>> {
        self.inner.read(store, scope)
    }

    fn encode<'s>(&self, records: RecordStream<'s>) -> PayloadReader<'s> {
        self.inner.encode(records)
    }

    fn decode<'p>(&self, payload: &'p [u8]) -> RecordStream<'p> {
        self.inner.decode(payload)
    }

    fn clear(&self, store: &dyn RelationalStore, scope: &Value) -> TransferResult<u64> {
        self.inner.clear(store, scope)
    }

    fn write(
        &self,
        store: &dyn RelationalStore,
        records: RecordStream<'_>,
        config: &mut TransferConfig,
    ) -> TransferResult<u64> {
        if self.panic_on_write {
            panic!("{} write exploded", self.name());
        }
        {
            let log = self.log.lock();
            for dep in self.dependencies() {
                if dep != USER {
                    assert!(log.contains(&dep), "{} written before {dep}", self.name());
                }
            }
        }
        let written = self.inner.write(store, records, config)?;
        self.log.lock().push(self.name());
        if let Some(handle) = &self.cancel_after_write {
            handle.cancel();
        }
        Ok(written)
    }
}

pub fn phrase_plugin() -> TablePlugin {
    TablePlugin::new(
        "phrase",
        ScopeFilter::Column("language_id"),
        vec![
            FieldSpec::identity("id", Integer),
            FieldSpec::reference("language_id", Text, LANGUAGE),
            FieldSpec::data("created_at", Text),
            FieldSpec::reference("created_by", Text, USER),
            FieldSpec::data("deleted_at", Text),
            FieldSpec::reference("deleted_by", Text, USER),
        ],
    )
    .with_identity(IdAllocation::Sequence { table: "phrase" })
}

pub fn gloss_plugin() -> TablePlugin {
    TablePlugin::new(
        "gloss",
        ScopeFilter::Parent {
            column: "phrase_id",
            table: "phrase",
            scope_column: "language_id",
        },
        vec![
            FieldSpec::reference("phrase_id", Integer, "phrase"),
            FieldSpec::data("gloss", Text),
            FieldSpec::data("state", Text),
            FieldSpec::data("updated_at", Text),
            FieldSpec::reference("updated_by", Text, USER),
            FieldSpec::data("source", Text),
        ],
    )
}

/// The three-resource registry with a phrase plugin that panics on write.
pub fn panicking_registry(log: &WriteLog) -> PluginRegistry {
    PluginRegistry::new("recorded", LANGUAGE)
        .with_plugin(Recorded::new(LanguagePlugin, Arc::clone(log)))
        .with_plugin(Recorded::new(phrase_plugin(), Arc::clone(log)).panicking())
        .with_plugin(Recorded::new(gloss_plugin(), Arc::clone(log)))
        .with_external(USER, USER_ALLOCATION)
}

/// A three-resource registry whose writes are logged.
pub fn recorded_registry(log: &WriteLog, cancel_after_phrase: Option<CancelHandle>) -> PluginRegistry {
    let mut phrase = Recorded::new(phrase_plugin(), Arc::clone(log));
    if let Some(handle) = cancel_after_phrase {
        phrase = phrase.cancelling(handle);
    }
    PluginRegistry::new("recorded", LANGUAGE)
        .with_plugin(Recorded::new(LanguagePlugin, Arc::clone(log)))
        .with_plugin(phrase)
        .with_plugin(Recorded::new(gloss_plugin(), Arc::clone(log)))
        .with_external(USER, USER_ALLOCATION)
}
