//! Language profile and membership.

use super::{LANGUAGE, USER, USER_ALLOCATION};
use crate::config::TransferConfig;
use crate::error::{TransferError, TransferResult};
use crate::mapper::IdAllocation;
use crate::plugin::{Capabilities, FieldSpec, PayloadReader, RecordStream, ResourcePlugin};
use crate::record::Record;
use crate::registry::PluginRegistry;
use crate::store::{RelationalStore, ScopeFilter};
use crate::table::TablePlugin;
use langsnap_codec::FieldType::Text;
use langsnap_codec::Value;
use std::io::{self, Cursor, Read};
use std::iter;
use tracing::debug;

const LANGUAGE_FIELDS: &[FieldSpec] = &[
    FieldSpec::identity("id", Text),
    FieldSpec::business_key("code", Text),
    FieldSpec::data("english_name", Text),
    FieldSpec::data("local_name", Text),
    FieldSpec::data("font", Text),
    FieldSpec::data("text_direction", Text),
    FieldSpec::data("translation_ids", Text),
];

/// The language profile: a single row, stored as a JSON document.
///
/// Writing upserts the row instead of clearing it, since every other resource
/// hangs off it. On Import the profile adopts an existing destination language
/// with the same code, or gets a fresh identifier; either way the binding is
/// recorded in the `language` mapper for every later resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguagePlugin;

impl LanguagePlugin {
    fn destination_id(
        store: &dyn RelationalStore,
        record: &Record,
        config: &mut TransferConfig,
    ) -> TransferResult<Value> {
        let source = record.value("id");
        if let Some(bound) = config.mappers.lookup(LANGUAGE, &source) {
            return Ok(bound.clone());
        }
        match store.find(LANGUAGE, "code", &record.value("code"))? {
            Some(existing) => {
                let id = existing.value("id");
                config.mappers.bind(LANGUAGE, source, id.clone())?;
                Ok(id)
            }
            None => config.mappers.map_id(LANGUAGE, &source, store),
        }
    }
}

impl ResourcePlugin for LanguagePlugin {
    fn name(&self) -> &'static str {
        LANGUAGE
    }

    fn fields(&self) -> &[FieldSpec] {
        LANGUAGE_FIELDS
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_WRITE
    }

    fn identity(&self) -> Option<IdAllocation> {
        Some(IdAllocation::Uuid)
    }

    fn read<'s>(&self, store: &'s dyn RelationalStore, scope: &Value) -> TransferResult<RecordStream<'s>> {
        match store.find(LANGUAGE, "id", scope)? {
            Some(row) => Ok(Box::new(iter::once(Ok(row)))),
            None => Err(TransferError::ScopeNotFound {
                resource: LANGUAGE.to_string(),
                scope: scope.to_string(),
            }),
        }
    }

    fn encode<'s>(&self, records: RecordStream<'s>) -> PayloadReader<'s> {
        Box::new(JsonPayload {
            records: Some(records),
            buffer: Cursor::new(Vec::new()),
        })
    }

    fn decode<'p>(&self, payload: &'p [u8]) -> RecordStream<'p> {
        let record = serde_json::from_slice::<Record>(payload).map_err(|e| TransferError::corrupt(LANGUAGE, e));
        Box::new(iter::once(record))
    }

    fn write(&self, store: &dyn RelationalStore, records: RecordStream<'_>, config: &mut TransferConfig) -> TransferResult<u64> {
        let columns: Vec<&str> = LANGUAGE_FIELDS.iter().map(|f| f.column).collect();
        let mut written = 0;
        for record in records {
            let mut record = record?.project(&columns);

            if let Some(expected) = &config.scope_code {
                let found = record.value("code");
                if found.as_text() != Some(expected.as_str()) {
                    return Err(TransferError::ScopeMismatch {
                        expected: expected.clone(),
                        found: found.to_string(),
                    });
                }
            }
            if config.is_import() {
                let id = Self::destination_id(store, &record, config)?;
                record.set("id", id);
            }

            store.upsert(LANGUAGE, &record)?;
            debug!(id = %record.value("id"), code = %record.value("code"), "wrote language profile");
            written += 1;
        }
        Ok(written)
    }
}

/// Serializes the single profile row on first read.
struct JsonPayload<'s> {
    records: Option<RecordStream<'s>>,
    buffer: Cursor<Vec<u8>>,
}

impl Read for JsonPayload<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(records) = self.records.take() {
            let rows = records.collect::<TransferResult<Vec<Record>>>().map_err(io::Error::other)?;
            let [row] = rows.as_slice() else {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected one language row, found {}", rows.len()),
                ));
            };
            self.buffer = Cursor::new(serde_json::to_vec_pretty(row)?);
        }
        self.buffer.read(buf)
    }
}

/// Returns the language domain registry.
pub fn language_registry() -> PluginRegistry {
    PluginRegistry::new("language", LANGUAGE)
        .with_plugin(LanguagePlugin)
        .with_plugin(TablePlugin::new(
            "language_member_role",
            ScopeFilter::Column("language_id"),
            vec![
                FieldSpec::reference("language_id", Text, LANGUAGE),
                FieldSpec::reference("user_id", Text, USER),
                FieldSpec::data("role", Text),
            ],
        ))
        .with_external(USER, USER_ALLOCATION)
}
