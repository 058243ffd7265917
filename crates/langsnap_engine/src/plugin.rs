//! The resource plugin contract.
//!
//! A plugin knows everything about one kind of record: how to read it for a
//! language, how to serialize it into a snapshot payload, how to decode that
//! payload, how to delete the destination's rows and how to write decoded rows
//! back, translating identifiers on the way in Import mode.

use crate::config::TransferConfig;
use crate::error::{TransferError, TransferResult};
use crate::mapper::IdAllocation;
use crate::record::Record;
use crate::store::RelationalStore;
use langsnap_codec::{BulkTextDecoder, BulkTextEncoder, FieldExtractor, FieldType, Value};
use std::io::Read;

/// A lazily evaluated stream of records.
pub type RecordStream<'a> = Box<dyn Iterator<Item = TransferResult<Record>> + Send + 'a>;

/// A byte stream holding an encoded payload.
pub type PayloadReader<'a> = Box<dyn Read + Send + 'a>;

/// Which operations a plugin supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Can be exported.
    pub read: bool,
    /// Can delete the destination's rows before writing.
    pub clear: bool,
    /// Can be imported.
    pub write: bool,
}

impl Capabilities {
    /// Read, clear and write.
    pub const ALL: Self = Self {
        read: true,
        clear: true,
        write: true,
    };

    /// Read and write without a clear step; writes replace rows in place.
    pub const READ_WRITE: Self = Self {
        read: true,
        clear: false,
        write: true,
    };

    /// Import-only: the source environment never exports this resource.
    pub const WRITE_ONLY: Self = Self {
        read: false,
        clear: true,
        write: true,
    };
}

/// What a field means for identifier translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Carried verbatim.
    Data,
    /// The resource's own primary key; allocated through its mapper.
    Identity,
    /// A foreign key into the named resource; translated, never allocated.
    Reference(&'static str),
    /// An identifier shared by every environment; carried verbatim.
    BusinessKey,
}

/// One column of a resource's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Column name.
    pub column: &'static str,
    /// Wire type.
    pub ty: FieldType,
    /// Role in identifier translation.
    pub role: FieldRole,
}

impl FieldSpec {
    /// A verbatim data column.
    pub const fn data(column: &'static str, ty: FieldType) -> Self {
        Self {
            column,
            ty,
            role: FieldRole::Data,
        }
    }

    /// The primary key column.
    pub const fn identity(column: &'static str, ty: FieldType) -> Self {
        Self {
            column,
            ty,
            role: FieldRole::Identity,
        }
    }

    /// A foreign key into `resource`.
    pub const fn reference(column: &'static str, ty: FieldType, resource: &'static str) -> Self {
        Self {
            column,
            ty,
            role: FieldRole::Reference(resource),
        }
    }

    /// A business key shared across environments.
    pub const fn business_key(column: &'static str, ty: FieldType) -> Self {
        Self {
            column,
            ty,
            role: FieldRole::BusinessKey,
        }
    }
}

/// One transferable resource.
///
/// Plugins are stateless; the per-run state lives in [`TransferConfig`].
/// Operations a plugin lacks return [`TransferError::Unsupported`].
///
/// # Invariants
///
/// - `read` streams; it never buffers a language's rows
/// - `encode` followed by `decode` yields the records that were read
/// - In Import mode `write` maps the resource's own identifiers through its
///   mapper and every reference through the referenced resource's mapper
/// - `clear` only touches rows inside the scope
pub trait ResourcePlugin: Send + Sync {
    /// Resource name; also the last segment of the snapshot key.
    fn name(&self) -> &'static str;

    /// Payload columns, in wire order.
    fn fields(&self) -> &[FieldSpec];

    /// Supported operations.
    fn capabilities(&self) -> Capabilities;

    /// How this resource's own identifiers are allocated on Import, if they
    /// need translating.
    fn identity(&self) -> Option<IdAllocation> {
        None
    }

    /// Resources this one references, excluding itself.
    fn dependencies(&self) -> Vec<&'static str> {
        let mut deps = Vec::new();
        for field in self.fields() {
            if let FieldRole::Reference(target) = field.role {
                if target != self.name() && !deps.contains(&target) {
                    deps.push(target);
                }
            }
        }
        deps
    }

    /// Streams the scope's records from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be started.
    fn read<'s>(&self, store: &'s dyn RelationalStore, scope: &Value) -> TransferResult<RecordStream<'s>> {
        let _ = (store, scope);
        Err(TransferError::unsupported(self.name(), "read"))
    }

    /// Encodes records into a payload stream.
    ///
    /// The default writes one bulk-load line per record using
    /// [`ResourcePlugin::fields`].
    fn encode<'s>(&self, records: RecordStream<'s>) -> PayloadReader<'s> {
        Box::new(BulkTextEncoder::new(records, extractors(self.fields())))
    }

    /// Decodes a payload into records.
    ///
    /// The default reads bulk-load lines using [`ResourcePlugin::fields`].
    fn decode<'p>(&self, payload: &'p [u8]) -> RecordStream<'p> {
        let name = self.name();
        let columns: Vec<&'static str> = self.fields().iter().map(|f| f.column).collect();
        let types = self.fields().iter().map(|f| f.ty).collect();
        Box::new(BulkTextDecoder::new(payload, types).map(move |row| {
            row.map(|values| columns.iter().map(|c| c.to_string()).zip(values).collect::<Record>())
                .map_err(|e| TransferError::corrupt(name, e))
        }))
    }

    /// Deletes the destination's rows inside `scope`, returning the count.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn clear(&self, store: &dyn RelationalStore, scope: &Value) -> TransferResult<u64> {
        let _ = (store, scope);
        Err(TransferError::unsupported(self.name(), "clear"))
    }

    /// Writes records into `store`, returning the count.
    ///
    /// # Errors
    ///
    /// Returns an error on encoding, mapping or constraint failures.
    fn write(&self, store: &dyn RelationalStore, records: RecordStream<'_>, config: &mut TransferConfig) -> TransferResult<u64> {
        let _ = (store, records, config);
        Err(TransferError::unsupported(self.name(), "write"))
    }
}

/// Builds bulk-text extractors for `fields`.
pub fn extractors(fields: &[FieldSpec]) -> Vec<FieldExtractor<Record>> {
    fields
        .iter()
        .map(|field| {
            let column = field.column;
            Box::new(move |record: &Record| record.value(column)) as FieldExtractor<Record>
        })
        .collect()
}

/// Translates a record's identifiers for writing.
///
/// In Restore mode the record is returned unchanged. In Import mode the
/// `resource`'s identity column is mapped through its own mapper and each
/// reference through the referenced resource's mapper.
///
/// # Errors
///
/// Returns [`TransferError::DanglingReference`] for references with no
/// destination, or a configuration error for references with no mapper.
pub fn remap_record(
    resource: &str,
    fields: &[FieldSpec],
    mut record: Record,
    store: &dyn RelationalStore,
    config: &mut TransferConfig,
) -> TransferResult<Record> {
    if !config.is_import() {
        return Ok(record);
    }
    for field in fields {
        let mapped = match field.role {
            FieldRole::Identity => config.mappers.map_id(resource, &record.value(field.column), store)?,
            FieldRole::Reference(target) => config
                .mappers
                .map_reference(target, &record.value(field.column), store)?,
            FieldRole::Data | FieldRole::BusinessKey => continue,
        };
        record.set(field.column, mapped);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Notes;

    const NOTE_FIELDS: &[FieldSpec] = &[
        FieldSpec::reference("phrase_id", FieldType::Integer, "phrase"),
        FieldSpec::reference("author_id", FieldType::Text, "user"),
        FieldSpec::reference("parent_id", FieldType::Integer, "note"),
        FieldSpec::data("content", FieldType::Text),
    ];

    impl ResourcePlugin for Notes {
        fn name(&self) -> &'static str {
            "note"
        }

        fn fields(&self) -> &[FieldSpec] {
            NOTE_FIELDS
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::READ_WRITE
        }
    }

    fn records() -> Vec<Record> {
        vec![
            Record::new()
                .with("phrase_id", 1_i64)
                .with("author_id", "u-1")
                .with("parent_id", Value::Null)
                .with("content", "tab\there"),
            Record::new()
                .with("phrase_id", 2_i64)
                .with("author_id", "u-2")
                .with("parent_id", 1_i64)
                .with("content", "line\nbreak"),
        ]
    }

    #[test]
    fn dependencies_exclude_self() {
        assert_eq!(Notes.dependencies(), vec!["phrase", "user"]);
    }

    #[test]
    fn default_codec_round_trips() {
        let stream: RecordStream<'_> = Box::new(records().into_iter().map(Ok));
        let mut payload = Vec::new();
        Notes.encode(stream).read_to_end(&mut payload).unwrap();

        let decoded: Vec<Record> = Notes.decode(&payload).collect::<TransferResult<_>>().unwrap();
        assert_eq!(decoded, records());
    }

    #[test]
    fn decode_reports_corruption() {
        let mut decoded = Notes.decode(b"1\tu-1\n");
        assert!(matches!(
            decoded.next(),
            Some(Err(TransferError::CorruptPayload { ref resource, .. })) if resource == "note"
        ));
    }

    #[test]
    fn unsupported_operations() {
        let store = crate::store::InMemoryStore::new(Vec::new());
        assert!(matches!(
            Notes.read(&store, &Value::from("l")),
            Err(TransferError::Unsupported { operation: "read", .. })
        ));
        assert!(matches!(
            Notes.clear(&store, &Value::from("l")),
            Err(TransferError::Unsupported { operation: "clear", .. })
        ));
    }

    #[test]
    fn restore_mode_leaves_records_alone() {
        let store = crate::store::InMemoryStore::new(Vec::new());
        let mut config = TransferConfig::restore();
        let record = records().remove(0);
        let out = remap_record("note", NOTE_FIELDS, record.clone(), &store, &mut config).unwrap();
        assert_eq!(out, record);
    }
}
