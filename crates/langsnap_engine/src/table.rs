//! A plugin for resources that map onto one scoped table.

use crate::config::TransferConfig;
use crate::error::{TransferError, TransferResult};
use crate::mapper::IdAllocation;
use crate::plugin::{extractors, remap_record, Capabilities, FieldSpec, RecordStream, ResourcePlugin};
use crate::record::Record;
use crate::store::{RelationalStore, Scope, ScopeFilter};
use langsnap_codec::{BulkTextEncoder, Value};
use std::io::BufReader;
use thiserror::Error;
use tracing::debug;

/// Signals the bulk loader that the record stream failed; the actual error is
/// kept aside by the writer.
#[derive(Debug, Error)]
#[error("record stream aborted")]
struct StreamAborted;

/// A resource stored in a single table and scoped by a [`ScopeFilter`].
///
/// Reads stream the table through [`RelationalStore::query`]; writes re-encode
/// the (remapped) records as bulk-load text and hand them to
/// [`RelationalStore::bulk_load`], so nothing is buffered between the payload
/// and the store.
///
/// ```rust
/// use langsnap_codec::FieldType;
/// use langsnap_engine::plugin::{FieldSpec, ResourcePlugin};
/// use langsnap_engine::store::ScopeFilter;
/// use langsnap_engine::TablePlugin;
///
/// let roles = TablePlugin::new(
///     "language_member_role",
///     ScopeFilter::Column("language_id"),
///     vec![
///         FieldSpec::reference("language_id", FieldType::Text, "language"),
///         FieldSpec::reference("user_id", FieldType::Text, "user"),
///         FieldSpec::data("role", FieldType::Text),
///     ],
/// );
/// assert_eq!(roles.dependencies(), vec!["language", "user"]);
/// ```
#[derive(Debug, Clone)]
pub struct TablePlugin {
    name: &'static str,
    table: &'static str,
    scope: ScopeFilter,
    fields: Vec<FieldSpec>,
    capabilities: Capabilities,
    identity: Option<IdAllocation>,
}

impl TablePlugin {
    /// Creates a plugin for the table `name` with every capability.
    pub fn new(name: &'static str, scope: ScopeFilter, fields: Vec<FieldSpec>) -> Self {
        Self {
            name,
            table: name,
            scope,
            fields,
            capabilities: Capabilities::ALL,
            identity: None,
        }
    }

    /// Stores the resource in `table` instead of a table named after it.
    #[must_use]
    pub fn with_table(mut self, table: &'static str) -> Self {
        self.table = table;
        self
    }

    /// Restricts the supported operations.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sets how the resource's own identifiers are allocated on Import.
    #[must_use]
    pub fn with_identity(mut self, identity: IdAllocation) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Returns the backing table.
    pub fn table(&self) -> &'static str {
        self.table
    }

    fn columns(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.column).collect()
    }

    fn scope(&self, value: &Value) -> Scope {
        Scope::new(self.scope, value.clone())
    }

    fn require(&self, supported: bool, operation: &'static str) -> TransferResult<()> {
        if supported {
            Ok(())
        } else {
            Err(TransferError::unsupported(self.name, operation))
        }
    }
}

impl ResourcePlugin for TablePlugin {
    fn name(&self) -> &'static str {
        self.name
    }

    fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn identity(&self) -> Option<IdAllocation> {
        self.identity
    }

    fn read<'s>(&self, store: &'s dyn RelationalStore, scope: &Value) -> TransferResult<RecordStream<'s>> {
        self.require(self.capabilities.read, "read")?;
        let rows = store.query(self.table, &self.columns(), &self.scope(scope))?;
        Ok(Box::new(rows.map(|row| row.map_err(TransferError::from))))
    }

    fn clear(&self, store: &dyn RelationalStore, scope: &Value) -> TransferResult<u64> {
        self.require(self.capabilities.clear, "clear")?;
        let deleted = store.delete(self.table, &self.scope(scope))?;
        debug!(resource = self.name, deleted, "cleared scope");
        Ok(deleted)
    }

    fn write(&self, store: &dyn RelationalStore, records: RecordStream<'_>, config: &mut TransferConfig) -> TransferResult<u64> {
        self.require(self.capabilities.write, "write")?;

        let mut failure: Option<TransferError> = None;
        let loaded = {
            let remapped = records.map(|record| {
                record
                    .and_then(|r: Record| remap_record(self.name, &self.fields, r, store, config))
                    .map_err(|e| {
                        failure = Some(e);
                        StreamAborted
                    })
            });
            let mut input = BufReader::new(BulkTextEncoder::new(remapped, extractors(&self.fields)));
            store.bulk_load(self.table, &self.columns(), &mut input)
        };

        match (loaded, failure) {
            (Ok(count), _) => Ok(count),
            (Err(_), Some(cause)) => Err(cause),
            (Err(e), None) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, OnDelete, TableSchema};
    use langsnap_codec::FieldType;

    fn store() -> InMemoryStore {
        InMemoryStore::new(vec![
            TableSchema::new("users").column("id", FieldType::Text).primary_key(&["id"]),
            TableSchema::new("note")
                .column("id", FieldType::Integer)
                .column("scope", FieldType::Text)
                .nullable("author_id", FieldType::Text)
                .column("body", FieldType::Text)
                .primary_key(&["id"])
                .sequence("id")
                .references("author_id", "users", OnDelete::Restrict),
        ])
    }

    fn plugin() -> TablePlugin {
        TablePlugin::new(
            "note",
            ScopeFilter::Column("scope"),
            vec![
                FieldSpec::identity("id", FieldType::Integer),
                FieldSpec::business_key("scope", FieldType::Text),
                FieldSpec::reference("author_id", FieldType::Text, "user"),
                FieldSpec::data("body", FieldType::Text),
            ],
        )
        .with_identity(IdAllocation::Sequence { table: "note" })
    }

    fn note(id: i64, scope: &str, author: Option<&str>, body: &str) -> Record {
        Record::new()
            .with("id", id)
            .with("scope", scope)
            .with("author_id", author)
            .with("body", body)
    }

    fn stream(records: Vec<Record>) -> RecordStream<'static> {
        Box::new(records.into_iter().map(Ok))
    }

    #[test]
    fn read_is_scoped() {
        let store = store();
        store.insert("note", note(1, "a", None, "x")).unwrap();
        store.insert("note", note(2, "b", None, "y")).unwrap();

        let rows: Vec<Record> = plugin()
            .read(&store, &Value::from("a"))
            .unwrap()
            .collect::<TransferResult<_>>()
            .unwrap();
        assert_eq!(rows, vec![note(1, "a", None, "x")]);
    }

    #[test]
    fn restore_write_keeps_keys() {
        let store = store();
        let mut config = TransferConfig::restore();
        let count = plugin()
            .write(&store, stream(vec![note(7, "a", None, "x")]), &mut config)
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.rows("note"), vec![note(7, "a", None, "x")]);
    }

    #[test]
    fn import_write_allocates_and_maps() {
        let store = store();
        store.insert("users", Record::new().with("id", "u-1")).unwrap();
        store.insert("note", note(1, "other", None, "existing")).unwrap();

        let mut config = TransferConfig::import()
            .with_mapper("note", IdAllocation::Sequence { table: "note" })
            .with_mapper("user", IdAllocation::MustExist { table: "users" });
        plugin()
            .write(&store, stream(vec![note(1, "a", Some("u-1"), "imported")]), &mut config)
            .unwrap();

        assert_eq!(config.mappers.lookup("note", &Value::Integer(1)), Some(&Value::Integer(2)));
        assert!(store.rows("note").contains(&note(2, "a", Some("u-1"), "imported")));
    }

    #[test]
    fn import_write_surfaces_dangling_reference() {
        let store = store();
        let mut config = TransferConfig::import()
            .with_mapper("note", IdAllocation::Sequence { table: "note" })
            .with_mapper("user", IdAllocation::MustExist { table: "users" });

        let err = plugin()
            .write(&store, stream(vec![note(1, "a", Some("ghost"), "x")]), &mut config)
            .unwrap_err();
        assert!(matches!(err, TransferError::DanglingReference { ref resource, .. } if resource == "user"));
        assert_eq!(store.count("note"), 0);
    }

    #[test]
    fn write_surfaces_encoding_errors() {
        let store = store();
        let mut config = TransferConfig::restore();
        let err = plugin()
            .write(&store, stream(vec![note(1, "a", None, "nul\0byte")]), &mut config)
            .unwrap_err();
        assert!(matches!(err, TransferError::Encoding(_)));
    }

    #[test]
    fn clear_is_idempotent() {
        let store = store();
        store.insert("note", note(1, "a", None, "x")).unwrap();
        store.insert("note", note(2, "b", None, "y")).unwrap();

        assert_eq!(plugin().clear(&store, &Value::from("a")).unwrap(), 1);
        assert_eq!(plugin().clear(&store, &Value::from("a")).unwrap(), 0);
        assert_eq!(store.count("note"), 1);
    }

    #[test]
    fn capabilities_are_enforced() {
        let store = store();
        let write_only = plugin().with_capabilities(Capabilities::WRITE_ONLY);
        assert!(matches!(
            write_only.read(&store, &Value::from("a")),
            Err(TransferError::Unsupported { operation: "read", .. })
        ));
    }
}
