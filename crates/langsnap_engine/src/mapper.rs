//! Source-to-destination identifier translation.
//!
//! An Import moves rows into an environment whose identifier spaces differ
//! from the source. Each resource whose identifiers need translating gets an
//! [`IdMapper`]. Mappers remember every translation for the duration of one
//! run, so a key seen on a parent row and later on a child row resolves to the
//! same destination value.

use crate::error::{TransferError, TransferResult};
use crate::store::RelationalStore;
use langsnap_codec::Value;
use std::collections::HashMap;
use tracing::trace;
use uuid::Uuid;

/// How a mapper obtains destination identifiers for unseen source keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdAllocation {
    /// Draw from the destination table's integer sequence.
    Sequence {
        /// Table whose sequence is used.
        table: &'static str,
    },
    /// Generate a random UUID.
    Uuid,
    /// Never allocate; the key must already exist in the destination `table`
    /// and maps to itself.
    MustExist {
        /// Table that must contain the key.
        table: &'static str,
    },
}

/// Translates identifiers of one resource.
#[derive(Debug, Clone)]
pub struct IdMapper {
    resource: String,
    allocation: IdAllocation,
    mappings: HashMap<Value, Value>,
}

impl IdMapper {
    /// Creates an empty mapper.
    pub fn new(resource: impl Into<String>, allocation: IdAllocation) -> Self {
        Self {
            resource: resource.into(),
            allocation,
            mappings: HashMap::new(),
        }
    }

    /// Returns the resource this mapper translates.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Returns the allocation policy.
    pub fn allocation(&self) -> IdAllocation {
        self.allocation
    }

    /// Returns the destination already recorded for `source`.
    pub fn get(&self, source: &Value) -> Option<&Value> {
        self.mappings.get(source)
    }

    /// Returns the number of recorded translations.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Returns true if nothing has been mapped.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Records that `source` maps to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::MappingConflict`] if `source` is already bound
    /// to a different destination.
    pub fn bind(&mut self, source: Value, destination: Value) -> TransferResult<()> {
        match self.mappings.get(&source) {
            Some(existing) if *existing != destination => Err(TransferError::MappingConflict {
                resource: self.resource.clone(),
                source_id: source.to_string(),
                existing: existing.to_string(),
                requested: destination.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.mappings.insert(source, destination);
                Ok(())
            }
        }
    }

    /// Maps the primary key of a row being written.
    ///
    /// Returns the recorded destination if there is one; otherwise allocates
    /// a fresh identifier (or, for [`IdAllocation::MustExist`], checks that the
    /// key exists) and records it. Null maps to null.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::DanglingReference`] if a must-exist key is
    /// absent, or a store error if allocation fails.
    pub fn map_id(&mut self, source: &Value, store: &dyn RelationalStore) -> TransferResult<Value> {
        if source.is_null() {
            return Ok(Value::Null);
        }
        if let Some(mapped) = self.mappings.get(source) {
            return Ok(mapped.clone());
        }

        let destination = match self.allocation {
            IdAllocation::Sequence { table } => store.next_id(table)?,
            IdAllocation::Uuid => Value::Text(Uuid::new_v4().to_string()),
            IdAllocation::MustExist { table } => self.existing(source, table, store)?,
        };
        trace!(resource = %self.resource, %source, %destination, "allocated mapping");
        self.mappings.insert(source.clone(), destination.clone());
        Ok(destination)
    }

    /// Maps a foreign key pointing at this resource.
    ///
    /// Never allocates: a key whose target row has not been written this run
    /// is dangling. Must-exist keys are checked against the destination.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::DanglingReference`] if no destination exists.
    pub fn map_reference(&mut self, source: &Value, store: &dyn RelationalStore) -> TransferResult<Value> {
        if source.is_null() {
            return Ok(Value::Null);
        }
        if let Some(mapped) = self.mappings.get(source) {
            return Ok(mapped.clone());
        }

        match self.allocation {
            IdAllocation::MustExist { table } => {
                let destination = self.existing(source, table, store)?;
                self.mappings.insert(source.clone(), destination.clone());
                Ok(destination)
            }
            _ => Err(self.dangling(source)),
        }
    }

    fn existing(&self, source: &Value, table: &str, store: &dyn RelationalStore) -> TransferResult<Value> {
        if store.exists(table, source)? {
            Ok(source.clone())
        } else {
            Err(self.dangling(source))
        }
    }

    fn dangling(&self, source: &Value) -> TransferError {
        TransferError::DanglingReference {
            resource: self.resource.clone(),
            source_id: source.to_string(),
        }
    }
}

/// The mappers of one transfer run, keyed by resource name.
#[derive(Debug, Clone, Default)]
pub struct IdMappers {
    mappers: HashMap<String, IdMapper>,
}

impl IdMappers {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mapper for `resource` unless one exists.
    pub fn register(&mut self, resource: &str, allocation: IdAllocation) -> &mut IdMapper {
        self.mappers
            .entry(resource.to_string())
            .or_insert_with(|| IdMapper::new(resource, allocation))
    }

    /// Returns true if `resource` has a mapper.
    pub fn contains(&self, resource: &str) -> bool {
        self.mappers.contains_key(resource)
    }

    /// Returns the mapper for `resource`.
    pub fn get(&self, resource: &str) -> Option<&IdMapper> {
        self.mappers.get(resource)
    }

    /// Returns the mapper for `resource` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Configuration`] if none is registered.
    pub fn get_mut(&mut self, resource: &str) -> TransferResult<&mut IdMapper> {
        self.mappers
            .get_mut(resource)
            .ok_or_else(|| TransferError::Configuration(format!("no id mapper registered for {resource}")))
    }

    /// Returns the destination recorded for `source`, if any.
    pub fn lookup(&self, resource: &str, source: &Value) -> Option<&Value> {
        self.mappers.get(resource).and_then(|m| m.get(source))
    }

    /// See [`IdMapper::map_id`].
    ///
    /// # Errors
    ///
    /// As [`IdMapper::map_id`], or a configuration error if `resource` has no mapper.
    pub fn map_id(&mut self, resource: &str, source: &Value, store: &dyn RelationalStore) -> TransferResult<Value> {
        self.get_mut(resource)?.map_id(source, store)
    }

    /// See [`IdMapper::map_reference`].
    ///
    /// # Errors
    ///
    /// As [`IdMapper::map_reference`], or a configuration error if `resource`
    /// has no mapper.
    pub fn map_reference(&mut self, resource: &str, source: &Value, store: &dyn RelationalStore) -> TransferResult<Value> {
        self.get_mut(resource)?.map_reference(source, store)
    }

    /// See [`IdMapper::bind`].
    ///
    /// # Errors
    ///
    /// As [`IdMapper::bind`], or a configuration error if `resource` has no mapper.
    pub fn bind(&mut self, resource: &str, source: Value, destination: Value) -> TransferResult<()> {
        self.get_mut(resource)?.bind(source, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::store::{InMemoryStore, TableSchema};
    use langsnap_codec::FieldType;

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new(vec![
            TableSchema::new("users").column("id", FieldType::Text).primary_key(&["id"]),
            TableSchema::new("phrase")
                .column("id", FieldType::Integer)
                .primary_key(&["id"])
                .sequence("id"),
        ]);
        store.insert("users", Record::new().with("id", "u-1")).unwrap();
        store.insert("phrase", Record::new().with("id", 41_i64)).unwrap();
        store
    }

    #[test]
    fn sequence_allocation_is_stable() {
        let store = store();
        let mut mapper = IdMapper::new("phrase", IdAllocation::Sequence { table: "phrase" });

        let first = mapper.map_id(&Value::Integer(1), &store).unwrap();
        let second = mapper.map_id(&Value::Integer(2), &store).unwrap();
        assert_eq!(first, Value::Integer(42));
        assert_eq!(second, Value::Integer(43));

        assert_eq!(mapper.map_id(&Value::Integer(1), &store).unwrap(), first);
        assert_eq!(mapper.map_reference(&Value::Integer(2), &store).unwrap(), second);
        assert_eq!(mapper.len(), 2);
    }

    #[test]
    fn references_never_allocate() {
        let store = store();
        let mut mapper = IdMapper::new("phrase", IdAllocation::Sequence { table: "phrase" });

        let err = mapper.map_reference(&Value::Integer(7), &store).unwrap_err();
        assert!(matches!(err, TransferError::DanglingReference { ref resource, .. } if resource == "phrase"));
        assert!(mapper.is_empty());
    }

    #[test]
    fn must_exist_maps_to_itself() {
        let store = store();
        let mut users = IdMapper::new("user", IdAllocation::MustExist { table: "users" });

        assert_eq!(users.map_reference(&Value::from("u-1"), &store).unwrap(), Value::from("u-1"));
        assert!(matches!(
            users.map_reference(&Value::from("u-9"), &store),
            Err(TransferError::DanglingReference { .. })
        ));
        assert!(matches!(
            users.map_id(&Value::from("u-9"), &store),
            Err(TransferError::DanglingReference { .. })
        ));
    }

    #[test]
    fn null_maps_to_null() {
        let store = store();
        let mut mapper = IdMapper::new("user", IdAllocation::MustExist { table: "users" });
        assert_eq!(mapper.map_reference(&Value::Null, &store).unwrap(), Value::Null);
        assert_eq!(mapper.map_id(&Value::Null, &store).unwrap(), Value::Null);
    }

    #[test]
    fn bind_detects_conflicts() {
        let mut mapper = IdMapper::new("language", IdAllocation::Uuid);
        mapper.bind(Value::from("src"), Value::from("dst")).unwrap();
        mapper.bind(Value::from("src"), Value::from("dst")).unwrap();
        assert!(matches!(
            mapper.bind(Value::from("src"), Value::from("other")),
            Err(TransferError::MappingConflict { .. })
        ));
    }

    #[test]
    fn unregistered_resource_is_a_configuration_error() {
        let store = store();
        let mut mappers = IdMappers::new();
        mappers.register("user", IdAllocation::MustExist { table: "users" });

        assert!(mappers.map_reference("user", &Value::from("u-1"), &store).is_ok());
        assert!(matches!(
            mappers.map_reference("phrase", &Value::Integer(1), &store),
            Err(TransferError::Configuration(_))
        ));
        assert_eq!(mappers.lookup("user", &Value::from("u-1")), Some(&Value::from("u-1")));
    }
}
