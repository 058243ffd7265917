//! In-memory relational store.

use super::schema::{Identity, OnDelete, TableSchema};
use super::{RelationalStore, RowStream, Scope, ScopeFilter, StoreError, StoreResult};
use crate::record::Record;
use langsnap_codec::{BulkTextDecoder, Value};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io::BufRead;
use std::ops::Bound;
use std::slice;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::{debug, trace};
use uuid::Uuid;

/// Tuning for [`InMemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Rows fetched per cursor batch.
    pub fetch_size: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self { fetch_size: 128 }
    }
}

impl MemoryStoreConfig {
    /// Sets the cursor batch size (at least one row).
    #[must_use]
    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size.max(1);
        self
    }
}

/// Every table's rows, keyed by table name.
pub type StoreDump = BTreeMap<String, Vec<Record>>;

type Key = Vec<Value>;

#[derive(Debug, Clone)]
struct Table {
    rows: BTreeMap<Key, Record>,
    next_id: i64,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

type Tables = HashMap<&'static str, Table>;

/// A relational store held entirely in memory.
///
/// Enforces primary keys, foreign keys (with restrict or cascade deletes),
/// unique columns, nullability and column types. Queries are served by a
/// cursor that takes the read lock once per batch, so concurrent transfers
/// interleave the way they would against a real database.
///
/// Connectivity failures can be simulated with
/// [`InMemoryStore::set_available`] and [`InMemoryStore::fail_next`].
pub struct InMemoryStore {
    schemas: Vec<TableSchema>,
    tables: RwLock<Tables>,
    config: MemoryStoreConfig,
    available: AtomicBool,
    injected_failures: AtomicU32,
}

impl InMemoryStore {
    /// Creates an empty store with the given tables.
    pub fn new(schemas: Vec<TableSchema>) -> Self {
        Self::with_config(schemas, MemoryStoreConfig::default())
    }

    /// Creates an empty store with explicit tuning.
    pub fn with_config(schemas: Vec<TableSchema>, config: MemoryStoreConfig) -> Self {
        let tables = schemas.iter().map(|s| (s.name, Table::default())).collect();
        Self {
            schemas,
            tables: RwLock::new(tables),
            config,
            available: AtomicBool::new(true),
            injected_failures: AtomicU32::new(0),
        }
    }

    /// Returns the table definitions in declaration order.
    pub fn schemas(&self) -> &[TableSchema] {
        &self.schemas
    }

    /// Sets whether the store answers requests.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Makes the next `count` operations fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self, count: u32) {
        self.injected_failures.store(count, Ordering::SeqCst);
    }

    /// Inserts a single row.
    ///
    /// # Errors
    ///
    /// Returns an error on a constraint violation.
    pub fn insert(&self, table: &str, record: Record) -> StoreResult<()> {
        let schema = self.schema(table)?;
        let mut tables = self.tables.write();
        Self::insert_locked(&mut tables, schema, record, false)
    }

    /// Returns every row of `table` in primary-key order.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of rows in `table`.
    pub fn count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, |t| t.rows.len())
    }

    /// Copies every table's rows.
    pub fn dump(&self) -> StoreDump {
        let tables = self.tables.read();
        self.schemas
            .iter()
            .map(|s| {
                let rows = tables
                    .get(s.name)
                    .map(|t| t.rows.values().cloned().collect())
                    .unwrap_or_default();
                (s.name.to_string(), rows)
            })
            .collect()
    }

    /// Inserts the rows of a dump, parents before children.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown tables or constraint violations.
    pub fn load(&self, mut dump: StoreDump) -> StoreResult<()> {
        if let Some(unknown) = dump.keys().find(|name| self.schema(name).is_err()) {
            return Err(StoreError::UnknownTable(unknown.clone()));
        }

        let mut tables = self.tables.write();
        for schema in &self.schemas {
            for record in dump.remove(schema.name).unwrap_or_default() {
                Self::insert_locked(&mut tables, schema, record, false)?;
            }
        }
        Ok(())
    }

    fn schema(&self, table: &str) -> StoreResult<&TableSchema> {
        self.schemas
            .iter()
            .find(|s| s.name == table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn check_available(&self) -> StoreResult<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store switched off".into()));
        }
        let injected = self
            .injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        Ok(())
    }

    fn check_column(schema: &TableSchema, column: &str) -> StoreResult<()> {
        if schema.column_schema(column).is_some() {
            Ok(())
        } else {
            Err(StoreError::UnknownColumn {
                table: schema.name.to_string(),
                column: column.to_string(),
            })
        }
    }

    fn check_scope(&self, schema: &TableSchema, scope: &Scope) -> StoreResult<()> {
        match scope.filter {
            ScopeFilter::Column(column) => Self::check_column(schema, column),
            ScopeFilter::Parent {
                column,
                table,
                scope_column,
            } => {
                Self::check_column(schema, column)?;
                Self::check_column(self.schema(table)?, scope_column)
            }
        }
    }

    fn table_mut<'t>(tables: &'t mut Tables, name: &str) -> StoreResult<&'t mut Table> {
        tables
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }

    fn key_of(schema: &TableSchema, record: &Record) -> Key {
        schema.primary_key.iter().map(|c| record.value(c)).collect()
    }

    fn in_scope(tables: &Tables, record: &Record, scope: &Scope) -> bool {
        match scope.filter {
            ScopeFilter::Column(column) => record.get(column) == Some(&scope.value),
            ScopeFilter::Parent {
                column,
                table,
                scope_column,
            } => {
                let Some(parent_key) = record.get(column) else {
                    return false;
                };
                tables
                    .get(table)
                    .and_then(|t| t.rows.get(slice::from_ref(parent_key)))
                    .is_some_and(|parent| parent.get(scope_column) == Some(&scope.value))
            }
        }
    }

    /// Fills identities, checks nullability and types, and returns the row
    /// with every column present.
    fn normalize(schema: &TableSchema, table: &mut Table, mut record: Record) -> StoreResult<Record> {
        if let Some((column, _)) = record.iter().find(|(c, _)| schema.column_schema(c).is_none()) {
            return Err(StoreError::UnknownColumn {
                table: schema.name.to_string(),
                column: column.to_string(),
            });
        }

        match schema.identity {
            Some(Identity::Sequence(column)) if record.value(column).is_null() => {
                record.set(column, table.next_id);
                table.next_id += 1;
            }
            Some(Identity::Uuid(column)) if record.value(column).is_null() => {
                record.set(column, Uuid::new_v4().to_string());
            }
            _ => {}
        }

        let mut full = Record::new();
        for column in &schema.columns {
            let value = record.value(column.name);
            if value.is_null() && !column.nullable {
                return Err(StoreError::violation(
                    schema.name,
                    "not null",
                    format!("{} is null", column.name),
                ));
            }
            if !column.ty.accepts(&value) {
                return Err(StoreError::TypeMismatch {
                    table: schema.name.to_string(),
                    column: column.name.to_string(),
                    value,
                });
            }
            full.set(column.name, value);
        }
        Ok(full)
    }

    fn check_references(tables: &Tables, schema: &TableSchema, record: &Record) -> StoreResult<()> {
        for fk in &schema.foreign_keys {
            let value = record.value(fk.column);
            if value.is_null() {
                continue;
            }
            let present = tables
                .get(fk.references)
                .is_some_and(|t| t.rows.contains_key(slice::from_ref(&value)));
            if !present {
                return Err(StoreError::violation(
                    schema.name,
                    "foreign key",
                    format!("{} = {} has no row in {}", fk.column, value, fk.references),
                ));
            }
        }
        Ok(())
    }

    fn insert_locked(tables: &mut Tables, schema: &TableSchema, record: Record, replace: bool) -> StoreResult<()> {
        let record = Self::normalize(schema, Self::table_mut(tables, schema.name)?, record)?;
        Self::check_references(tables, schema, &record)?;

        let table = Self::table_mut(tables, schema.name)?;
        let key = Self::key_of(schema, &record);
        if !replace && table.rows.contains_key(&key) {
            return Err(StoreError::violation(schema.name, "primary key", format!("{key:?} exists")));
        }
        for column in &schema.unique {
            let value = record.value(column);
            if value.is_null() {
                continue;
            }
            let clash = table
                .rows
                .iter()
                .any(|(k, r)| *k != key && r.get(column) == Some(&value));
            if clash {
                return Err(StoreError::violation(schema.name, "unique", format!("{column} = {value}")));
            }
        }

        if let Some(Identity::Sequence(column)) = schema.identity {
            if let Some(id) = record.value(column).as_integer() {
                table.next_id = table.next_id.max(id + 1);
            }
        }
        table.rows.insert(key, record);
        Ok(())
    }

    /// Collects the rows a delete would remove, following cascades and
    /// failing on restricting references.
    fn plan_delete(
        &self,
        tables: &Tables,
        table: &'static str,
        keys: Vec<Key>,
        plan: &mut Vec<(&'static str, Vec<Key>)>,
    ) -> StoreResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let parents: HashSet<&Value> = keys.iter().filter_map(|k| k.first()).collect();

        for child in &self.schemas {
            for fk in child.foreign_keys.iter().filter(|fk| fk.references == table) {
                let Some(rows) = tables.get(child.name) else {
                    continue;
                };
                let referencing: Vec<Key> = rows
                    .rows
                    .iter()
                    .filter(|(_, r)| r.get(fk.column).is_some_and(|v| parents.contains(v)))
                    .map(|(k, _)| k.clone())
                    .collect();
                if referencing.is_empty() {
                    continue;
                }
                match fk.on_delete {
                    OnDelete::Restrict => {
                        return Err(StoreError::violation(
                            child.name,
                            "foreign key",
                            format!("{} rows still reference {}", referencing.len(), table),
                        ));
                    }
                    OnDelete::Cascade => self.plan_delete(tables, child.name, referencing, plan)?,
                }
            }
        }

        plan.push((table, keys));
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("tables", &self.schemas.iter().map(|s| s.name).collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Batched cursor over one table.
struct Cursor<'a> {
    store: &'a InMemoryStore,
    table: &'static str,
    columns: Vec<String>,
    scope: Scope,
    after: Option<Key>,
    batch: VecDeque<Record>,
    exhausted: bool,
}

impl Cursor<'_> {
    fn fill(&mut self) -> StoreResult<()> {
        let store = self.store;
        store.check_available()?;

        let tables = store.tables.read();
        let table = tables
            .get(self.table)
            .ok_or_else(|| StoreError::UnknownTable(self.table.to_string()))?;
        let lower = match self.after.take() {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };

        let mut last = None;
        for (key, record) in table.rows.range((lower.clone(), Bound::Unbounded)) {
            if !InMemoryStore::in_scope(&tables, record, &self.scope) {
                continue;
            }
            self.batch.push_back(record.project(&self.columns));
            last = Some(key.clone());
            if self.batch.len() >= store.config.fetch_size {
                break;
            }
        }

        if self.batch.len() < store.config.fetch_size {
            self.exhausted = true;
        }
        self.after = last.or(match lower {
            Bound::Excluded(key) => Some(key),
            _ => None,
        });
        trace!(table = self.table, rows = self.batch.len(), "fetched batch");
        Ok(())
    }
}

impl Iterator for Cursor<'_> {
    type Item = StoreResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.batch.is_empty() && !self.exhausted {
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.batch.pop_front().map(Ok)
    }
}

impl RelationalStore for InMemoryStore {
    fn query<'a>(&'a self, table: &str, columns: &[&str], scope: &Scope) -> StoreResult<RowStream<'a>> {
        self.check_available()?;
        let schema = self.schema(table)?;
        for column in columns {
            Self::check_column(schema, column)?;
        }
        self.check_scope(schema, scope)?;

        Ok(Box::new(Cursor {
            store: self,
            table: schema.name,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            scope: scope.clone(),
            after: None,
            batch: VecDeque::new(),
            exhausted: false,
        }))
    }

    fn delete(&self, table: &str, scope: &Scope) -> StoreResult<u64> {
        self.check_available()?;
        let schema = self.schema(table)?;
        self.check_scope(schema, scope)?;

        let mut tables = self.tables.write();
        let doomed: Vec<Key> = tables
            .get(schema.name)
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|(_, r)| Self::in_scope(&tables, r, scope))
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default();
        let count = doomed.len() as u64;

        let mut plan = Vec::new();
        self.plan_delete(&tables, schema.name, doomed, &mut plan)?;
        for (name, keys) in plan {
            let target = Self::table_mut(&mut tables, name)?;
            for key in keys {
                target.rows.remove(&key);
            }
        }

        debug!(table, count, "deleted scoped rows");
        Ok(count)
    }

    fn bulk_load(&self, table: &str, columns: &[&str], input: &mut dyn BufRead) -> StoreResult<u64> {
        self.check_available()?;
        let schema = self.schema(table)?;
        let types = columns
            .iter()
            .map(|c| {
                schema.column_schema(c).map(|s| s.ty).ok_or_else(|| StoreError::UnknownColumn {
                    table: table.to_string(),
                    column: c.to_string(),
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        // Decode without holding the lock: the producer may call back into
        // the store while the input is read.
        let mut staged = Vec::new();
        for row in BulkTextDecoder::new(input, types) {
            let record: Record = columns.iter().map(|c| c.to_string()).zip(row?).collect();
            staged.push(record);
        }

        let mut tables = self.tables.write();
        let backup = Self::table_mut(&mut tables, schema.name)?.clone();
        let count = staged.len() as u64;
        for record in staged {
            if let Err(e) = Self::insert_locked(&mut tables, schema, record, false) {
                tables.insert(schema.name, backup);
                return Err(e);
            }
        }

        debug!(table, count, "bulk loaded rows");
        Ok(count)
    }

    fn upsert(&self, table: &str, record: &Record) -> StoreResult<()> {
        self.check_available()?;
        let schema = self.schema(table)?;
        let mut tables = self.tables.write();
        Self::insert_locked(&mut tables, schema, record.clone(), true)
    }

    fn find(&self, table: &str, column: &str, value: &Value) -> StoreResult<Option<Record>> {
        self.check_available()?;
        let schema = self.schema(table)?;
        Self::check_column(schema, column)?;
        let tables = self.tables.read();
        Ok(tables
            .get(schema.name)
            .and_then(|t| t.rows.values().find(|r| r.get(column) == Some(value)))
            .cloned())
    }

    fn exists(&self, table: &str, key: &Value) -> StoreResult<bool> {
        self.check_available()?;
        let schema = self.schema(table)?;
        let tables = self.tables.read();
        Ok(tables
            .get(schema.name)
            .is_some_and(|t| t.rows.contains_key(slice::from_ref(key))))
    }

    fn next_id(&self, table: &str) -> StoreResult<Value> {
        self.check_available()?;
        let schema = self.schema(table)?;
        match schema.identity {
            Some(Identity::Sequence(_)) => {
                let mut tables = self.tables.write();
                let target = Self::table_mut(&mut tables, schema.name)?;
                let id = target.next_id;
                target.next_id += 1;
                Ok(Value::Integer(id))
            }
            Some(Identity::Uuid(_)) => Ok(Value::Text(Uuid::new_v4().to_string())),
            None => Err(StoreError::violation(table, "identity", "table has no identity column")),
        }
    }
}
