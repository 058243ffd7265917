//! The relational store boundary.
//!
//! Plugins never talk to a database driver directly. They go through
//! [`RelationalStore`], which exposes exactly the primitives a transfer needs:
//! streaming scoped reads, scoped deletes and bulk loads in the wire format of
//! `langsnap_codec`.

mod memory;
mod schema;

pub use memory::{InMemoryStore, MemoryStoreConfig, StoreDump};
pub use schema::{ColumnSchema, ForeignKey, Identity, OnDelete, TableSchema};

use crate::record::Record;
use langsnap_codec::{CodecError, Value};
use std::io::BufRead;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A lazily evaluated stream of rows.
pub type RowStream<'a> = Box<dyn Iterator<Item = StoreResult<Record>> + Send + 'a>;

/// Errors raised by a [`RelationalStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// The database could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The table is not part of the schema.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// The column is not part of the table.
    #[error("unknown column {table}.{column}")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A primary key, foreign key, uniqueness or nullability rule was broken.
    #[error("{table}: {constraint} violated: {detail}")]
    ConstraintViolation {
        /// Table name.
        table: String,
        /// Kind of constraint.
        constraint: &'static str,
        /// Offending values.
        detail: String,
    },

    /// A value does not match its column type.
    #[error("{table}.{column} does not accept {value}")]
    TypeMismatch {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Rejected value.
        value: Value,
    },

    /// The bulk-load input could not be decoded.
    #[error("bulk load failed: {0}")]
    Codec(#[from] CodecError),
}

impl StoreError {
    /// Returns true if retrying the operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    pub(crate) fn violation(table: &str, constraint: &'static str, detail: impl Into<String>) -> Self {
        StoreError::ConstraintViolation {
            table: table.to_string(),
            constraint,
            detail: detail.into(),
        }
    }
}

/// How a table's rows relate to the transfer scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeFilter {
    /// The table carries the scope key in `column`.
    Column(&'static str),
    /// The table reaches the scope through a parent row: `column` references
    /// the primary key of `table`, whose `scope_column` holds the scope key.
    Parent {
        /// Foreign key column in this table.
        column: &'static str,
        /// Parent table.
        table: &'static str,
        /// Scope column in the parent table.
        scope_column: &'static str,
    },
}

/// A scope filter bound to a concrete scope value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// How rows are matched.
    pub filter: ScopeFilter,
    /// The scope key, usually a language identifier.
    pub value: Value,
}

impl Scope {
    /// Binds `filter` to `value`.
    pub fn new(filter: ScopeFilter, value: Value) -> Self {
        Self { filter, value }
    }
}

/// A relational database as seen by the transfer engine.
///
/// # Invariants
///
/// - `query` yields rows in primary-key order and never buffers the whole
///   result; memory stays bounded by the implementation's fetch size
/// - `bulk_load` reads the end-of-data sentinel before committing a row count;
///   a malformed or truncated payload is an error
/// - Foreign keys are enforced on every insert path
///
/// # Implementors
///
/// - [`InMemoryStore`] - For tests and the command-line tool
pub trait RelationalStore: Send + Sync {
    /// Streams `columns` of every row of `table` inside `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown tables or columns, or if the store is
    /// unreachable. Failures while streaming surface as stream items.
    fn query<'a>(&'a self, table: &str, columns: &[&str], scope: &Scope) -> StoreResult<RowStream<'a>>;

    /// Deletes every row of `table` inside `scope`, returning the count.
    ///
    /// # Errors
    ///
    /// Returns an error if a restricting foreign key still references a row.
    fn delete(&self, table: &str, scope: &Scope) -> StoreResult<u64>;

    /// Loads bulk-text rows for `columns` into `table`, returning the count.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed input or a constraint violation.
    fn bulk_load(&self, table: &str, columns: &[&str], input: &mut dyn BufRead) -> StoreResult<u64>;

    /// Inserts `record`, replacing any row with the same primary key.
    ///
    /// # Errors
    ///
    /// Returns an error on a constraint violation.
    fn upsert(&self, table: &str, record: &Record) -> StoreResult<()>;

    /// Returns the first row of `table` whose `column` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown tables or columns.
    fn find(&self, table: &str, column: &str, value: &Value) -> StoreResult<Option<Record>>;

    /// Returns true if `table` has a row whose single-column primary key is `key`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown tables.
    fn exists(&self, table: &str, key: &Value) -> StoreResult<bool>;

    /// Allocates a fresh identifier for `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table has no identity column.
    fn next_id(&self, table: &str) -> StoreResult<Value>;
}
