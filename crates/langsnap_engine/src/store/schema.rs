//! Table definitions for the in-memory store.

use langsnap_codec::FieldType;

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    /// Column name.
    pub name: &'static str,
    /// Value type.
    pub ty: FieldType,
    /// Whether null is allowed.
    pub nullable: bool,
}

/// How a table allocates fresh identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// Integer sequence on the named column.
    Sequence(&'static str),
    /// Random UUID text on the named column.
    Uuid(&'static str),
}

impl Identity {
    /// Returns the identity column.
    pub fn column(self) -> &'static str {
        match self {
            Identity::Sequence(c) | Identity::Uuid(c) => c,
        }
    }
}

/// What happens to referencing rows when a parent row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// The delete fails while references remain.
    Restrict,
    /// Referencing rows are deleted too.
    Cascade,
}

/// A single-column foreign key to another table's primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referencing column.
    pub column: &'static str,
    /// Referenced table.
    pub references: &'static str,
    /// Delete behaviour.
    pub on_delete: OnDelete,
}

/// A table definition.
///
/// ```rust
/// use langsnap_codec::FieldType;
/// use langsnap_engine::store::{OnDelete, TableSchema};
///
/// let gloss = TableSchema::new("gloss")
///     .column("phrase_id", FieldType::Integer)
///     .nullable("gloss", FieldType::Text)
///     .primary_key(&["phrase_id"])
///     .references("phrase_id", "phrase", OnDelete::Cascade);
/// assert_eq!(gloss.columns.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name.
    pub name: &'static str,
    /// Columns in declaration order.
    pub columns: Vec<ColumnSchema>,
    /// Primary key columns.
    pub primary_key: Vec<&'static str>,
    /// Identity allocation, if any.
    pub identity: Option<Identity>,
    /// Outgoing foreign keys.
    pub foreign_keys: Vec<ForeignKey>,
    /// Single-column unique constraints.
    pub unique: Vec<&'static str>,
}

impl TableSchema {
    /// Starts a table definition.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            columns: Vec::new(),
            primary_key: Vec::new(),
            identity: None,
            foreign_keys: Vec::new(),
            unique: Vec::new(),
        }
    }

    /// Adds a NOT NULL column.
    #[must_use]
    pub fn column(mut self, name: &'static str, ty: FieldType) -> Self {
        self.columns.push(ColumnSchema {
            name,
            ty,
            nullable: false,
        });
        self
    }

    /// Adds a nullable column.
    #[must_use]
    pub fn nullable(mut self, name: &'static str, ty: FieldType) -> Self {
        self.columns.push(ColumnSchema {
            name,
            ty,
            nullable: true,
        });
        self
    }

    /// Sets the primary key.
    #[must_use]
    pub fn primary_key(mut self, columns: &[&'static str]) -> Self {
        self.primary_key = columns.to_vec();
        self
    }

    /// Makes `column` an integer sequence identity.
    #[must_use]
    pub fn sequence(mut self, column: &'static str) -> Self {
        self.identity = Some(Identity::Sequence(column));
        self
    }

    /// Makes `column` a UUID identity.
    #[must_use]
    pub fn uuid(mut self, column: &'static str) -> Self {
        self.identity = Some(Identity::Uuid(column));
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn references(mut self, column: &'static str, table: &'static str, on_delete: OnDelete) -> Self {
        self.foreign_keys.push(ForeignKey {
            column,
            references: table,
            on_delete,
        });
        self
    }

    /// Adds a unique constraint on `column`.
    #[must_use]
    pub fn unique(mut self, column: &'static str) -> Self {
        self.unique.push(column);
        self
    }

    /// Looks up a column by name.
    pub fn column_schema(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }
}
