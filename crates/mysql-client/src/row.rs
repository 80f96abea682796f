//! Row representation for query results.
//!
//! A [`Row`] keeps the row payload exactly as received and decodes a column
//! only when it is asked for. Decoding never changes the stored bytes, so
//! reading the same column twice yields equal results.

use std::cell::Cell;
use std::sync::Arc;

use mysql_protocol::{ColumnDefinition, ColumnFlags, ColumnType, RawRow};
use mysql_types::{FromSql, SqlValue, TypeError, decode_text};

/// Column metadata describing a result set column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    index: usize,
    definition: ColumnDefinition,
}

impl Column {
    /// Create a column at `index` from its wire definition.
    pub fn new(index: usize, definition: ColumnDefinition) -> Self {
        Self { index, definition }
    }

    /// Column index (0-based).
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Column name (or alias).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Wire column type.
    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        self.definition.column_type
    }

    /// SQL type name (e.g., "INT", "VARCHAR").
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.definition.column_type.name()
    }

    /// Whether the column allows NULL values.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        !self.definition.flags.contains(ColumnFlags::NOT_NULL)
    }

    /// Whether an integer column is unsigned.
    #[must_use]
    pub fn is_unsigned(&self) -> bool {
        self.definition.is_unsigned()
    }

    /// The full column definition.
    #[must_use]
    pub fn definition(&self) -> &ColumnDefinition {
        &self.definition
    }
}

/// A row from a query result.
///
/// Values are decoded on demand through [`FromSql`]. Every decode attempt
/// records whether the slot was NULL; [`Row::was_null`] reports the most
/// recent one.
#[derive(Clone)]
pub struct Row {
    raw: RawRow,
    columns: Arc<[Column]>,
    was_null: Cell<bool>,
}

impl Row {
    /// Create a row from a parsed payload and its result set columns.
    pub fn new(raw: RawRow, columns: Arc<[Column]>) -> Self {
        Self {
            raw,
            columns,
            was_null: Cell::new(false),
        }
    }

    fn column(&self, index: usize) -> Result<&Column, TypeError> {
        self.columns.get(index).ok_or(TypeError::ColumnIndex {
            index,
            count: self.columns.len(),
        })
    }

    fn index_of(&self, name: &str) -> Result<usize, TypeError> {
        self.columns
            .iter()
            .position(|c| c.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| TypeError::UnknownColumn(name.to_string()))
    }

    /// Get a value by column index.
    ///
    /// Use `Option<T>` to accept NULL; a non-optional target reports
    /// [`TypeError::UnexpectedNull`].
    pub fn get<T: FromSql>(&self, index: usize) -> Result<T, TypeError> {
        let value = self.get_raw(index)?;
        T::from_sql(&value)
    }

    /// Get a value by column name (case-insensitive).
    pub fn get_by_name<T: FromSql>(&self, name: &str) -> Result<T, TypeError> {
        let index = self
            .index_of(name)
            .inspect_err(|_| self.was_null.set(false))?;
        self.get(index)
    }

    /// Decode a column into a [`SqlValue`].
    pub fn get_raw(&self, index: usize) -> Result<SqlValue, TypeError> {
        // an out-of-range read is not a NULL read
        self.was_null.set(false);
        let column = self.column(index)?;
        let bytes = self.raw.value(index);
        self.was_null.set(bytes.is_none());
        decode_text(bytes, &column.definition)
    }

    /// Raw bytes of a column, without decoding. `None` for NULL.
    pub fn get_bytes(&self, index: usize) -> Result<Option<&[u8]>, TypeError> {
        self.column(index)?;
        let bytes = self.raw.value(index);
        self.was_null.set(bytes.is_none());
        Ok(bytes)
    }

    /// Whether the most recent read from this row hit a NULL slot.
    #[must_use]
    pub fn was_null(&self) -> bool {
        self.was_null.get()
    }

    /// Whether a column is NULL. Does not count as a read.
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        self.raw.slots.get(index).is_some_and(|slot| slot.is_null)
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column metadata.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Row")
            .field("columns", &self.columns.len())
            .field("payload_len", &self.raw.payload.len())
            .finish_non_exhaustive()
    }
}
