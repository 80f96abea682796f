//! Row sources over query results.
//!
//! [`BufferedRows`] holds a fully drained result set and supports
//! bidirectional and random-access cursor movement. [`StreamedRows`] reads
//! rows from the connection one at a time and only moves forward.
//!
//! Both report movement past either end as [`Error::OutOfRange`]; the
//! cursor is left where it was.

use std::sync::Arc;

use async_trait::async_trait;
use mysql_protocol::{OkPacket, StatusFlags};

use crate::error::{Error, Result};
use crate::row::{Column, Row};
use crate::session::Session;

/// Cursor over the rows of one result set.
#[async_trait]
pub trait RowSource: Send {
    /// Advance to the next row and return it.
    async fn next(&mut self) -> Result<&Row>;

    /// Whether a call to [`next`](RowSource::next) would return a row.
    async fn has_next(&mut self) -> Result<bool>;

    /// Step back to the previous row and return it.
    fn previous(&mut self) -> Result<&Row>;

    /// Move to the row at absolute index `n` (0-based) and return it.
    fn get(&mut self, n: usize) -> Result<&Row>;

    /// Index of the row under the cursor, or `None` when the cursor is not
    /// on a row.
    fn position(&self) -> Option<usize>;

    /// Total number of rows.
    fn size(&self) -> Result<usize>;

    /// Column metadata for the result set.
    fn columns(&self) -> &[Column];
}

/// A fully buffered result set.
///
/// The cursor starts before the first row.
#[derive(Debug, Clone)]
pub struct BufferedRows {
    columns: Arc<[Column]>,
    rows: Vec<Row>,
    /// 0 is before the first row, `i + 1` is on row `i`, `len + 1` is after
    /// the last row.
    cursor: usize,
}

impl BufferedRows {
    /// Create a source over already materialized rows.
    pub fn new(columns: Arc<[Column]>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            cursor: 0,
        }
    }

    fn out_of_range(&self, operation: &'static str, position: Option<usize>) -> Error {
        Error::OutOfRange {
            operation,
            position,
            size: Some(self.rows.len()),
        }
    }

    fn move_to(&mut self, index: usize) -> &Row {
        self.cursor = index + 1;
        &self.rows[index]
    }

    /// Move to the first row.
    pub fn first(&mut self) -> Result<&Row> {
        if self.rows.is_empty() {
            return Err(self.out_of_range("first", None));
        }
        Ok(self.move_to(0))
    }

    /// Move to the last row.
    pub fn last(&mut self) -> Result<&Row> {
        match self.rows.len().checked_sub(1) {
            Some(index) => Ok(self.move_to(index)),
            None => Err(self.out_of_range("last", None)),
        }
    }

    /// Move the cursor before the first row.
    pub fn before_first(&mut self) {
        self.cursor = 0;
    }

    /// Move the cursor after the last row.
    pub fn after_last(&mut self) {
        self.cursor = self.rows.len() + 1;
    }

    /// Whether the result set has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// All rows, independent of the cursor.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consume the source and return its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

#[async_trait]
impl RowSource for BufferedRows {
    async fn next(&mut self) -> Result<&Row> {
        if self.cursor < self.rows.len() {
            Ok(self.move_to(self.cursor))
        } else {
            Err(self.out_of_range("next", self.position()))
        }
    }

    async fn has_next(&mut self) -> Result<bool> {
        Ok(self.cursor < self.rows.len())
    }

    fn previous(&mut self) -> Result<&Row> {
        // cursor - 2 is the row before the current one
        match self.cursor.checked_sub(2) {
            Some(index) => Ok(self.move_to(index)),
            None => Err(self.out_of_range("previous", self.position())),
        }
    }

    fn get(&mut self, n: usize) -> Result<&Row> {
        if n < self.rows.len() {
            Ok(self.move_to(n))
        } else {
            Err(self.out_of_range("get", Some(n)))
        }
    }

    fn position(&self) -> Option<usize> {
        self.cursor
            .checked_sub(1)
            .filter(|&index| index < self.rows.len())
    }

    fn size(&self) -> Result<usize> {
        Ok(self.rows.len())
    }

    fn columns(&self) -> &[Column] {
        &self.columns
    }
}

/// A forward-only result set read from the connection as it is consumed.
///
/// The session stays borrowed until the source is dropped. Rows left unread
/// are discarded by the session before its next command.
pub struct StreamedRows<'a> {
    session: &'a mut Session,
    columns: Arc<[Column]>,
    current: Option<Row>,
    lookahead: Option<Row>,
    position: Option<usize>,
    finished: bool,
}

impl<'a> StreamedRows<'a> {
    pub(crate) fn new(session: &'a mut Session, columns: Arc<[Column]>) -> Self {
        Self {
            session,
            columns,
            current: None,
            lookahead: None,
            position: None,
            finished: false,
        }
    }

    /// A source for a command that produced no result set.
    pub(crate) fn empty(session: &'a mut Session) -> Self {
        let mut rows = Self::new(session, Arc::from(Vec::new()));
        rows.finished = true;
        rows
    }

    /// Whether every row has been read from the connection.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished && self.lookahead.is_none()
    }

    async fn fetch(&mut self) -> Result<Option<Row>> {
        if self.finished {
            return Ok(None);
        }
        let row = self.session.read_row(&self.columns).await?;
        if row.is_none() {
            self.finished = true;
        }
        Ok(row)
    }

    /// Drain the remaining rows into a [`BufferedRows`].
    ///
    /// Rows already passed by the cursor are not included.
    pub async fn buffer(mut self) -> Result<BufferedRows> {
        let mut rows = Vec::new();
        if let Some(row) = self.lookahead.take() {
            rows.push(row);
        }
        while let Some(row) = self.fetch().await? {
            rows.push(row);
        }
        Ok(BufferedRows::new(Arc::clone(&self.columns), rows))
    }
}

#[async_trait]
impl RowSource for StreamedRows<'_> {
    async fn next(&mut self) -> Result<&Row> {
        let row = match self.lookahead.take() {
            Some(row) => Some(row),
            None => self.fetch().await?,
        };
        match row {
            Some(row) => {
                self.position = Some(self.position.map_or(0, |p| p + 1));
                Ok(self.current.insert(row))
            }
            None => Err(Error::OutOfRange {
                operation: "next",
                position: self.position,
                size: None,
            }),
        }
    }

    async fn has_next(&mut self) -> Result<bool> {
        if self.lookahead.is_none() {
            self.lookahead = self.fetch().await?;
        }
        Ok(self.lookahead.is_some())
    }

    fn previous(&mut self) -> Result<&Row> {
        Err(Error::NotSupported("previous"))
    }

    fn get(&mut self, _n: usize) -> Result<&Row> {
        Err(Error::NotSupported("get"))
    }

    fn position(&self) -> Option<usize> {
        self.current.as_ref().and(self.position)
    }

    fn size(&self) -> Result<usize> {
        Err(Error::NotSupported("size"))
    }

    fn columns(&self) -> &[Column] {
        &self.columns
    }
}

impl std::fmt::Debug for StreamedRows<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamedRows")
            .field("columns", &self.columns.len())
            .field("position", &self.position)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// Outcome of a command that returns no rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteResult {
    /// Number of rows affected.
    pub affected_rows: u64,
    /// `AUTO_INCREMENT` value generated by the command, if any.
    pub last_insert_id: u64,
    /// Number of warnings raised.
    pub warnings: u16,
    /// Server status after the command.
    pub status: StatusFlags,
}

impl From<OkPacket> for ExecuteResult {
    fn from(ok: OkPacket) -> Self {
        Self {
            affected_rows: ok.affected_rows,
            last_insert_id: ok.last_insert_id,
            warnings: ok.warnings,
            status: ok.status,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mysql_protocol::{ColumnDefinition, ColumnType, RawRow};

    fn buffered(n: usize) -> BufferedRows {
        let columns: Arc<[Column]> =
            vec![Column::new(0, ColumnDefinition::new("n", ColumnType::Long))].into();
        let rows = (0..n)
            .map(|i| {
                let text = i.to_string();
                let payload = RawRow::encode([Some(text.as_bytes())]);
                Row::new(RawRow::decode(payload, 1).unwrap(), Arc::clone(&columns))
            })
            .collect();
        BufferedRows::new(columns, rows)
    }

    fn value(row: &Row) -> i64 {
        row.get(0).unwrap()
    }

    #[tokio::test]
    async fn test_next_until_exhausted() {
        let mut rows = buffered(3);
        assert_eq!(rows.position(), None);
        for expected in 0..3 {
            assert!(rows.has_next().await.unwrap());
            assert_eq!(value(rows.next().await.unwrap()), expected);
        }
        assert!(!rows.has_next().await.unwrap());
        assert!(matches!(
            rows.next().await,
            Err(Error::OutOfRange {
                operation: "next",
                position: Some(2),
                size: Some(3)
            })
        ));
        assert_eq!(rows.position(), Some(2));
    }

    #[test]
    fn test_get_bounds() {
        let mut rows = buffered(4);
        for n in 0..4 {
            assert_eq!(value(rows.get(n).unwrap()), n as i64);
            assert_eq!(rows.position(), Some(n));
        }
        assert!(matches!(rows.get(4), Err(Error::OutOfRange { .. })));
        assert_eq!(rows.position(), Some(3));
        assert_eq!(rows.size().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_previous_and_absolute_moves() {
        let mut rows = buffered(3);
        assert!(matches!(rows.previous(), Err(Error::OutOfRange { .. })));

        assert_eq!(value(rows.last().unwrap()), 2);
        assert_eq!(value(rows.previous().unwrap()), 1);
        assert_eq!(value(rows.previous().unwrap()), 0);
        assert!(matches!(rows.previous(), Err(Error::OutOfRange { .. })));
        assert_eq!(rows.position(), Some(0));

        rows.after_last();
        assert_eq!(rows.position(), None);
        assert_eq!(value(rows.previous().unwrap()), 2);

        rows.before_first();
        assert_eq!(value(rows.next().await.unwrap()), 0);
        assert_eq!(value(rows.first().unwrap()), 0);
    }

    #[tokio::test]
    async fn test_empty_source() {
        let mut rows = buffered(0);
        assert!(rows.is_empty());
        assert!(!rows.has_next().await.unwrap());
        assert!(rows.next().await.is_err());
        assert!(rows.first().is_err());
        assert!(rows.last().is_err());
        assert!(rows.get(0).is_err());
    }

    #[test]
    fn test_execute_result_from_ok() {
        let ok = OkPacket {
            affected_rows: 2,
            last_insert_id: 17,
            warnings: 1,
            ..OkPacket::default()
        };
        let result = ExecuteResult::from(ok);
        assert_eq!(result.affected_rows, 2);
        assert_eq!(result.last_insert_id, 17);
        assert_eq!(result.warnings, 1);
    }
}
