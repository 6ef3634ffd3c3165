//! The fixed source query over `parcend`.

use addrgeo_core::SourceRecord;
use futures::stream::{BoxStream, StreamExt};
use sqlx::PgConnection;

/// Rows with a `NULL` address are dropped here; blank addresses are not and
/// must be filtered by the caller.
pub const SOURCE_SQL: &str = "SELECT codparc, nomeparc, endereco \
     FROM parcend \
     WHERE endereco IS NOT NULL \
     ORDER BY codparc";

/// A row from the `parcend` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceRow {
    pub codparc: i64,
    pub nomeparc: Option<String>,
    pub endereco: Option<String>,
}

impl From<SourceRow> for SourceRecord {
    fn from(row: SourceRow) -> Self {
        Self {
            id: row.codparc,
            name: row.nomeparc,
            address: row.endereco,
        }
    }
}

/// Streams source records over `conn` in query order.
///
/// The stream borrows the connection for its whole lifetime; writes must go
/// through a different connection.
pub fn stream_source_records(
    conn: &mut PgConnection,
) -> BoxStream<'_, Result<SourceRecord, sqlx::Error>> {
    sqlx::query_as::<_, SourceRow>(SOURCE_SQL)
        .fetch(conn)
        .map(|row| row.map(SourceRecord::from))
        .boxed()
}
