//! Database schema management.

use rusqlite::Connection;

/// Create the history table if missing
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS elements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tagName TEXT NOT NULL,
    elementId TEXT NOT NULL DEFAULT '',
    className TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL DEFAULT '',
    xpath TEXT NOT NULL DEFAULT '',
    cssSelector TEXT NOT NULL DEFAULT '',
    attributes TEXT NOT NULL DEFAULT '{}',
    elementText TEXT NOT NULL DEFAULT '',
    timestamp TEXT NOT NULL,
    fullData TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_elements_timestamp ON elements(timestamp);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM elements", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 0);
    }
}
