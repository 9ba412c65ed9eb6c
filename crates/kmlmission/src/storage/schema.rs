//! `SQLite` schema definitions for kmlmission.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the missions table.
///
/// `polygon` holds the vertex list as a JSON array. `source_hash` is the
/// blake3 digest of the uploaded document, kept for provenance only.
pub const CREATE_MISSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS missions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    polygon TEXT NOT NULL,
    vertex_count INTEGER NOT NULL CHECK (vertex_count > 0),
    source_hash TEXT,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `created_at` for listing.
pub const CREATE_CREATED_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_missions_created_at ON missions(created_at DESC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_MISSIONS_TABLE,
    CREATE_CREATED_AT_INDEX,
    CREATE_METADATA_TABLE,
];
