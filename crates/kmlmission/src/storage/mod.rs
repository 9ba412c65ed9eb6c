//! Storage layer for kmlmission.
//!
//! [`MissionStore`] is the seam between the ingestion workflow and whatever
//! persists missions. [`SqliteMissionStore`] is the shipped implementation.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::mission::{Mission, NewMission, Polygon};

/// Persistence for missions.
///
/// The store alone assigns identifiers, so implementations must be safe to
/// share between concurrent uploads.
pub trait MissionStore: Send + Sync {
    /// Persist a new mission and return it with its assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn create(&self, mission: NewMission) -> Result<Mission>;

    /// Look up a mission by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails. A missing mission is `Ok(None)`.
    fn find_by_id(&self, id: i64) -> Result<Option<Mission>>;

    /// List the most recently created missions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn list(&self, limit: usize) -> Result<Vec<MissionSummary>>;

    /// Count stored missions.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn count(&self) -> Result<i64>;
}

impl<T: MissionStore + ?Sized> MissionStore for Arc<T> {
    fn create(&self, mission: NewMission) -> Result<Mission> {
        (**self).create(mission)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Mission>> {
        (**self).find_by_id(id)
    }

    fn list(&self, limit: usize) -> Result<Vec<MissionSummary>> {
        (**self).list(limit)
    }

    fn count(&self) -> Result<i64> {
        (**self).count()
    }
}

/// Listing entry for a mission (no polygon).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissionSummary {
    /// Mission identifier.
    pub id: i64,
    /// Mission name.
    pub name: String,
    /// Number of boundary vertices.
    pub vertex_count: usize,
    /// When the mission was created.
    pub created_at: DateTime<Utc>,
}

/// `SQLite`-backed mission store.
#[derive(Debug)]
pub struct SqliteMissionStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl SqliteMissionStore {
    /// Open or create a mission database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL lets readers proceed while an upload is being written
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("mission store connection lock poisoned"))
    }

    /// Read the raw mission columns from a row.
    fn read_row(row: &rusqlite::Row) -> rusqlite::Result<StoredRow> {
        Ok(StoredRow {
            id: row.get(0)?,
            name: row.get(1)?,
            polygon: row.get(2)?,
            source_hash: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

/// Raw column values, decoded outside the rusqlite callback so that
/// corruption surfaces as [`Error::CorruptRecord`].
struct StoredRow {
    id: i64,
    name: String,
    polygon: String,
    source_hash: Option<String>,
    created_at: String,
}

impl StoredRow {
    fn into_mission(self) -> Result<Mission> {
        let polygon: Polygon =
            serde_json::from_str(&self.polygon).map_err(|e| Error::CorruptRecord {
                id: self.id,
                message: format!("invalid polygon: {e}"),
            })?;
        let created_at = parse_timestamp(self.id, &self.created_at)?;

        Ok(Mission {
            id: self.id,
            name: self.name,
            polygon,
            source_hash: self.source_hash,
            created_at,
        })
    }
}

fn parse_timestamp(id: i64, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::CorruptRecord {
            id,
            message: format!("invalid created_at '{value}': {e}"),
        })
}

impl MissionStore for SqliteMissionStore {
    fn create(&self, mission: NewMission) -> Result<Mission> {
        let polygon_json = serde_json::to_string(&mission.polygon)?;
        let vertex_count = i64::try_from(mission.polygon.len())
            .map_err(|_| Error::internal("vertex count overflows i64"))?;
        let created_at = Utc::now();

        let id = {
            let conn = self.conn()?;
            conn.execute(
                r"
                INSERT INTO missions (name, polygon, vertex_count, source_hash, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
                params![
                    mission.name,
                    polygon_json,
                    vertex_count,
                    mission.source_hash,
                    created_at.to_rfc3339(),
                ],
            )?;
            conn.last_insert_rowid()
        };

        info!(
            "Created mission {} '{}' with {} vertices",
            id,
            mission.name,
            mission.polygon.len()
        );
        Ok(Mission {
            id,
            name: mission.name,
            polygon: mission.polygon,
            source_hash: mission.source_hash,
            created_at,
        })
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Mission>> {
        let row = self
            .conn()?
            .query_row(
                r"
                SELECT id, name, polygon, source_hash, created_at
                FROM missions WHERE id = ?1
                ",
                [id],
                Self::read_row,
            )
            .optional()?;
        row.map(StoredRow::into_mission).transpose()
    }

    fn list(&self, limit: usize) -> Result<Vec<MissionSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, name, vertex_count, created_at
            FROM missions ORDER BY id DESC LIMIT ?1
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map([limit_i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, vertex_count, created_at)| {
                Ok(MissionSummary {
                    id,
                    name,
                    vertex_count: usize::try_from(vertex_count).map_err(|_| {
                        Error::CorruptRecord {
                            id,
                            message: format!("negative vertex count {vertex_count}"),
                        }
                    })?,
                    created_at: parse_timestamp(id, &created_at)?,
                })
            })
            .collect()
    }

    fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM missions", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::Vertex;

    fn create_test_store() -> SqliteMissionStore {
        SqliteMissionStore::open_in_memory().expect("failed to create test store")
    }

    fn create_test_polygon(n: usize) -> Polygon {
        let vertices = (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let step = i as f64 * 0.001;
                Vertex::new(28.98544 + step, 77.09027 - step, 150.5)
            })
            .collect();
        Polygon::new(vertices).unwrap()
    }

    #[test]
    fn test_open_in_memory() {
        let store = SqliteMissionStore::open_in_memory();
        assert!(store.is_ok());
        assert_eq!(store.unwrap().path(), Path::new(":memory:"));
    }

    #[test]
    fn test_create_assigns_ids() {
        let store = create_test_store();
        let a = store
            .create(NewMission::new("A", create_test_polygon(3)))
            .unwrap();
        let b = store
            .create(NewMission::new("B", create_test_polygon(3)))
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_create_and_find_round_trip() {
        let store = create_test_store();
        let polygon = create_test_polygon(5);
        let created = store
            .create(NewMission::new("Survey", polygon.clone()).with_source(b"<kml/>"))
            .unwrap();

        let found = store.find_by_id(created.id).unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.name, "Survey");
        assert_eq!(found.polygon, polygon);
        assert_eq!(found.source_hash, created.source_hash);
        assert_eq!(found.created_at, created.created_at);
    }

    #[test]
    fn test_identical_uploads_are_not_deduplicated() {
        let store = create_test_store();
        let mission = NewMission::new("Same", create_test_polygon(2)).with_source(b"same");
        let a = store.create(mission.clone()).unwrap();
        let b = store.create(mission).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_find_nonexistent() {
        let store = create_test_store();
        assert!(store.find_by_id(99999).unwrap().is_none());
    }

    #[test]
    fn test_find_corrupt_polygon() {
        let store = create_test_store();
        let created = store
            .create(NewMission::new("X", create_test_polygon(1)))
            .unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "UPDATE missions SET polygon = '[]' WHERE id = ?1",
                [created.id],
            )
            .unwrap();

        let err = store.find_by_id(created.id).unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { .. }));
    }

    #[test]
    fn test_empty_polygon_rejected_by_schema() {
        let store = create_test_store();
        let result = store.conn().unwrap().execute(
            "INSERT INTO missions (name, polygon, vertex_count, created_at) VALUES ('x', '[]', 0, '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_list_newest_first() {
        let store = create_test_store();
        for i in 0..5 {
            store
                .create(NewMission::new(format!("M{i}"), create_test_polygon(i + 1)))
                .unwrap();
        }

        let listed = store.list(3).unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].name, "M4");
        assert_eq!(listed[0].vertex_count, 5);
        assert_eq!(listed[2].name, "M2");
    }

    #[test]
    fn test_count_empty() {
        let store = create_test_store();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_open_on_disk_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("missions.db");

        let id = {
            let store = SqliteMissionStore::open(&path).unwrap();
            store
                .create(NewMission::new("Disk", create_test_polygon(4)))
                .unwrap()
                .id
        };

        let reopened = SqliteMissionStore::open(&path).unwrap();
        let mission = reopened.find_by_id(id).unwrap().unwrap();
        assert_eq!(mission.polygon.len(), 4);
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn test_store_is_shareable_across_threads() {
        let store = std::sync::Arc::new(create_test_store());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .create(NewMission::new(format!("T{i}"), create_test_polygon(2)))
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}
