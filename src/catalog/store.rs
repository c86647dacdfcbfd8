use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::catalog::error::StoreError;
use crate::catalog::ordering::{compare_versions, find_newest, sort_newest_first};
use crate::catalog::storer::SignatureStorer;
use crate::catalog::types::{
    CatalogStats, LibraryCatalog, LibrarySummary, SymbolMap, VersionEntry,
};
use crate::config::EXTRACTION_LOCK_TIMEOUT_MS;
use crate::usage::libraries::normalize_distribution_name;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: extracting_since column
    &["ALTER TABLE libraries ADD COLUMN extracting_since INTEGER"],
];

/// SQLite-backed signature catalog
///
/// Writes go through the writer connection inside a transaction, so a
/// version's symbol set is stored all-or-nothing. Reads use a separate
/// connection and only ever observe committed versions. Libraries are keyed
/// by their normalized distribution name, so `PyYAML` and `pyyaml` address
/// the same entry.
pub struct SignatureStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl SignatureStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        info!("Opening signature store at {:?}", db_path);

        let writer = Connection::open(db_path)?;

        // WAL lets the reader run while a write transaction is open
        writer.pragma_update(None, "journal_mode", "WAL")?;
        // Commits reach disk before put/remove return
        writer.pragma_update(None, "synchronous", "FULL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(BUSY_TIMEOUT)?;

        Self::create_schema(&writer)?;

        let reader = Connection::open(db_path)?;
        reader.busy_timeout(BUSY_TIMEOUT)?;

        debug!("Signature store connections established");

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.writer.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn lock_reader(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.reader.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn library_key(library: &str) -> String {
        normalize_distribution_name(library)
    }

    fn current_timestamp_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn create_schema(conn: &Connection) -> Result<(), StoreError> {
        debug!("Creating database schema");

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS libraries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                updated_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                library_id INTEGER NOT NULL,
                version TEXT NOT NULL,
                symbols TEXT NOT NULL,
                symbol_count INTEGER NOT NULL,
                extracted_at INTEGER NOT NULL,
                FOREIGN KEY (library_id) REFERENCES libraries(id) ON DELETE CASCADE,
                UNIQUE(library_id, version)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_versions_library_id ON versions(library_id)",
            [],
        )?;

        Self::apply_migrations(conn)?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), StoreError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    match conn.execute(sql, []) {
                        Ok(_) => {}
                        Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                            if msg.contains("duplicate column name") =>
                        {
                            debug!("Column already exists, skipping: {}", sql);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
            debug!("Updated schema version to v{}", target_version);
        }

        Ok(())
    }

    pub fn get(&self, library: &str, version: &str) -> Result<Option<SymbolMap>, StoreError> {
        let library = Self::library_key(library);
        let library = library.as_str();
        let conn = self.lock_reader()?;
        let symbols: Option<String> = conn
            .query_row(
                r#"
                SELECT v.symbols FROM versions v
                JOIN libraries l ON v.library_id = l.id
                WHERE l.name = ?1 AND v.version = ?2
                "#,
                (library, version),
                |row| row.get(0),
            )
            .optional()?;

        symbols
            .map(|json| serde_json::from_str(&json).map_err(StoreError::from))
            .transpose()
    }

    pub fn put(&self, library: &str, version: &str, symbols: &SymbolMap) -> Result<(), StoreError> {
        let library = Self::library_key(library);
        let library = library.as_str();
        debug!(
            "Saving {} symbols for {}=={}",
            symbols.len(),
            library,
            version
        );

        let json = serde_json::to_string(symbols)?;
        let now = Self::current_timestamp_ms();

        let mut conn = self.lock_writer()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO libraries (name, updated_at)
            VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET updated_at = excluded.updated_at
            "#,
            (library, now),
        )?;

        let library_id: i64 = tx.query_row(
            "SELECT id FROM libraries WHERE name = ?1",
            [library],
            |row| row.get(0),
        )?;

        tx.execute(
            r#"
            INSERT INTO versions (library_id, version, symbols, symbol_count, extracted_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(library_id, version) DO UPDATE SET
                symbols = excluded.symbols,
                symbol_count = excluded.symbol_count,
                extracted_at = excluded.extracted_at
            "#,
            (library_id, version, &json, symbols.len() as i64, now),
        )?;

        tx.commit()?;
        Ok(())
    }

    pub fn versions(&self, library: &str) -> Result<Vec<String>, StoreError> {
        let library = Self::library_key(library);
        let library = library.as_str();
        let conn = self.lock_reader()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT v.version FROM versions v
            JOIN libraries l ON v.library_id = l.id
            WHERE l.name = ?1
            "#,
        )?;

        let mut versions = stmt
            .query_map([library], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        sort_newest_first(&mut versions);
        Ok(versions)
    }

    pub fn remove(&self, library: &str) -> Result<bool, StoreError> {
        let library = Self::library_key(library);
        let library = library.as_str();
        let mut conn = self.lock_writer()?;
        let tx = conn.transaction()?;

        let version_count: i64 = tx.query_row(
            r#"
            SELECT COUNT(*) FROM versions v
            JOIN libraries l ON v.library_id = l.id
            WHERE l.name = ?1
            "#,
            [library],
            |row| row.get(0),
        )?;

        // Versions go with the library row (ON DELETE CASCADE)
        tx.execute("DELETE FROM libraries WHERE name = ?1", [library])?;
        tx.commit()?;

        info!("Removed {} ({} versions)", library, version_count);
        Ok(version_count > 0)
    }

    pub fn catalog(&self, library: &str) -> Result<Option<LibraryCatalog>, StoreError> {
        let library = Self::library_key(library);
        let library = library.as_str();
        let conn = self.lock_reader()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT v.version, v.symbols FROM versions v
            JOIN libraries l ON v.library_id = l.id
            WHERE l.name = ?1
            "#,
        )?;

        let rows = stmt
            .query_map([library], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut versions = rows
            .into_iter()
            .map(|(version, json)| {
                Ok(VersionEntry {
                    version,
                    symbols: serde_json::from_str(&json)?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        versions.sort_by(|a, b| compare_versions(&b.version, &a.version));

        Ok(Some(LibraryCatalog {
            library: library.to_string(),
            versions,
        }))
    }

    /// Whether at least one version of the library is indexed
    pub fn contains(&self, library: &str) -> Result<bool, StoreError> {
        let library = Self::library_key(library);
        let library = library.as_str();
        let conn = self.lock_reader()?;
        let exists = conn.query_row(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM versions v
                JOIN libraries l ON v.library_id = l.id
                WHERE l.name = ?1
            )
            "#,
            [library],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Names of every library with at least one indexed version, sorted
    pub fn libraries(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.lock_reader()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT l.name FROM libraries l
            WHERE EXISTS (SELECT 1 FROM versions v WHERE v.library_id = l.id)
            ORDER BY l.name
            "#,
        )?;

        let libraries = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(libraries)
    }

    pub fn summaries(&self) -> Result<Vec<LibrarySummary>, StoreError> {
        let conn = self.lock_reader()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT l.name, v.version, v.extracted_at FROM versions v
            JOIN libraries l ON v.library_id = l.id
            ORDER BY l.name
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut summaries: Vec<LibrarySummary> = Vec::new();
        let mut versions: Vec<String> = Vec::new();
        let mut last_extracted_ms = i64::MIN;

        let mut rows = rows.into_iter().peekable();
        while let Some((library, version, extracted_at)) = rows.next() {
            versions.push(version);
            last_extracted_ms = last_extracted_ms.max(extracted_at);

            let library_done = rows.peek().is_none_or(|(next, _, _)| *next != library);
            if library_done {
                summaries.push(LibrarySummary {
                    library,
                    version_count: versions.len(),
                    newest_version: find_newest(&versions),
                    last_extracted: DateTime::<Utc>::from_timestamp_millis(last_extracted_ms),
                });
                versions.clear();
                last_extracted_ms = i64::MIN;
            }
        }

        Ok(summaries)
    }

    pub fn stats(&self) -> Result<CatalogStats, StoreError> {
        let conn = self.lock_reader()?;
        let (total_libraries, total_versions, total_symbols): (i64, i64, i64) = conn.query_row(
            r#"
            SELECT
                COUNT(DISTINCT library_id),
                COUNT(*),
                COALESCE(SUM(symbol_count), 0)
            FROM versions
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(CatalogStats {
            total_libraries: total_libraries as usize,
            total_versions: total_versions as usize,
            total_symbols: total_symbols as usize,
        })
    }

    pub fn try_start_extraction(&self, library: &str) -> Result<bool, StoreError> {
        let library = Self::library_key(library);
        let library = library.as_str();
        let now = Self::current_timestamp_ms();
        let timeout_threshold = now - EXTRACTION_LOCK_TIMEOUT_MS;

        let conn = self.lock_writer()?;

        // Take the lock if nobody holds it or the holder timed out
        let rows_affected = conn.execute(
            r#"
            UPDATE libraries
            SET extracting_since = ?1
            WHERE name = ?2
              AND (extracting_since IS NULL OR extracting_since < ?3)
            "#,
            (now, library, timeout_threshold),
        )?;

        if rows_affected > 0 {
            return Ok(true);
        }

        // Library might not exist yet; only the first inserter gets the lock
        let rows_inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO libraries (name, updated_at, extracting_since)
            VALUES (?1, ?2, ?3)
            "#,
            (library, now, now),
        )?;

        Ok(rows_inserted > 0)
    }

    pub fn finish_extraction(&self, library: &str) -> Result<(), StoreError> {
        let library = Self::library_key(library);
        let library = library.as_str();
        let conn = self.lock_writer()?;
        conn.execute(
            "UPDATE libraries SET extracting_since = NULL WHERE name = ?1",
            [library],
        )?;
        Ok(())
    }
}

impl SignatureStorer for SignatureStore {
    fn get(&self, library: &str, version: &str) -> Result<Option<SymbolMap>, StoreError> {
        SignatureStore::get(self, library, version)
    }

    fn put(&self, library: &str, version: &str, symbols: &SymbolMap) -> Result<(), StoreError> {
        SignatureStore::put(self, library, version, symbols)
    }

    fn versions(&self, library: &str) -> Result<Vec<String>, StoreError> {
        SignatureStore::versions(self, library)
    }

    fn remove(&self, library: &str) -> Result<bool, StoreError> {
        SignatureStore::remove(self, library)
    }

    fn catalog(&self, library: &str) -> Result<Option<LibraryCatalog>, StoreError> {
        SignatureStore::catalog(self, library)
    }

    fn try_start_extraction(&self, library: &str) -> Result<bool, StoreError> {
        SignatureStore::try_start_extraction(self, library)
    }

    fn finish_extraction(&self, library: &str) -> Result<(), StoreError> {
        SignatureStore::finish_extraction(self, library)
    }
}
