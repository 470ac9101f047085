use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const SCHEMA_VERSION_COLUMNS: &str =
    "id, filename, checksum, version, applicationId, serviceId, path, createdAt";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn schema_version_from_row(row: &Row<'_>) -> rusqlite::Result<SchemaVersion> {
    Ok(SchemaVersion {
        id: row.get(0)?,
        filename: row.get(1)?,
        checksum: row.get(2)?,
        version: row.get(3)?,
        application_id: row.get(4)?,
        service_id: row.get(5)?,
        path: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Application operations

    fn ensure_application(&self, name: &str) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR IGNORE INTO application (name, createdAt) VALUES (?1, ?2)",
            params![name, format_datetime(&Utc::now())],
        )?;
        conn.query_row(
            "SELECT id FROM application WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn find_application(&self, name: &str) -> Result<Option<Application>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, createdAt FROM application WHERE name = ?1",
            params![name],
            |row| {
                Ok(Application {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // Service operations

    fn ensure_service(&self, name: &str, application_id: i64) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR IGNORE INTO service (name, applicationId, createdAt) VALUES (?1, ?2, ?3)",
            params![name, application_id, format_datetime(&Utc::now())],
        )?;
        conn.query_row(
            "SELECT id FROM service WHERE name = ?1 AND applicationId = ?2",
            params![name, application_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn find_service(&self, name: &str, application_id: i64) -> Result<Option<Service>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, applicationId, createdAt
             FROM service WHERE name = ?1 AND applicationId = ?2",
            params![name, application_id],
            |row| {
                Ok(Service {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    application_id: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // Schema version operations

    fn next_version(&self, scope: Scope) -> Result<i64> {
        let conn = self.conn();
        // `IS` matches NULL service ids exactly, so app-level and
        // service-level sequences never mix.
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(version) FROM schema_version
             WHERE applicationId = ?1 AND serviceId IS ?2",
            params![scope.application_id(), scope.service_id()],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0) + 1)
    }

    fn record_version(
        &self,
        filename: &str,
        checksum: &str,
        version: i64,
        scope: Scope,
        path: &str,
    ) -> Result<i64> {
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO schema_version (filename, checksum, version, applicationId, serviceId, path, createdAt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                filename,
                checksum,
                version,
                scope.application_id(),
                scope.service_id(),
                path,
                format_datetime(&Utc::now()),
            ],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(Error::Conflict(format!(
                    "version {version} already exists in this scope"
                )))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn resolve_version(
        &self,
        scope: Scope,
        selector: VersionSelector,
    ) -> Result<Option<SchemaVersion>> {
        let conn = self.conn();
        let row = match selector {
            VersionSelector::Latest => conn
                .query_row(
                    &format!(
                        "SELECT {SCHEMA_VERSION_COLUMNS} FROM schema_version
                         WHERE applicationId = ?1 AND serviceId IS ?2
                         ORDER BY version DESC LIMIT 1"
                    ),
                    params![scope.application_id(), scope.service_id()],
                    schema_version_from_row,
                )
                .optional(),
            VersionSelector::Exact(version) => conn
                .query_row(
                    &format!(
                        "SELECT {SCHEMA_VERSION_COLUMNS} FROM schema_version
                         WHERE applicationId = ?1 AND serviceId IS ?2 AND version = ?3"
                    ),
                    params![scope.application_id(), scope.service_id(), version],
                    schema_version_from_row,
                )
                .optional(),
        };
        row.map_err(Error::from)
    }

    fn list_versions(&self, scope: Scope) -> Result<Vec<SchemaVersion>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SCHEMA_VERSION_COLUMNS} FROM schema_version
             WHERE applicationId = ?1 AND serviceId IS ?2
             ORDER BY version DESC"
        ))?;

        let rows = stmt.query_map(
            params![scope.application_id(), scope.service_id()],
            schema_version_from_row,
        )?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}
