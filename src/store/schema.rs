pub const SCHEMA: &str = r#"
-- Applications are the top-level scope for uploaded schemas
CREATE TABLE IF NOT EXISTS application (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    createdAt TEXT DEFAULT (datetime('now'))
);

-- Services are optional sub-scopes owned by one application
CREATE TABLE IF NOT EXISTS service (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    applicationId INTEGER NOT NULL REFERENCES application(id),
    createdAt TEXT DEFAULT (datetime('now')),

    UNIQUE(name, applicationId)
);

-- One row per uploaded document. Append-only.
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    checksum TEXT NOT NULL,            -- hex sha256 of the raw bytes
    version INTEGER NOT NULL CHECK (version > 0),
    applicationId INTEGER NOT NULL REFERENCES application(id),
    serviceId INTEGER REFERENCES service(id),  -- NULL = app-level scope
    path TEXT NOT NULL,                -- relative to the schemas root
    createdAt TEXT DEFAULT (datetime('now'))
);

-- NULL service ids compare distinct in a plain UNIQUE, so fold them to 0
CREATE UNIQUE INDEX IF NOT EXISTS idx_schema_version_scope
    ON schema_version(applicationId, IFNULL(serviceId, 0), version);
CREATE INDEX IF NOT EXISTS idx_service_application ON service(applicationId);
"#;
