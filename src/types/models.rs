use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub application_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub id: i64,
    pub filename: String,
    pub checksum: String,
    pub version: i64,
    pub application_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<i64>,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

impl SchemaVersion {
    #[must_use]
    pub fn scope(&self) -> Scope {
        match self.service_id {
            Some(service_id) => Scope::ServiceLevel {
                application_id: self.application_id,
                service_id,
            },
            None => Scope::AppLevel {
                application_id: self.application_id,
            },
        }
    }
}

/// The (application, optional service) pair a version sequence belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    AppLevel { application_id: i64 },
    ServiceLevel { application_id: i64, service_id: i64 },
}

impl Scope {
    #[must_use]
    pub fn new(application_id: i64, service_id: Option<i64>) -> Self {
        match service_id {
            Some(service_id) => Self::ServiceLevel {
                application_id,
                service_id,
            },
            None => Self::AppLevel { application_id },
        }
    }

    #[must_use]
    pub fn application_id(&self) -> i64 {
        match *self {
            Self::AppLevel { application_id } | Self::ServiceLevel { application_id, .. } => {
                application_id
            }
        }
    }

    #[must_use]
    pub fn service_id(&self) -> Option<i64> {
        match *self {
            Self::AppLevel { .. } => None,
            Self::ServiceLevel { service_id, .. } => Some(service_id),
        }
    }
}

/// Which version of a scope to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    Latest,
    Exact(i64),
}

impl VersionSelector {
    pub const LATEST: &'static str = "latest";

    /// Parses `latest` or a strictly positive integer. Returns `None` otherwise.
    ///
    /// Numbers too large for `i64` saturate to `i64::MAX`, which no scope
    /// ever reaches, so they resolve as not found.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input == Self::LATEST {
            return Some(Self::Latest);
        }
        if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match input.parse::<i64>() {
            Ok(version) if version > 0 => Some(Self::Exact(version)),
            Ok(_) => None,
            Err(_) => Some(Self::Exact(i64::MAX)),
        }
    }
}

/// Returned to the caller after a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReceipt {
    pub application: String,
    pub service: Option<String>,
    pub version: i64,
    pub filename: String,
    pub path: String,
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedSchema {
    pub application: String,
    pub service: Option<String>,
    pub version: i64,
    pub filename: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSummary {
    pub version: i64,
    pub filename: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

impl From<SchemaVersion> for VersionSummary {
    fn from(row: SchemaVersion) -> Self {
        Self {
            version: row.version,
            filename: row.filename,
            checksum: row.checksum,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionListing {
    pub application: String,
    pub service: Option<String>,
    pub versions: Vec<VersionSummary>,
}
