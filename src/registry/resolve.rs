use tracing::error;

use super::{Registry, normalize_service};
use super::document::checksum;
use crate::blob::BlobError;
use crate::error::{Error, Result};
use crate::types::{
    ResolvedSchema, SchemaVersion, Scope, VersionListing, VersionSelector, VersionSummary,
};

impl Registry {
    /// Looks up the scope for a read. Unknown names are `NotFound`.
    fn lookup_scope(&self, application: &str, service: Option<&str>) -> Result<Scope> {
        if application.is_empty() {
            return Err(Error::invalid("application is required"));
        }

        let app = self
            .store
            .find_application(application)?
            .ok_or_else(|| Error::not_found("application not found"))?;

        let service_id = match service {
            Some(name) => Some(
                self.store
                    .find_service(name, app.id)?
                    .ok_or_else(|| Error::not_found("service not found"))?
                    .id,
            ),
            None => None,
        };

        Ok(Scope::new(app.id, service_id))
    }

    /// Resolves `latest` or an explicit version number to the stored document.
    pub async fn resolve(
        &self,
        application: &str,
        service: Option<&str>,
        selector: &str,
    ) -> Result<ResolvedSchema> {
        let application = application.trim();
        let service = normalize_service(service);
        let scope = self.lookup_scope(application, service)?;

        let selector = VersionSelector::parse(selector)
            .ok_or_else(|| Error::invalid("invalid version number"))?;

        let row = self
            .store
            .resolve_version(scope, selector)?
            .ok_or_else(|| Error::not_found("schema version not found"))?;

        let content = self.load_verified(&row).await?;

        Ok(ResolvedSchema {
            application: application.to_string(),
            service: service.map(str::to_string),
            version: row.version,
            filename: row.filename,
            checksum: row.checksum,
            created_at: row.created_at,
            content,
        })
    }

    /// Lists a scope's versions, newest first, without reading any blobs.
    pub async fn list_versions(
        &self,
        application: &str,
        service: Option<&str>,
    ) -> Result<VersionListing> {
        let application = application.trim();
        let service = normalize_service(service);
        let scope = self.lookup_scope(application, service)?;

        let versions = self
            .store
            .list_versions(scope)?
            .into_iter()
            .map(VersionSummary::from)
            .collect();

        Ok(VersionListing {
            application: application.to_string(),
            service: service.map(str::to_string),
            versions,
        })
    }

    async fn load_verified(&self, row: &SchemaVersion) -> Result<String> {
        let data = match self.content.load(&row.path).await {
            Ok(data) => data,
            Err(BlobError::NotFound) => {
                error!("Blob missing for schema version {}: {}", row.id, row.path);
                return Err(Error::Integrity("schema file missing on disk".to_string()));
            }
            Err(e) => {
                error!("Failed to read blob {}: {}", row.path, e);
                return Err(Error::Integrity(format!("schema file unreadable: {e}")));
            }
        };

        let actual = checksum(&data);
        if actual != row.checksum {
            error!(
                "Checksum mismatch for {}: expected {}, got {}",
                row.path, row.checksum, actual
            );
            return Err(Error::Integrity(
                "schema file does not match its recorded checksum".to_string(),
            ));
        }

        String::from_utf8(data)
            .map_err(|_| Error::Integrity("schema file is not valid UTF-8".to_string()))
    }
}
