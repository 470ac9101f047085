use std::time::Duration;

use tracing::{info, warn};

use super::document::{checksum, validate_document};
use super::{Registry, normalize_service};
use crate::blob::BlobError;
use crate::blob::path::{validate_filename, validate_name};
use crate::error::{Error, Result};
use crate::types::{IngestReceipt, Scope, VersionSelector};

/// How many times a version is re-derived after losing an insert race to
/// another writer on the same database.
const MAX_ALLOCATION_ATTEMPTS: usize = 3;

/// A blob with no catalog row younger than this may still be in flight from
/// another writer and is left alone.
const ORPHAN_MIN_AGE: Duration = Duration::from_secs(60);

impl Registry {
    /// Validates and stores a document as the next version of its scope.
    ///
    /// Nothing is written unless validation passes. The blob is written
    /// before its row so a crash in between leaves an orphan file rather
    /// than a row without content. Existing blobs are never replaced.
    pub async fn ingest(
        &self,
        application: &str,
        service: Option<&str>,
        filename: &str,
        data: &[u8],
    ) -> Result<IngestReceipt> {
        let application = application.trim();
        if application.is_empty() {
            return Err(Error::invalid("application is required"));
        }
        validate_name(application, "Application").map_err(Error::InvalidInput)?;

        let service = normalize_service(service);
        if let Some(service) = service {
            validate_name(service, "Service").map_err(Error::InvalidInput)?;
        }

        validate_filename(filename).map_err(Error::InvalidInput)?;
        validate_document(filename, data)?;

        let checksum = checksum(data);

        let application_id = self.store.ensure_application(application)?;
        let service_id = match service {
            Some(name) => Some(self.store.ensure_service(name, application_id)?),
            None => None,
        };
        let scope = Scope::new(application_id, service_id);

        let _guard = self.write_lock.lock().await;

        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let version = self.store.next_version(scope)?;
            let path = match self
                .content
                .store(application, service, version, filename, data)
                .await
            {
                Ok(path) => path,
                Err(BlobError::Occupied(path)) => {
                    self.reclaim_occupied(scope, version, &path, attempt).await?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match self
                .store
                .record_version(filename, &checksum, version, scope, &path)
            {
                Ok(_) => {
                    info!(
                        "Stored {} v{} for {}/{}",
                        filename,
                        version,
                        application,
                        service.unwrap_or("-")
                    );
                    return Ok(IngestReceipt {
                        application: application.to_string(),
                        service: service.map(str::to_string),
                        version,
                        filename: filename.to_string(),
                        path,
                        checksum,
                    });
                }
                Err(e) => {
                    // The file was published by this attempt, so it is ours
                    // to take back.
                    if let Err(cleanup) = self.content.remove(&path).await {
                        warn!("Failed to remove unrecorded blob {}: {}", path, cleanup);
                    }
                    match e {
                        Error::Conflict(message) => warn!(
                            "Version {} taken for {}/{} (attempt {}): {}",
                            version,
                            application,
                            service.unwrap_or("-"),
                            attempt,
                            message
                        ),
                        e => return Err(e),
                    }
                }
            }
        }

        Err(Error::Conflict(format!(
            "could not allocate a version after {MAX_ALLOCATION_ATTEMPTS} attempts"
        )))
    }

    /// Handles a version path that already holds a file. If the catalog has
    /// the row, another writer won and the caller re-derives. Otherwise the
    /// file is an orphan and is moved aside once it is old enough.
    async fn reclaim_occupied(
        &self,
        scope: Scope,
        version: i64,
        path: &str,
        attempt: usize,
    ) -> Result<()> {
        let recorded = self
            .store
            .resolve_version(scope, VersionSelector::Exact(version))?
            .is_some();

        if recorded {
            warn!(
                "Blob {} belongs to a recorded version (attempt {})",
                path, attempt
            );
        } else if !self.content.quarantine(path, ORPHAN_MIN_AGE).await? {
            warn!(
                "Blob {} has no catalog row yet, leaving it in place (attempt {})",
                path, attempt
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    use tempfile::TempDir;

    use super::super::document::checksum;
    use super::super::test_support::{OPENAPI_V1, OPENAPI_V2, stale_registry, test_registry};
    use crate::error::Error;
    use crate::types::Scope;

    #[tokio::test]
    async fn test_first_upload_is_version_one() {
        let (temp, registry) = test_registry();

        let receipt = registry
            .ingest("test-app", None, "openapi.yaml", OPENAPI_V1)
            .await
            .unwrap();

        assert_eq!(receipt.version, 1);
        assert_eq!(receipt.application, "test-app");
        assert_eq!(receipt.service, None);
        assert_eq!(receipt.path, "test-app/__app/1-openapi.yaml");
        assert!(temp.path().join("schemas/test-app/__app/1-openapi.yaml").is_file());

        let second = registry
            .ingest("test-app", None, "openapi.yaml", OPENAPI_V2)
            .await
            .unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(second.path, "test-app/__app/2-openapi.yaml");
    }

    #[tokio::test]
    async fn test_app_and_service_sequences_are_independent() {
        let (_temp, registry) = test_registry();

        let app_level = registry
            .ingest("shop", None, "openapi.yaml", OPENAPI_V1)
            .await
            .unwrap();
        let billing = registry
            .ingest("shop", Some("billing"), "openapi.yaml", OPENAPI_V1)
            .await
            .unwrap();
        let orders = registry
            .ingest("shop", Some("orders"), "openapi.yaml", OPENAPI_V1)
            .await
            .unwrap();
        let billing_again = registry
            .ingest("shop", Some("billing"), "openapi.yaml", OPENAPI_V2)
            .await
            .unwrap();

        assert_eq!(app_level.version, 1);
        assert_eq!(billing.version, 1);
        assert_eq!(orders.version, 1);
        assert_eq!(billing_again.version, 2);
        assert_eq!(billing_again.path, "shop/billing/2-openapi.yaml");
    }

    #[tokio::test]
    async fn test_empty_service_is_app_level() {
        let (_temp, registry) = test_registry();
        let receipt = registry
            .ingest("shop", Some(""), "spec.json", b"{}")
            .await
            .unwrap();
        assert_eq!(receipt.service, None);
        assert_eq!(receipt.path, "shop/__app/1-spec.json");
    }

    #[tokio::test]
    async fn test_checksum_matches_stored_blob() {
        let (temp, registry) = test_registry();

        let receipt = registry
            .ingest("test-app", Some("svc"), "openapi.yaml", OPENAPI_V1)
            .await
            .unwrap();

        let on_disk = std::fs::read(temp.path().join("schemas").join(&receipt.path)).unwrap();
        assert_eq!(on_disk, OPENAPI_V1);
        assert_eq!(receipt.checksum, checksum(&on_disk));
        assert_eq!(receipt.checksum.len(), 64);
    }

    #[tokio::test]
    async fn test_missing_application() {
        let (_temp, registry) = test_registry();
        let err = registry
            .ingest("", None, "file.json", b"{}")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m == "application is required"));
    }

    #[tokio::test]
    async fn test_unsupported_type() {
        let (_temp, registry) = test_registry();
        let err = registry
            .ingest("app", None, "file.txt", b"hello")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(_)));
    }

    #[tokio::test]
    async fn test_invalid_body_leaves_no_state() {
        let (temp, registry) = test_registry();

        let err = registry
            .ingest("app", Some("svc"), "file.json", b"{\"openapi\": ")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        assert!(registry.store().find_application("app").unwrap().is_none());
        assert!(!temp.path().join("schemas").exists());
    }

    #[tokio::test]
    async fn test_failed_upload_does_not_consume_a_version() {
        let (_temp, registry) = test_registry();

        registry
            .ingest("app", None, "openapi.yaml", OPENAPI_V1)
            .await
            .unwrap();
        assert!(
            registry
                .ingest("app", None, "openapi.yaml", b"key: [unclosed")
                .await
                .is_err()
        );
        let receipt = registry
            .ingest("app", None, "openapi.yaml", OPENAPI_V2)
            .await
            .unwrap();
        assert_eq!(receipt.version, 2);
    }

    #[tokio::test]
    async fn test_path_unsafe_names_rejected() {
        let (temp, registry) = test_registry();

        for (app, service, filename) in [
            ("../etc", None, "x.json"),
            ("app", Some("../../tmp"), "x.json"),
            ("app", Some("__app"), "x.json"),
            ("a/b", None, "x.json"),
            ("app", None, "../x.json"),
        ] {
            let err = registry.ingest(app, service, filename, b"{}").await.unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{app} {service:?} {filename}");
        }
        assert!(!temp.path().join("schemas").exists());
    }

    #[tokio::test]
    async fn test_names_are_trimmed() {
        let (_temp, registry) = test_registry();

        let receipt = registry
            .ingest(" shop ", Some(" billing "), "spec.json", b"{}")
            .await
            .unwrap();
        assert_eq!(receipt.application, "shop");
        assert_eq!(receipt.service.as_deref(), Some("billing"));
        assert_eq!(receipt.path, "shop/billing/1-spec.json");

        let resolved = registry.resolve("shop", Some("billing"), "1").await.unwrap();
        assert_eq!(resolved.checksum, receipt.checksum);

        let app_level = registry
            .ingest("shop", Some("   "), "spec.json", b"{}")
            .await
            .unwrap();
        assert_eq!(app_level.service, None);
        assert_eq!(app_level.path, "shop/__app/1-spec.json");
    }

    fn write_orphan(temp: &TempDir, age: Duration) -> PathBuf {
        // Left behind by a crash between blob write and row insert.
        let orphan_dir = temp.path().join("schemas/app/__app");
        std::fs::create_dir_all(&orphan_dir).unwrap();
        let orphan = orphan_dir.join("1-spec.json");
        std::fs::write(&orphan, b"{\"stale\": true}").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&orphan)
            .unwrap()
            .set_modified(SystemTime::now() - age)
            .unwrap();
        orphan
    }

    #[tokio::test]
    async fn test_old_orphan_is_moved_aside() {
        let (temp, registry) = test_registry();
        let orphan = write_orphan(&temp, Duration::from_secs(2 * 3600));

        let receipt = registry.ingest("app", None, "spec.json", b"{}").await.unwrap();
        assert_eq!(receipt.version, 1);
        assert_eq!(std::fs::read(&orphan).unwrap(), b"{}");

        let moved: Vec<_> = std::fs::read_dir(temp.path().join("schemas/.orphans"))
            .unwrap()
            .map(|entry| std::fs::read(entry.unwrap().path()).unwrap())
            .collect();
        assert_eq!(moved, vec![b"{\"stale\": true}".to_vec()]);
    }

    #[tokio::test]
    async fn test_fresh_unrecorded_blob_is_left_alone() {
        let (temp, registry) = test_registry();
        let orphan = write_orphan(&temp, Duration::ZERO);

        let err = registry
            .ingest("app", None, "spec.json", b"{}")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(std::fs::read(&orphan).unwrap(), b"{\"stale\": true}");
    }

    #[tokio::test]
    async fn test_stale_writer_does_not_replace_live_blob() {
        let (temp, writer_a) = test_registry();
        let writer_b = stale_registry(&temp, 1);

        let a = writer_a
            .ingest("app", None, "spec.json", b"{\"writer\": \"a\"}")
            .await
            .unwrap();
        let b = writer_b
            .ingest("app", None, "spec.json", b"{\"writer\": \"b\"}")
            .await
            .unwrap();
        assert_eq!(a.version, 1);
        assert_eq!(b.version, 2);

        let first = writer_a.resolve("app", None, "1").await.unwrap();
        assert_eq!(first.content, "{\"writer\": \"a\"}");
        let second = writer_a.resolve("app", None, "2").await.unwrap();
        assert_eq!(second.content, "{\"writer\": \"b\"}");
    }

    #[tokio::test]
    async fn test_insert_conflict_rederives_and_drops_losing_blob() {
        let (temp, writer_a) = test_registry();
        let writer_b = stale_registry(&temp, 1);

        let a = writer_a
            .ingest("app", None, "spec.json", b"{\"writer\": \"a\"}")
            .await
            .unwrap();
        // With v1's blob gone, the stale writer's file lands and only the
        // unique index stops it.
        let v1_blob = temp.path().join("schemas").join(&a.path);
        std::fs::remove_file(&v1_blob).unwrap();

        let b = writer_b
            .ingest("app", None, "spec.json", b"{\"writer\": \"b\"}")
            .await
            .unwrap();
        assert_eq!(b.version, 2);
        assert!(!v1_blob.exists());

        let listing = writer_a.list_versions("app", None).await.unwrap();
        let versions: Vec<i64> = listing.versions.iter().map(|v| v.version).collect();
        assert_eq!(versions, vec![2, 1]);
        assert_eq!(listing.versions[1].checksum, a.checksum);

        let second = writer_a.resolve("app", None, "2").await.unwrap();
        assert_eq!(second.content, "{\"writer\": \"b\"}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_uploads_get_distinct_versions() {
        let (_temp, registry) = test_registry();
        let registry = Arc::new(registry);

        let mut handles = Vec::new();
        for i in 0..20 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let body = format!("{{\"upload\": {i}}}");
                registry
                    .ingest("busy", Some("svc"), "spec.json", body.as_bytes())
                    .await
            }));
        }

        let mut versions = Vec::new();
        for handle in handles {
            versions.push(handle.await.unwrap().unwrap().version);
        }
        versions.sort_unstable();
        assert_eq!(versions, (1..=20).collect::<Vec<i64>>());

        let app = registry.store().find_application("busy").unwrap().unwrap();
        let svc = registry.store().find_service("svc", app.id).unwrap().unwrap();
        let rows = registry
            .store()
            .list_versions(Scope::new(app.id, Some(svc.id)))
            .unwrap();
        assert_eq!(rows.len(), 20);
    }
}
