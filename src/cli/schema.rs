use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::multipart::{Form, Part};

use super::http_client::ApiClient;
use crate::types::{IngestReceipt, ResolvedSchema, VersionListing};

fn scope_label(application: &str, service: Option<&str>) -> String {
    match service {
        Some(service) => format!("{application}/{service}"),
        None => application.to_string(),
    }
}

pub fn run_upload(
    spec: &Path,
    application: &str,
    service: Option<&str>,
    server: &str,
) -> anyhow::Result<()> {
    if !spec.is_file() {
        let shown = std::path::absolute(spec).unwrap_or_else(|_| spec.to_path_buf());
        anyhow::bail!("File not found at {}", shown.display());
    }

    let filename = spec
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", spec.display()))?
        .to_string();
    let data = fs::read(spec)?;

    let mut form = Form::new()
        .text("application", application.to_string())
        .part("file", Part::bytes(data).file_name(filename));
    if let Some(service) = service {
        form = form.text("service", service.to_string());
    }

    let client = ApiClient::new(server)?;
    let receipt: IngestReceipt = client.post_multipart("/upload", form)?;

    println!(
        "Uploaded {} as version {} of {}",
        receipt.filename,
        receipt.version,
        scope_label(&receipt.application, receipt.service.as_deref())
    );
    println!("{}", serde_json::to_string_pretty(&receipt)?);

    Ok(())
}

pub fn run_get(
    application: &str,
    service: Option<&str>,
    version: &str,
    output: Option<PathBuf>,
    server: &str,
) -> anyhow::Result<()> {
    let client = ApiClient::new(server)?;

    let mut query = vec![("application", application), ("version", version)];
    if let Some(service) = service {
        query.push(("service", service));
    }
    let schema: ResolvedSchema = client.get("/schema", &query)?;

    match output {
        Some(path) => {
            fs::write(&path, schema.content.as_bytes())?;
            println!(
                "Wrote version {} of {} to {}",
                schema.version,
                scope_label(&schema.application, schema.service.as_deref()),
                path.display()
            );
        }
        None => {
            println!("Application: {}", schema.application);
            if let Some(service) = &schema.service {
                println!("Service:     {service}");
            }
            println!("Version:     {}", schema.version);
            println!("Filename:    {}", schema.filename);
            println!("Checksum:    {}", schema.checksum);
            println!("Created:     {}", schema.created_at.to_rfc3339());
            println!();
            print!("{}", schema.content);
            if !schema.content.ends_with('\n') {
                println!();
            }
        }
    }

    Ok(())
}

pub fn run_versions(application: &str, service: Option<&str>, server: &str) -> anyhow::Result<()> {
    let client = ApiClient::new(server)?;

    let mut query = vec![("application", application)];
    if let Some(service) = service {
        query.push(("service", service));
    }
    let listing: VersionListing = client.get("/schema/versions", &query)?;

    let label = scope_label(&listing.application, listing.service.as_deref());
    if listing.versions.is_empty() {
        println!("No versions for {label}");
        return Ok(());
    }

    println!("Versions of {label}:");
    println!();
    println!("{:<8} {:<30} {:<14} CREATED", "VERSION", "FILENAME", "CHECKSUM");
    for v in &listing.versions {
        println!(
            "{:<8} {:<30} {:<14} {}",
            v.version,
            v.filename,
            &v.checksum[..v.checksum.len().min(12)],
            v.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}
