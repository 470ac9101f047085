use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Formats accepted for upload, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some(other) => Err(Error::UnsupportedType(format!(
                "Unsupported file type: .{other} (expected .json, .yaml, or .yml)"
            ))),
            None => Err(Error::UnsupportedType(
                "Unsupported file type: missing extension (expected .json, .yaml, or .yml)"
                    .to_string(),
            )),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

/// Checks that `data` parses in the format implied by `filename`.
/// Only syntax is checked, not OpenAPI semantics.
pub fn validate_document(filename: &str, data: &[u8]) -> Result<DocumentFormat> {
    let format = DocumentFormat::from_filename(filename)?;

    let parsed = match format {
        DocumentFormat::Json => serde_json::from_slice::<serde_json::Value>(data)
            .map(|_| ())
            .map_err(|e| e.to_string()),
        DocumentFormat::Yaml => serde_yaml::from_slice::<serde_yaml::Value>(data)
            .map(|_| ())
            .map_err(|e| e.to_string()),
    };

    parsed.map_err(|e| Error::InvalidInput(format!("Invalid .{} file: {e}", format.as_str())))?;
    Ok(format)
}

/// Lower-case hex SHA-256 of the raw bytes.
#[must_use]
pub fn checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
