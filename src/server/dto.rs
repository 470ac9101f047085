use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SchemaParams {
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    /// `latest` or a version number. Defaults to `latest`.
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VersionsParams {
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

/// Fields collected from a multipart `/upload` request.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub application: Option<String>,
    pub service: Option<String>,
    pub filename: Option<String>,
    pub content: Option<Vec<u8>>,
}
