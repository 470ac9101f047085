use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response, multipart::Form};
use serde::{Deserialize, de::DeserializeOwned};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

impl ApiClient {
    pub fn new(server_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> anyhow::Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).query(query).send()?;
        self.handle_response(resp)
    }

    pub fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> anyhow::Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.post(&url).multipart(form).send()?;
        self.handle_response(resp)
    }

    fn handle_response<T: DeserializeOwned>(&self, resp: Response) -> anyhow::Result<T> {
        if resp.status().is_success() {
            let api_resp: ApiResponse<T> = resp.json()?;
            api_resp
                .data
                .ok_or_else(|| anyhow::anyhow!("Server returned an empty response"))
        } else {
            Err(error_from_response(resp))
        }
    }
}

fn error_from_response(resp: Response) -> anyhow::Error {
    let status = resp.status();
    let body = resp.text().unwrap_or_default();

    match serde_json::from_str::<ApiResponse<()>>(&body) {
        Ok(ApiResponse {
            error: Some(message),
            kind,
            ..
        }) => match kind {
            Some(kind) => anyhow::anyhow!("{message} ({kind})"),
            None => anyhow::anyhow!(message),
        },
        _ => describe_status(status, &body),
    }
}

fn describe_status(status: StatusCode, body: &str) -> anyhow::Error {
    let body = body.trim();
    if body.is_empty() {
        anyhow::anyhow!("Server error ({status})")
    } else {
        anyhow::anyhow!("Server error ({status}): {body}")
    }
}
