use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::store::{DocumentStore, Revision, StoredDocument, validate_key};
use crate::{ClientError, ClientResult};

const USER_AGENT: &str = concat!("empenhos/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Repository whose contents API backs the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub api_base: String,
    /// `owner/name`.
    pub repo: String,
    pub branch: String,
    pub token: String,
}

impl RemoteSettings {
    pub fn contents_url(&self, key: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base.trim_end_matches('/'),
            self.repo.trim_matches('/'),
            key
        )
    }
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WrittenContent,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutBody<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Documents stored as files in a remote repository, one commit per write.
///
/// The revision is the blob sha the API reports.
pub struct RemoteStore {
    settings: RemoteSettings,
    client: Client,
}

impl RemoteStore {
    pub fn new(settings: RemoteSettings) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| ClientError::store_unavailable(&settings.repo, &error.to_string()))?;
        Ok(Self { settings, client })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.settings.token)
            .header("Accept", "application/vnd.github+json")
    }
}

impl DocumentStore for RemoteStore {
    fn get(&self, key: &str) -> ClientResult<Option<StoredDocument>> {
        validate_key(key)?;
        let response = self
            .authorized(self.client.get(self.settings.contents_url(key)))
            .query(&[("ref", self.settings.branch.as_str())])
            .send()
            .map_err(|error| ClientError::store_unavailable(key, &error.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(unexpected_status(key, status, response.text().unwrap_or_default()));
        }

        let body = response
            .json::<ContentsResponse>()
            .map_err(|error| ClientError::store_corrupt(key, &error.to_string()))?;
        let bytes = decode_content(&body.content)
            .map_err(|detail| ClientError::store_corrupt(key, &detail))?;
        Ok(Some(StoredDocument {
            bytes,
            revision: Revision::new(body.sha),
        }))
    }

    fn put(&self, key: &str, bytes: &[u8], expected: Option<&Revision>) -> ClientResult<Revision> {
        validate_key(key)?;
        let body = PutBody {
            message: format!("Atualiza {key}"),
            content: STANDARD.encode(bytes),
            branch: &self.settings.branch,
            sha: expected.map(Revision::as_str),
        };
        let response = self
            .authorized(self.client.put(self.settings.contents_url(key)))
            .json(&body)
            .send()
            .map_err(|error| ClientError::store_unavailable(key, &error.to_string()))?;

        let status = response.status();
        if is_write_conflict(status) {
            debug!(key, %status, "remote write rejected as conflict");
            return Err(ClientError::store_conflict(key));
        }
        if !status.is_success() {
            return Err(unexpected_status(key, status, response.text().unwrap_or_default()));
        }

        let written = response
            .json::<WriteResponse>()
            .map_err(|error| ClientError::store_corrupt(key, &error.to_string()))?;
        Ok(Revision::new(written.content.sha))
    }

    fn delete(&self, key: &str, expected: &Revision) -> ClientResult<()> {
        validate_key(key)?;
        let response = self
            .authorized(self.client.delete(self.settings.contents_url(key)))
            .json(&json!({
                "message": format!("Remove {key}"),
                "sha": expected.as_str(),
                "branch": self.settings.branch,
            }))
            .send()
            .map_err(|error| ClientError::store_unavailable(key, &error.to_string()))?;

        let status = response.status();
        if is_write_conflict(status) || status == StatusCode::NOT_FOUND {
            return Err(ClientError::store_conflict(key));
        }
        if !status.is_success() {
            return Err(unexpected_status(key, status, response.text().unwrap_or_default()));
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "github"
    }
}

fn is_write_conflict(status: StatusCode) -> bool {
    status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY
}

fn unexpected_status(key: &str, status: StatusCode, body: String) -> ClientError {
    let detail = if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {}", body.trim())
    };
    ClientError::store_unavailable(key, &detail)
}

/// The contents API wraps base64 at 60 columns.
fn decode_content(content: &str) -> Result<Vec<u8>, String> {
    let compact = content
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|error| error.to_string())
}
