use std::path::{Path, PathBuf};

use crate::ClientResult;
use crate::state::{data_dir, resolve_home};
use crate::{ClientError, store::remote::RemoteSettings};

pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSettings {
    Local,
    Remote(RemoteSettings),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub home: PathBuf,
    pub data_dir: PathBuf,
    pub store: StoreSettings,
}

impl Settings {
    pub fn load(home_override: Option<&Path>) -> ClientResult<Self> {
        Self::from_lookup(home_override, |name| std::env::var(name).ok())
    }

    /// Resolves settings through `lookup` instead of the process environment.
    pub fn from_lookup<F>(home_override: Option<&Path>, lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = resolve_home(home_override)?;
        let store = resolve_store(&lookup)?;
        Ok(Self {
            data_dir: data_dir(&home),
            home,
            store,
        })
    }
}

fn resolve_store<F>(lookup: &F) -> ClientResult<StoreSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let backend = non_empty(lookup("EMPENHOS_STORE")).unwrap_or_else(|| "local".to_string());
    match backend.to_ascii_lowercase().as_str() {
        "local" => Ok(StoreSettings::Local),
        "github" | "remote" => {
            let repo = non_empty(lookup("EMPENHOS_GITHUB_REPO")).ok_or_else(|| {
                ClientError::config_missing(
                    "EMPENHOS_GITHUB_REPO",
                    "the remote store needs an `owner/name` repository.",
                )
            })?;
            let token = non_empty(lookup("EMPENHOS_GITHUB_TOKEN")).ok_or_else(|| {
                ClientError::config_missing(
                    "EMPENHOS_GITHUB_TOKEN",
                    "the remote store needs a token with contents write access.",
                )
            })?;
            Ok(StoreSettings::Remote(RemoteSettings {
                api_base: non_empty(lookup("EMPENHOS_GITHUB_API"))
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                repo,
                branch: non_empty(lookup("EMPENHOS_GITHUB_BRANCH"))
                    .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
                token,
            }))
        }
        other => Err(ClientError::invalid_argument_with_recovery(
            &format!("Unknown document store backend `{other}`."),
            vec!["Set `EMPENHOS_STORE` to `local` or `github`.".to_string()],
        )),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|current| current.trim().to_string())
        .filter(|current| !current.is_empty())
}
