use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, AppResult};

const DEFAULT_ORIGIN: &str = "https://datalab.sspcloud.fr";
const DEFAULT_CALLBACK_URI: &str = "http://127.0.0.1:8788/callback";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub keycloak_url: Option<String>,
    #[serde(default)]
    pub realm: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub landing_path: Option<String>,
    #[serde(default)]
    pub callback_uri: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn keycloak_url(&self) -> AppResult<&str> {
        required(self.keycloak_url.as_deref(), "keycloak_url")
    }

    pub fn realm(&self) -> AppResult<&str> {
        required(self.realm.as_deref(), "realm")
    }

    pub fn client_id(&self) -> AppResult<&str> {
        required(self.client_id.as_deref(), "client_id")
    }

    pub fn api_url(&self) -> AppResult<Url> {
        Ok(Url::parse(required(self.api_url.as_deref(), "api_url")?)?)
    }

    pub fn origin(&self) -> AppResult<Url> {
        Ok(Url::parse(self.origin.as_deref().unwrap_or(DEFAULT_ORIGIN))?)
    }

    /// Page the session returns to when asked for the "current page":
    /// `landing_path` resolved against the origin, or the origin itself.
    pub fn current_page(&self) -> AppResult<Url> {
        let origin = self.origin()?;
        match self
            .landing_path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
        {
            Some(path) => Ok(origin.join(path)?),
            None => Ok(origin),
        }
    }

    /// Local listener the identity provider redirects back to.
    pub fn callback_uri(&self) -> AppResult<Url> {
        Ok(Url::parse(
            self.callback_uri.as_deref().unwrap_or(DEFAULT_CALLBACK_URI),
        )?)
    }

    pub fn language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|language| !language.is_empty())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> AppResult<&'a str> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            AppError::Config(format!(
                "missing {field} in profile settings. add it to your profile json"
            ))
        })
}

pub fn load(path: PathBuf) -> AppResult<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
