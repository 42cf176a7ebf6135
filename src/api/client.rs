use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AppError, AppResult};

use super::models::{OidcParams, User};
use super::ports::{OidcParamsApiClient, UserApiClient};

const USER_INFO_ENDPOINT: &str = "user/info";
const OIDC_PARAMS_ENDPOINT: &str = "public/oidc-params";

#[derive(Debug, Clone)]
pub struct OnyxiaApiClient {
    http: Client,
    base_url: Url,
}

impl OnyxiaApiClient {
    pub fn new(base_url: Url, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base_url,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        access_token: Option<&str>,
    ) -> AppResult<T> {
        let url = self.endpoint_url(endpoint)?;
        let mut request = self.http.get(url);
        if let Some(access_token) = access_token {
            request = request.bearer_auth(access_token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_api_error(status, &body))
    }

    fn endpoint_url(&self, endpoint: &str) -> AppResult<Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join(endpoint.trim_start_matches('/'))?)
    }
}

impl UserApiClient for OnyxiaApiClient {
    async fn get_user(&self, access_token: &str) -> AppResult<User> {
        self.get_json(USER_INFO_ENDPOINT, Some(access_token)).await
    }
}

impl OidcParamsApiClient for OnyxiaApiClient {
    async fn get_oidc_params(&self) -> AppResult<OidcParams> {
        self.get_json(OIDC_PARAMS_ENDPOINT, None).await
    }
}

#[derive(Debug, Deserialize)]
struct OnyxiaApiError {
    message: Option<String>,
    error: Option<String>,
    status: Option<u16>,
}

fn map_api_error(status: StatusCode, body: &str) -> AppError {
    let message = parse_api_error_message(body).unwrap_or_else(|| match body.trim() {
        "" => "no error details in response body".to_string(),
        body => body.to_string(),
    });

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return AppError::Auth(format!(
            "onyxia api authorization failed ({status}): {message}. run `onyxia auth login`"
        ));
    }

    AppError::Api(format!("onyxia api request failed ({status}): {message}"))
}

fn parse_api_error_message(body: &str) -> Option<String> {
    let payload = serde_json::from_str::<OnyxiaApiError>(body).ok()?;
    let parts = [
        payload.message,
        payload.error.map(|error| format!("error={error}")),
        payload.status.map(|status| format!("status={status}")),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();

    if parts.is_empty() {
        return None;
    }

    Some(parts.join(", "))
}
