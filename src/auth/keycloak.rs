use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time;
use url::Url;

use crate::config::Settings;
use crate::error::{AppError, AppResult};

use super::provider::{self, CheckSessionParams, IdentityProvider, RedirectParams};
use super::token::TokenSet;
use super::token_store::TokenStore;

const LOGIN_CALLBACK_TIMEOUT_SECS: u64 = 180;
const OIDC_SCOPES: &str = "openid profile email";

#[derive(Debug, Clone)]
pub struct KeycloakParams {
    pub url: String,
    pub realm: String,
    pub client_id: String,
    pub language: Option<String>,
    pub http_timeout: Duration,
}

impl KeycloakParams {
    pub fn from_settings(settings: &Settings) -> AppResult<Self> {
        Ok(Self {
            url: settings.keycloak_url()?.to_string(),
            realm: settings.realm()?.to_string(),
            client_id: settings.client_id()?.to_string(),
            language: settings.language().map(ToOwned::to_owned),
            http_timeout: settings.http_timeout(),
        })
    }

    fn endpoint(&self, name: &str) -> AppResult<Url> {
        Ok(Url::parse(&format!(
            "{}/auth/realms/{}/protocol/openid-connect/{name}",
            self.url.trim_end_matches('/'),
            self.realm.trim_matches('/'),
        ))?)
    }
}

pub struct KeycloakProvider<S: TokenStore> {
    params: KeycloakParams,
    profile: String,
    store: S,
    http: reqwest::Client,
    tokens: RwLock<Option<TokenSet>>,
    callback_url: RwLock<Option<Url>>,
}

impl<S: TokenStore> KeycloakProvider<S> {
    pub fn new(params: KeycloakParams, profile: &str, store: S) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(params.http_timeout)
            .build()?;

        Ok(Self {
            params,
            profile: profile.to_string(),
            store,
            http,
            tokens: RwLock::new(None),
            callback_url: RwLock::new(None),
        })
    }

    fn current(&self) -> Option<TokenSet> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, tokens: Option<TokenSet>) -> AppResult<()> {
        match &tokens {
            Some(tokens) => self.store.save(&self.profile, tokens)?,
            None => self.store.clear(&self.profile)?,
        }
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = tokens;
        Ok(())
    }

    fn login_callback_url(&self) -> AppResult<Url> {
        self.callback_url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| AppError::Config("no login callback location configured".to_string()))
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> AppResult<TokenSet> {
        let form = HashMap::from([
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.params.client_id.as_str()),
        ]);

        let response = self
            .http
            .post(self.params.endpoint("token")?)
            .form(&form)
            .send()
            .await?;

        let mut tokens = parse_token_response(response).await?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        Ok(tokens)
    }

    async fn exchange_auth_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &Url,
    ) -> AppResult<TokenSet> {
        let form = HashMap::from([
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.params.client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("code_verifier", code_verifier),
        ]);

        let response = self
            .http
            .post(self.params.endpoint("token")?)
            .form(&form)
            .send()
            .await?;

        parse_token_response(response).await
    }

    async fn end_remote_session(&self, refresh_token: &str) -> AppResult<()> {
        let form = HashMap::from([
            ("client_id", self.params.client_id.as_str()),
            ("refresh_token", refresh_token),
        ]);

        let response = self
            .http
            .post(self.params.endpoint("logout")?)
            .form(&form)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(AppError::Auth(format!(
            "logout endpoint returned {}",
            response.status()
        )))
    }
}

impl<S: TokenStore> IdentityProvider for KeycloakProvider<S> {
    async fn check_session(&self, params: &CheckSessionParams) -> AppResult<bool> {
        *self
            .callback_url
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(params.silent_callback_url.clone());

        let Some(stored) = self.store.load(&self.profile)? else {
            return Ok(false);
        };
        let Some(refresh_token) = stored.refresh_token.as_deref() else {
            self.replace(None)?;
            return Ok(false);
        };

        match self.exchange_refresh_token(refresh_token).await {
            Ok(tokens) => {
                self.replace(Some(tokens))?;
                Ok(true)
            }
            Err(rejected @ AppError::OAuth { .. }) => {
                tracing::info!(reason = %rejected, "stored session rejected by identity provider");
                self.replace(None)?;
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn refresh_token(&self, min_validity_secs: i64) -> AppResult<String> {
        let current = self
            .current()
            .ok_or_else(|| AppError::Auth("no active session to refresh".to_string()))?;

        if let Ok(min_validity) = u64::try_from(min_validity_secs) {
            if current.is_valid_for(min_validity, SystemTime::now()) {
                return Ok(current.access_token);
            }
        }

        let refresh_token = current.refresh_token.as_deref().ok_or_else(|| {
            AppError::Auth("access token expired and no refresh token is held".to_string())
        })?;

        let refreshed = self.exchange_refresh_token(refresh_token).await?;
        let access_token = refreshed.access_token.clone();
        self.replace(Some(refreshed))?;
        Ok(access_token)
    }

    async fn redirect_to_login(&self, params: RedirectParams) -> AppResult<Infallible> {
        let redirect_uri = self.login_callback_url()?;
        let flow = LoginFlow::new(&self.params, &redirect_uri)?;

        if !open_browser(flow.authorization_url.as_str()) {
            eprintln!(
                "open this URL in your browser to continue login:\n{}",
                flow.authorization_url
            );
        }

        let code = wait_for_auth_callback(
            &redirect_uri,
            &flow.state,
            Duration::from_secs(LOGIN_CALLBACK_TIMEOUT_SECS),
        )
        .await?;

        let tokens = self
            .exchange_auth_code(&code, &flow.code_verifier, &redirect_uri)
            .await?;
        self.replace(Some(tokens))?;

        provider::navigate_away(&params.return_url)
    }

    async fn redirect_to_logout(&self, params: RedirectParams) -> AppResult<Infallible> {
        if let Some(refresh_token) = self.current().and_then(|tokens| tokens.refresh_token) {
            if let Err(err) = self.end_remote_session(&refresh_token).await {
                tracing::warn!(err = %err, "remote logout failed, clearing local session only");
            }
        }
        self.replace(None)?;

        provider::navigate_away(&params.return_url)
    }

    fn token(&self) -> Option<String> {
        self.current().map(|tokens| tokens.access_token)
    }
}

#[derive(Debug)]
struct LoginFlow {
    authorization_url: Url,
    code_verifier: String,
    state: String,
}

impl LoginFlow {
    fn new(params: &KeycloakParams, redirect_uri: &Url) -> AppResult<Self> {
        let state = random_token(32);
        let code_verifier = random_token(64);
        let code_challenge = pkce_challenge(&code_verifier);

        let mut url = params.endpoint("auth")?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &params.client_id)
            .append_pair("redirect_uri", redirect_uri.as_str())
            .append_pair("scope", OIDC_SCOPES)
            .append_pair("state", &state)
            .append_pair("code_challenge", &code_challenge)
            .append_pair("code_challenge_method", "S256");

        Ok(Self {
            authorization_url: transform_url_before_redirect_to_login(
                url,
                params.language.as_deref(),
            ),
            code_verifier,
            state,
        })
    }
}

fn transform_url_before_redirect_to_login(mut url: Url, language: Option<&str>) -> Url {
    if let Some(language) = language {
        url.query_pairs_mut().append_pair("ui_locales", language);
    }
    url
}

#[derive(Debug, Deserialize)]
struct OidcTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    id_token: Option<String>,
    expires_in: Option<u64>,
    refresh_expires_in: Option<u64>,
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OidcErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

async fn parse_token_response(response: reqwest::Response) -> AppResult<TokenSet> {
    let status = response.status();
    if status.is_success() {
        let payload: OidcTokenResponse = response.json().await?;
        return Ok(TokenSet {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token,
            id_token: payload.id_token,
            expires_at_unix: expires_at_unix(payload.expires_in),
            refresh_expires_at_unix: expires_at_unix(payload.refresh_expires_in),
            scope: payload.scope,
        });
    }

    let body = response.text().await?;
    Err(map_token_error(status, &body))
}

fn map_token_error(status: reqwest::StatusCode, body: &str) -> AppError {
    if status.is_client_error() {
        if let Ok(OidcErrorResponse {
            error: Some(error),
            error_description,
        }) = serde_json::from_str::<OidcErrorResponse>(body)
        {
            return AppError::OAuth {
                status: status.as_u16(),
                error,
                description: error_description.unwrap_or_else(|| "no description".to_string()),
            };
        }
    }

    AppError::Api(format!(
        "token endpoint returned {status}: {}",
        body.trim().chars().take(200).collect::<String>()
    ))
}

fn expires_at_unix(expires_in: Option<u64>) -> Option<u64> {
    let expires_in = expires_in?;
    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some(now.saturating_add(expires_in))
}

async fn wait_for_auth_callback(
    redirect_uri: &Url,
    expected_state: &str,
    timeout: Duration,
) -> AppResult<String> {
    if redirect_uri.scheme() != "http" {
        return Err(AppError::Config(
            "login callback must use http for local capture".to_string(),
        ));
    }

    let host = redirect_uri
        .host_str()
        .ok_or_else(|| AppError::Config("login callback is missing host".to_string()))?;
    let port = redirect_uri
        .port_or_known_default()
        .ok_or_else(|| AppError::Config("login callback is missing port".to_string()))?;
    let path = redirect_uri.path().to_string();

    let listener = TcpListener::bind((host, port)).await.map_err(|err| {
        AppError::Auth(format!(
            "failed to bind login callback listener on {host}:{port}: {err}"
        ))
    })?;

    time::timeout(
        timeout,
        accept_callback(&listener, &path, expected_state),
    )
    .await
    .map_err(|_| AppError::Auth("timed out waiting for login callback".to_string()))?
}

async fn accept_callback(
    listener: &TcpListener,
    expected_path: &str,
    expected_state: &str,
) -> AppResult<String> {
    let (mut stream, _) = listener.accept().await?;

    let mut buf = vec![0_u8; 8192];
    let size = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..size]);
    let request_line = request.lines().next().unwrap_or_default();

    let mut parts = request_line.split_whitespace();
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        let _ = write_callback_response(
            &mut stream,
            "405 Method Not Allowed",
            "login callback only accepts GET requests",
        )
        .await;
        return Err(AppError::Auth(
            "malformed login callback request".to_string(),
        ));
    };

    match extract_callback_code(target, expected_path, expected_state) {
        Ok(code) => {
            write_callback_response(
                &mut stream,
                "200 OK",
                "onyxia login complete. you can return to the terminal.",
            )
            .await?;
            Ok(code)
        }
        Err(err) => {
            let _ = write_callback_response(
                &mut stream,
                "400 Bad Request",
                &format!("login callback error: {err}"),
            )
            .await;
            Err(err)
        }
    }
}

fn extract_callback_code(
    target: &str,
    expected_path: &str,
    expected_state: &str,
) -> AppResult<String> {
    let callback_url = Url::parse(&format!("http://localhost{target}"))?;
    if callback_url.path() != expected_path {
        return Err(AppError::Auth(format!(
            "login callback path mismatch: expected {expected_path}, got {}",
            callback_url.path()
        )));
    }

    let query: HashMap<String, String> = callback_url.query_pairs().into_owned().collect();

    if let Some(error) = query.get("error") {
        let description = query
            .get("error_description")
            .map(String::as_str)
            .unwrap_or("no description");
        return Err(AppError::Auth(format!(
            "authorization failed: {error} ({description})"
        )));
    }

    match query.get("state") {
        Some(state) if state == expected_state => {}
        Some(_) => {
            return Err(AppError::Auth(
                "login state mismatch; aborting login".to_string(),
            ));
        }
        None => {
            return Err(AppError::Auth(
                "login callback missing state parameter".to_string(),
            ));
        }
    }

    query
        .get("code")
        .cloned()
        .ok_or_else(|| AppError::Auth("login callback missing code parameter".to_string()))
}

async fn write_callback_response(
    stream: &mut tokio::net::TcpStream,
    status: &str,
    message: &str,
) -> AppResult<()> {
    let body = format!(
        "<!doctype html><html><body><p>{}</p></body></html>",
        html_escape::encode_safe(message)
    );

    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0_u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn open_browser(url: &str) -> bool {
    #[cfg(target_os = "macos")]
    let mut command = std::process::Command::new("open");
    #[cfg(target_os = "linux")]
    let mut command = std::process::Command::new("xdg-open");
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut command = std::process::Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    };

    #[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
    {
        command
            .arg(url)
            .status()
            .is_ok_and(|status| status.success())
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        let _ = url;
        false
    }
}
