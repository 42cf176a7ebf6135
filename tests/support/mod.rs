#![allow(dead_code)]

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tokio::sync::Semaphore;
use url::Url;

use onyxia::api::{OidcParams, OidcParamsApiClient, RealmParams, TermsOfServices, User, UserApiClient};
use onyxia::auth::clock::Clock;
use onyxia::auth::provider::{CheckSessionParams, RedirectParams};
use onyxia::auth::{IdentityProvider, Locations, TokenClock};
use onyxia::error::{AppError, AppResult};

pub const BASE_EPOCH_MS: i64 = 1_700_000_000_000;

/// Epoch clock that follows tokio's (pausable) time.
pub struct VirtualClock {
    started: tokio::time::Instant,
}

impl Clock for VirtualClock {
    fn now_epoch_ms(&self) -> i64 {
        BASE_EPOCH_MS + self.started.elapsed().as_millis() as i64
    }
}

pub fn token_clock() -> TokenClock {
    TokenClock::new(
        Arc::new(VirtualClock {
            started: tokio::time::Instant::now(),
        }),
        Duration::from_secs(25),
    )
}

/// Unsigned JWT whose `exp` lies `expires_in_ms` after `BASE_EPOCH_MS`.
pub fn jwt_expiring_in(expires_in_ms: i64) -> String {
    let exp = (BASE_EPOCH_MS + expires_in_ms) / 1000;
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp},"sub":"jdoe"}}"#))
    )
}

/// Lets every ready task run before virtual time moves on.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn locations() -> Locations {
    Locations {
        current_page: Url::parse("https://datalab.example.org/my-services").expect("url"),
        home: Url::parse("https://datalab.example.org/").expect("url"),
        silent_callback: Url::parse("https://datalab.example.org/silent-sso.html").expect("url"),
    }
}

#[derive(Default)]
pub struct Recorder {
    pub authenticated: bool,
    pub fail_check: bool,
    pub token: Mutex<Option<String>>,
    pub refresh_results: Mutex<VecDeque<Result<String, String>>>,
    pub hold_refresh: Option<Semaphore>,
    pub refresh_calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub silent_callbacks: Mutex<Vec<Url>>,
    pub return_urls: Mutex<Vec<Url>>,
}

impl Recorder {
    pub fn logged_in(token: String) -> Self {
        Self {
            authenticated: true,
            token: Mutex::new(Some(token)),
            ..Self::default()
        }
    }

    pub fn logged_out() -> Self {
        Self::default()
    }

    pub fn holding_refreshes(mut self) -> Self {
        self.hold_refresh = Some(Semaphore::new(0));
        self
    }

    pub fn script_refresh(&self, result: Result<String, String>) {
        self.refresh_results.lock().unwrap().push_back(result);
    }

    pub fn release_refresh(&self) {
        if let Some(hold) = &self.hold_refresh {
            hold.add_permits(1);
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

pub struct FakeProvider {
    pub recorder: Arc<Recorder>,
}

impl FakeProvider {
    pub fn new(recorder: Recorder) -> (Self, Arc<Recorder>) {
        let recorder = Arc::new(recorder);
        (
            Self {
                recorder: Arc::clone(&recorder),
            },
            recorder,
        )
    }
}

impl IdentityProvider for FakeProvider {
    async fn check_session(&self, params: &CheckSessionParams) -> AppResult<bool> {
        self.recorder
            .silent_callbacks
            .lock()
            .unwrap()
            .push(params.silent_callback_url.clone());
        if self.recorder.fail_check {
            return Err(AppError::Auth("identity provider unreachable".to_string()));
        }
        Ok(self.recorder.authenticated)
    }

    async fn refresh_token(&self, _min_validity_secs: i64) -> AppResult<String> {
        let recorder = &self.recorder;
        recorder.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = recorder.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        recorder.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if let Some(hold) = &recorder.hold_refresh {
            hold.acquire().await.expect("hold semaphore open").forget();
        }

        let result = recorder
            .refresh_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted refresh".to_string()));
        recorder.in_flight.fetch_sub(1, Ordering::SeqCst);

        let token = result.map_err(AppError::Auth)?;
        *recorder.token.lock().unwrap() = Some(token.clone());
        Ok(token)
    }

    async fn redirect_to_login(&self, params: RedirectParams) -> AppResult<Infallible> {
        self.recorder.login_calls.fetch_add(1, Ordering::SeqCst);
        self.recorder.return_urls.lock().unwrap().push(params.return_url);
        std::future::pending().await
    }

    async fn redirect_to_logout(&self, params: RedirectParams) -> AppResult<Infallible> {
        self.recorder.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.recorder.return_urls.lock().unwrap().push(params.return_url);
        std::future::pending().await
    }

    fn token(&self) -> Option<String> {
        self.recorder.token.lock().unwrap().clone()
    }
}

pub fn jdoe() -> User {
    User {
        username: "jdoe".to_string(),
        email: "jdoe@example.org".to_string(),
        first_name: Some("John".to_string()),
        family_name: Some("Doe".to_string()),
        groups: vec!["sspcloud-admins".to_string()],
        locale: Some("fr".to_string()),
    }
}

#[derive(Default)]
pub struct FakeUsers {
    pub calls: AtomicUsize,
    pub tokens_seen: Mutex<Vec<String>>,
}

impl UserApiClient for FakeUsers {
    async fn get_user(&self, access_token: &str) -> AppResult<User> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen
            .lock()
            .unwrap()
            .push(access_token.to_string());
        tokio::task::yield_now().await;
        Ok(jdoe())
    }
}

#[derive(Default)]
pub struct FakeOidcParams {
    pub params: OidcParams,
    pub calls: AtomicUsize,
}

impl FakeOidcParams {
    pub fn keycloak(url: &str, realm: &str, terms: Option<TermsOfServices>) -> Self {
        Self {
            params: OidcParams {
                keycloak_params: Some(RealmParams {
                    url: url.to_string(),
                    realm: realm.to_string(),
                    client_id: Some("onyxia".to_string()),
                    terms_of_services: terms,
                }),
            },
            calls: AtomicUsize::new(0),
        }
    }
}

impl OidcParamsApiClient for FakeOidcParams {
    async fn get_oidc_params(&self) -> AppResult<OidcParams> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(self.params.clone())
    }
}
