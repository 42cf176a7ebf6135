use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::error::{AppError, AppResult};

use super::activity::ActivityGate;
use super::clock::TokenClock;
use super::jwt;
use super::provider::{
    CheckSessionParams, FORCE_REFRESH, IdentityProvider, Locations, RedirectParams,
    RedirectTarget,
};

/// Result of a single-flight refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// This caller performed the network refresh.
    Refreshed,
    /// Another caller refreshed while this one waited; no request was sent.
    Joined,
}

pub enum OidcClient<P: IdentityProvider> {
    NotLoggedIn(NotLoggedIn<P>),
    LoggedIn(LoggedIn<P>),
}

pub struct NotLoggedIn<P: IdentityProvider> {
    provider: Arc<P>,
    locations: Locations,
}

pub struct LoggedIn<P: IdentityProvider> {
    session: Arc<TokenSession<P>>,
    renewal: JoinHandle<()>,
}

struct TokenSession<P: IdentityProvider> {
    provider: Arc<P>,
    locations: Locations,
    token: watch::Sender<String>,
    generation: AtomicU64,
    refresh_lock: Mutex<()>,
}

impl<P: IdentityProvider> OidcClient<P> {
    /// Silent session check followed, when authenticated, by the start of
    /// the renewal loop. Failures of the check are fatal to boot.
    pub async fn init(
        provider: P,
        locations: Locations,
        clock: TokenClock,
        activity: ActivityGate,
    ) -> AppResult<Self> {
        let provider = Arc::new(provider);
        let params = CheckSessionParams {
            silent_callback_url: locations.silent_callback.clone(),
        };

        if !provider.check_session(&params).await? {
            tracing::info!("no identity provider session");
            return Ok(Self::NotLoggedIn(NotLoggedIn {
                provider,
                locations,
            }));
        }

        let token = provider.token().ok_or_else(|| {
            AppError::Auth("identity provider reported a session without a token".to_string())
        })?;
        let (token, _) = watch::channel(token);
        let session = Arc::new(TokenSession {
            provider,
            locations,
            token,
            generation: AtomicU64::new(0),
            refresh_lock: Mutex::new(()),
        });

        let renewal = tokio::spawn(renew_forever(Arc::clone(&session), clock, activity));
        tracing::info!("identity provider session established");

        Ok(Self::LoggedIn(LoggedIn { session, renewal }))
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn(_))
    }

    pub fn access_token(&self) -> Option<String> {
        match self {
            Self::NotLoggedIn(_) => None,
            Self::LoggedIn(logged_in) => Some(logged_in.access_token()),
        }
    }
}

impl<P: IdentityProvider> NotLoggedIn<P> {
    pub async fn login(&self) -> AppResult<Infallible> {
        self.provider
            .redirect_to_login(RedirectParams {
                return_url: self.locations.current_page.clone(),
            })
            .await
    }
}

impl<P: IdentityProvider> LoggedIn<P> {
    pub fn access_token(&self) -> String {
        self.session.token.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.session.token.subscribe()
    }

    pub async fn logout(&self, redirect_to: RedirectTarget) -> AppResult<Infallible> {
        let return_url = self.session.locations.resolve(redirect_to).clone();
        self.session
            .provider
            .redirect_to_logout(RedirectParams { return_url })
            .await
    }

    /// Forces a network refresh, sharing the result with any refresh already
    /// in flight instead of issuing a second one.
    pub async fn update_token_info(&self) -> AppResult<RefreshOutcome> {
        let seen = self.session.generation();
        self.session.refresh(seen).await
    }

    /// Whether the autonomous renewal loop is still scheduled.
    pub fn is_renewing(&self) -> bool {
        !self.renewal.is_finished()
    }
}

impl<P: IdentityProvider> Drop for LoggedIn<P> {
    fn drop(&mut self) {
        self.renewal.abort();
    }
}

impl<P: IdentityProvider> TokenSession<P> {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    async fn refresh(&self, seen: u64) -> AppResult<RefreshOutcome> {
        let _in_flight = self.refresh_lock.lock().await;
        if self.generation() != seen {
            return Ok(RefreshOutcome::Joined);
        }

        let token = self.provider.refresh_token(FORCE_REFRESH).await?;
        self.token.send_replace(token);
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(RefreshOutcome::Refreshed)
    }

    async fn force_login(&self) {
        tracing::warn!("cannot refresh access token, redirecting to login");
        let params = RedirectParams {
            return_url: self.locations.current_page.clone(),
        };
        match self.provider.redirect_to_login(params).await {
            Ok(never) => match never {},
            Err(err) => tracing::error!(err = %err, "login redirect failed"),
        }
    }
}

async fn renew_forever<P: IdentityProvider>(
    session: Arc<TokenSession<P>>,
    clock: TokenClock,
    activity: ActivityGate,
) {
    loop {
        let seen = session.generation();
        let armed = activity.arm();

        let decoded = jwt::decode(session.token.borrow().as_str());
        let expires_at = match decoded {
            Ok(decoded) => decoded.expires_at_epoch_ms,
            Err(err) => {
                tracing::warn!(err = %err, "cannot schedule renewal of access token");
                session.force_login().await;
                return;
            }
        };

        clock.wait_until_due(expires_at).await;
        tracing::info!(
            margin_secs = clock.margin().as_secs(),
            "access token about to expire, waiting for user activity before renewing"
        );

        armed.wait().await;
        tracing::info!("user activity detected, refreshing access token");

        match session.refresh(seen).await {
            Ok(RefreshOutcome::Refreshed) => tracing::info!("access token refreshed"),
            Ok(RefreshOutcome::Joined) => tracing::debug!("access token already refreshed"),
            Err(err) => {
                tracing::warn!(err = %err, "access token refresh failed");
                session.force_login().await;
                return;
            }
        }
    }
}
