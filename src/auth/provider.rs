use std::convert::Infallible;
use std::future::Future;

use url::Url;

use crate::error::AppResult;

/// `min_validity_secs` value that always triggers a network refresh.
pub const FORCE_REFRESH: i64 = -1;

#[derive(Debug, Clone)]
pub struct CheckSessionParams {
    pub silent_callback_url: Url,
}

#[derive(Debug, Clone)]
pub struct RedirectParams {
    pub return_url: Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RedirectTarget {
    CurrentPage,
    Home,
}

/// Where a navigation may return to.
#[derive(Debug, Clone)]
pub struct Locations {
    pub current_page: Url,
    pub home: Url,
    pub silent_callback: Url,
}

impl Locations {
    pub fn resolve(&self, target: RedirectTarget) -> &Url {
        match target {
            RedirectTarget::CurrentPage => &self.current_page,
            RedirectTarget::Home => &self.home,
        }
    }
}

/// Identity provider handshake. Redirects end in a navigation away from the
/// application; their `Ok` type is uninhabited.
pub trait IdentityProvider: Send + Sync + 'static {
    fn check_session(
        &self,
        params: &CheckSessionParams,
    ) -> impl Future<Output = AppResult<bool>> + Send;

    fn refresh_token(&self, min_validity_secs: i64)
    -> impl Future<Output = AppResult<String>> + Send;

    fn redirect_to_login(
        &self,
        params: RedirectParams,
    ) -> impl Future<Output = AppResult<Infallible>> + Send;

    fn redirect_to_logout(
        &self,
        params: RedirectParams,
    ) -> impl Future<Output = AppResult<Infallible>> + Send;

    fn token(&self) -> Option<String>;
}

/// Terminal navigation: the process hands control to `target` and unloads.
pub fn navigate_away(target: &Url) -> ! {
    tracing::info!(%target, "navigating away");
    eprintln!("continue at {target}");
    std::process::exit(0)
}
