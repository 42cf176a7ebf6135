use std::convert::Infallible;

use tokio::sync::OnceCell;

use crate::api::{OidcParamsApiClient, RealmParams, TermsOfServices, User, UserApiClient};
use crate::auth::{IdentityProvider, OidcClient, RedirectTarget};
use crate::error::{AppError, AppResult};

/// Session data derived once the identity handshake is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// `None` when not authenticated.
    pub user: Option<User>,
    pub terms_of_services: Option<TermsOfServices>,
    /// `None` when the platform does not authenticate through Keycloak.
    pub account_management_url: Option<String>,
}

pub struct UserAuthentication<P: IdentityProvider> {
    oidc: OidcClient<P>,
    context: OnceCell<SessionContext>,
}

impl<P: IdentityProvider> UserAuthentication<P> {
    pub fn new(oidc: OidcClient<P>) -> Self {
        Self {
            oidc,
            context: OnceCell::new(),
        }
    }

    pub fn oidc(&self) -> &OidcClient<P> {
        &self.oidc
    }

    /// Fetches the user profile and realm parameters. Runs at most once per
    /// instance; later calls return the cached context.
    pub async fn initialize<U, C>(&self, users: &U, oidc_params: &C) -> AppResult<&SessionContext>
    where
        U: UserApiClient,
        C: OidcParamsApiClient,
    {
        self.context
            .get_or_try_init(|| async {
                let user = match &self.oidc {
                    OidcClient::NotLoggedIn(_) => None,
                    OidcClient::LoggedIn(logged_in) => {
                        Some(users.get_user(&logged_in.access_token()).await?)
                    }
                };

                let params = oidc_params.get_oidc_params().await?;
                let (terms_of_services, account_management_url) = match params.keycloak_params {
                    None => (None, None),
                    Some(RealmParams {
                        url,
                        realm,
                        terms_of_services,
                        ..
                    }) => (
                        terms_of_services,
                        Some(join_account_url(&url, &realm)),
                    ),
                };

                tracing::debug!(
                    authenticated = user.is_some(),
                    "session context initialized"
                );
                Ok::<_, AppError>(SessionContext {
                    user,
                    terms_of_services,
                    account_management_url,
                })
            })
            .await
    }

    fn context(&self) -> AppResult<&SessionContext> {
        self.context
            .get()
            .ok_or_else(|| AppError::precondition("session context not initialized"))
    }

    pub fn get_current_user(&self) -> AppResult<&User> {
        self.context()?
            .user
            .as_ref()
            .ok_or_else(|| AppError::precondition("can't get the user when not authenticated"))
    }

    pub fn is_logged_in(&self) -> bool {
        self.oidc.is_logged_in()
    }

    pub async fn login(&self) -> AppResult<Infallible> {
        match &self.oidc {
            OidcClient::NotLoggedIn(not_logged_in) => not_logged_in.login().await,
            OidcClient::LoggedIn(_) => Err(AppError::precondition("already logged in")),
        }
    }

    pub async fn logout(&self, redirect_to: RedirectTarget) -> AppResult<Infallible> {
        match &self.oidc {
            OidcClient::LoggedIn(logged_in) => logged_in.logout(redirect_to).await,
            OidcClient::NotLoggedIn(_) => {
                Err(AppError::precondition("can't log out when not authenticated"))
            }
        }
    }

    pub fn terms_of_service_content(&self) -> AppResult<Option<&TermsOfServices>> {
        Ok(self.context()?.terms_of_services.as_ref())
    }

    pub fn account_management_url(&self) -> AppResult<Option<&str>> {
        Ok(self.context()?.account_management_url.as_deref())
    }
}

/// `{url}/auth/realms/{realm}/account`, without doubled slashes.
pub fn join_account_url(url: &str, realm: &str) -> String {
    format!(
        "{}/auth/realms/{}/account",
        url.trim_end_matches('/'),
        realm.trim_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_account_url() {
        assert_eq!(
            join_account_url("https://idp.example.org", "myrealm"),
            "https://idp.example.org/auth/realms/myrealm/account"
        );
    }

    #[test]
    fn account_url_collapses_boundary_slashes() {
        assert_eq!(
            join_account_url("https://idp.example.org/", "/myrealm/"),
            "https://idp.example.org/auth/realms/myrealm/account"
        );
    }
}
