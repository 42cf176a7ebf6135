use std::future::Future;

use crate::error::AppResult;

use super::models::{OidcParams, User};

/// User directory. Only called with the token of an authenticated session.
pub trait UserApiClient: Send + Sync {
    fn get_user(&self, access_token: &str) -> impl Future<Output = AppResult<User>> + Send;
}

/// Public identity-provider parameters published by the platform.
pub trait OidcParamsApiClient: Send + Sync {
    fn get_oidc_params(&self) -> impl Future<Output = AppResult<OidcParams>> + Send;
}
