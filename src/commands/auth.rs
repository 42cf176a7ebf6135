use serde::Serialize;

use crate::api::User;
use crate::auth::{OidcClient, RefreshOutcome, jwt};
use crate::cli::{AuthCommand, TokenArgs};
use crate::context::AppContext;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct AuthStatus<'a> {
    profile: &'a str,
    logged_in: bool,
    user: Option<&'a User>,
    expires_at_epoch_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
struct TokenView {
    access_token: String,
    expires_at_epoch_ms: i64,
    refreshed: bool,
}

pub async fn run(ctx: &AppContext, command: AuthCommand) -> AppResult<()> {
    match command {
        AuthCommand::Login => match ctx.session.login().await? {},
        AuthCommand::Logout(args) => match ctx.session.logout(args.redirect_to).await? {},
        AuthCommand::Status => status(ctx),
        AuthCommand::Token(args) => token(ctx, args).await,
    }
}

fn status(ctx: &AppContext) -> AppResult<()> {
    if !ctx.session.is_logged_in() {
        let status = AuthStatus {
            profile: &ctx.profile,
            logged_in: false,
            user: None,
            expires_at_epoch_ms: None,
        };
        return ctx
            .output
            .emit(&format!("{}: logged out", ctx.profile), &status);
    }

    let user = ctx.session.get_current_user()?;
    let expires_at_epoch_ms = ctx
        .session
        .oidc()
        .access_token()
        .and_then(|token| jwt::decode(&token).ok())
        .map(|decoded| decoded.expires_at_epoch_ms);

    let status = AuthStatus {
        profile: &ctx.profile,
        logged_in: true,
        user: Some(user),
        expires_at_epoch_ms,
    };
    ctx.output.emit(
        &format!("{}: logged in as {} <{}>", ctx.profile, user.username, user.email),
        &status,
    )
}

async fn token(ctx: &AppContext, args: TokenArgs) -> AppResult<()> {
    let OidcClient::LoggedIn(logged_in) = ctx.session.oidc() else {
        return Err(AppError::InvalidInput(
            "not logged in. run `onyxia auth login`".to_string(),
        ));
    };

    let refreshed = if args.fresh {
        logged_in.update_token_info().await? == RefreshOutcome::Refreshed
    } else {
        false
    };

    let access_token = logged_in.access_token();
    let view = TokenView {
        expires_at_epoch_ms: jwt::decode(&access_token)?.expires_at_epoch_ms,
        access_token,
        refreshed,
    };
    ctx.output.emit(&view.access_token, &view)
}
