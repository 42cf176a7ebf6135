use std::future::Future;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use crate::auth::{ActivityGate, OidcClient, jwt};
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::output::Output;

#[derive(Debug, Serialize)]
struct Renewal {
    expires_at_epoch_ms: i64,
}

pub async fn run(ctx: &AppContext) -> AppResult<()> {
    let OidcClient::LoggedIn(logged_in) = ctx.session.oidc() else {
        return Err(AppError::InvalidInput(
            "not logged in. run `onyxia auth login`".to_string(),
        ));
    };

    eprintln!("session active; press enter to signal activity, ctrl-c to stop");
    keep_alive(
        BufReader::new(tokio::io::stdin()),
        logged_in.subscribe(),
        &ctx.activity,
        &ctx.output,
        tokio::signal::ctrl_c(),
    )
    .await
}

/// Forwards input lines to the activity gate and reports renewals until the
/// input ends or `shutdown` resolves.
async fn keep_alive<R, F>(
    input: R,
    mut renewals: watch::Receiver<String>,
    activity: &ActivityGate,
    output: &Output,
    shutdown: F,
) -> AppResult<()>
where
    R: AsyncBufRead + Unpin,
    F: Future,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => return Ok(()),
            line = lines.next_line() => match line? {
                Some(_) => activity.raise(),
                None => return Ok(()),
            },
            changed = renewals.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let token = renewals.borrow_and_update().clone();
                let renewal = Renewal {
                    expires_at_epoch_ms: jwt::decode(&token)?.expires_at_epoch_ms,
                };
                output.emit(
                    &format!("access token renewed, expires at {} ms", renewal.expires_at_epoch_ms),
                    &renewal,
                )?;
            }
        }
    }
}
