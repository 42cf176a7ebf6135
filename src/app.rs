use crate::cli::{Cli, Command};
use crate::commands;
use crate::context::AppContext;
use crate::error::AppResult;

pub async fn run(cli: Cli) -> AppResult<()> {
    let Cli {
        profile,
        json,
        verbose: _,
        command,
    } = cli;

    let ctx = AppContext::bootstrap(profile, json).await?;

    match command {
        Command::Auth(args) => commands::auth::run(&ctx, args.command).await,
        Command::Whoami => commands::account::whoami(&ctx),
        Command::Account(args) => commands::account::run(&ctx, args),
        Command::Watch => commands::watch::run(&ctx).await,
    }
}
