use clap::{ArgAction, Args, Parser, Subcommand};

use crate::auth::RedirectTarget;

#[derive(Debug, Parser)]
#[command(name = "onyxia", version, about = "Onyxia data-science platform portal")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "default",
        help = "Profile name to use"
    )]
    pub profile: String,
    #[arg(long, global = true, help = "Emit JSON output")]
    pub json: bool,
    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Verbose logging")]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Auth(AuthArgs),
    /// Show the authenticated user
    Whoami,
    /// Show identity-provider account page and terms of services
    Account(AccountArgs),
    /// Keep the session alive; every stdin line counts as user activity
    Watch,
}

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    Login,
    Logout(LogoutArgs),
    Status,
    Token(TokenArgs),
}

#[derive(Debug, Args)]
pub struct LogoutArgs {
    #[arg(long, value_enum, default_value = "home", help = "Where to land after logout: home is the origin, current-page is origin + landing_path")]
    pub redirect_to: RedirectTarget,
}

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[arg(long, help = "Force a refresh before printing the token")]
    pub fresh: bool,
}

#[derive(Debug, Args)]
pub struct AccountArgs {
    #[arg(long, help = "Language tag for the terms of services")]
    pub lang: Option<String>,
}
