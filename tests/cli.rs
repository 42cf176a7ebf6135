use clap::Parser;
use onyxia::auth::RedirectTarget;
use onyxia::cli::{AuthCommand, Cli, Command};

#[test]
fn parses_auth_login() {
    let cli = Cli::try_parse_from(["onyxia", "auth", "login"]).expect("cli parse should work");
    match cli.command {
        Command::Auth(auth) => assert!(matches!(auth.command, AuthCommand::Login)),
        _ => panic!("expected auth command"),
    }
}

#[test]
fn logout_defaults_to_home() {
    let cli = Cli::try_parse_from(["onyxia", "auth", "logout"]).expect("cli parse should work");
    match cli.command {
        Command::Auth(auth) => match auth.command {
            AuthCommand::Logout(args) => assert_eq!(args.redirect_to, RedirectTarget::Home),
            other => panic!("expected logout, got {other:?}"),
        },
        _ => panic!("expected auth command"),
    }
}

#[test]
fn parses_logout_to_current_page() {
    let cli = Cli::try_parse_from([
        "onyxia",
        "auth",
        "logout",
        "--redirect-to",
        "current-page",
    ])
    .expect("cli parse should work");
    match cli.command {
        Command::Auth(auth) => match auth.command {
            AuthCommand::Logout(args) => {
                assert_eq!(args.redirect_to, RedirectTarget::CurrentPage)
            }
            other => panic!("expected logout, got {other:?}"),
        },
        _ => panic!("expected auth command"),
    }
}

#[test]
fn parses_fresh_token_with_global_flags() {
    let cli = Cli::try_parse_from([
        "onyxia", "auth", "token", "--fresh", "--profile", "staging", "--json", "-vv",
    ])
    .expect("cli parse should work");
    assert_eq!(cli.profile, "staging");
    assert!(cli.json);
    assert_eq!(cli.verbose, 2);
    match cli.command {
        Command::Auth(auth) => match auth.command {
            AuthCommand::Token(args) => assert!(args.fresh),
            other => panic!("expected token, got {other:?}"),
        },
        _ => panic!("expected auth command"),
    }
}

#[test]
fn parses_account_language() {
    let cli =
        Cli::try_parse_from(["onyxia", "account", "--lang", "fr"]).expect("cli parse should work");
    match cli.command {
        Command::Account(args) => assert_eq!(args.lang.as_deref(), Some("fr")),
        _ => panic!("expected account command"),
    }
}

#[test]
fn parses_watch_and_whoami() {
    let watch = Cli::try_parse_from(["onyxia", "watch"]).expect("cli parse should work");
    assert!(matches!(watch.command, Command::Watch));

    let whoami = Cli::try_parse_from(["onyxia", "whoami"]).expect("cli parse should work");
    assert!(matches!(whoami.command, Command::Whoami));
}
