use serde::Serialize;

use crate::cli::AccountArgs;
use crate::context::AppContext;
use crate::error::AppResult;

#[derive(Debug, Serialize)]
struct AccountView<'a> {
    account_management_url: Option<&'a str>,
    terms_of_services: Option<&'a str>,
}

pub fn whoami(ctx: &AppContext) -> AppResult<()> {
    let user = ctx.session.get_current_user()?;
    let name = match (user.first_name.as_deref(), user.family_name.as_deref()) {
        (Some(first), Some(family)) => format!("{first} {family} ({})", user.username),
        _ => user.username.clone(),
    };
    ctx.output.emit(&format!("{name} <{}>", user.email), user)
}

pub fn run(ctx: &AppContext, args: AccountArgs) -> AppResult<()> {
    let language = args.lang.as_deref().or(ctx.settings.language());
    let view = AccountView {
        account_management_url: ctx.session.account_management_url()?,
        terms_of_services: ctx
            .session
            .terms_of_service_content()?
            .and_then(|terms| terms.resolve(language)),
    };

    let text = format!(
        "account: {}\nterms of services: {}",
        view.account_management_url.unwrap_or("(not provided)"),
        view.terms_of_services.unwrap_or("(not provided)")
    );
    ctx.output.emit(&text, &view)
}
