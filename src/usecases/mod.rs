pub mod user_authentication;

pub use user_authentication::{SessionContext, UserAuthentication, join_account_url};
