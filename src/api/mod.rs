pub mod client;
pub mod models;
pub mod ports;

pub use client::OnyxiaApiClient;
pub use models::{OidcParams, RealmParams, TermsOfServices, User};
pub use ports::{OidcParamsApiClient, UserApiClient};
