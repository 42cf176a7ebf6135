pub mod activity;
pub mod clock;
pub mod jwt;
pub mod keycloak;
pub mod oidc;
pub mod provider;
pub mod token;
pub mod token_store;

pub use activity::ActivityGate;
pub use clock::TokenClock;
pub use keycloak::{KeycloakParams, KeycloakProvider};
pub use oidc::{LoggedIn, NotLoggedIn, OidcClient, RefreshOutcome};
pub use provider::{IdentityProvider, Locations, RedirectTarget};
pub use token::TokenSet;
pub use token_store::{FileTokenStore, TokenStore};
