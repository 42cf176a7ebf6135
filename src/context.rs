use crate::api::OnyxiaApiClient;
use crate::auth::{
    ActivityGate, FileTokenStore, KeycloakParams, KeycloakProvider, Locations, OidcClient,
    TokenClock,
};
use crate::config::{self, AppPaths, Settings};
use crate::error::AppResult;
use crate::output::Output;
use crate::usecases::UserAuthentication;

pub type Session = UserAuthentication<KeycloakProvider<FileTokenStore>>;

pub struct AppContext {
    pub profile: String,
    pub paths: AppPaths,
    pub settings: Settings,
    pub output: Output,
    pub activity: ActivityGate,
    pub session: Session,
}

impl AppContext {
    /// Boot sequence: silent session check, then the one-time session
    /// context initialization. Any failure here is fatal.
    pub async fn bootstrap(profile: String, json: bool) -> AppResult<Self> {
        let profile = config::resolve_profile(&profile);
        let paths = AppPaths::discover()?;
        let settings = config::load_settings(&paths, &profile)?;

        let provider = KeycloakProvider::new(
            KeycloakParams::from_settings(&settings)?,
            &profile,
            FileTokenStore::new(paths.clone()),
        )?;
        let locations = Locations {
            current_page: settings.current_page()?,
            home: settings.origin()?,
            silent_callback: settings.callback_uri()?,
        };

        let activity = ActivityGate::new();
        let oidc =
            OidcClient::init(provider, locations, TokenClock::system(), activity.clone()).await?;

        let api = OnyxiaApiClient::new(settings.api_url()?, settings.http_timeout())?;
        let session = UserAuthentication::new(oidc);
        session.initialize(&api, &api).await?;

        Ok(Self {
            profile,
            paths,
            settings,
            output: Output::new(json),
            activity,
            session,
        })
    }
}
