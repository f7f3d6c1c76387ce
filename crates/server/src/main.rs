use fake_sso::AppResources;
use fake_sso::api::start_webserver;
use fake_sso::config::load_config_or_panic;
use fake_sso::oauth2::OAuth2State;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_standard_tracing() {
    let default_directives = "fake_sso=info,tower_http=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    // A missing .env file is fine; variables may come from the real environment.
    dotenvy::dotenv().ok();

    initialize_standard_tracing();

    let config = Arc::new(load_config_or_panic());
    tracing::info!(
        issuer = %config.issuer,
        auth_code_ttl_secs = config.auth_code_ttl_secs,
        access_token_ttl_secs = config.access_token_ttl_secs,
        "Loaded configuration"
    );

    let oauth2_state = OAuth2State::from_config(&config)?;
    let resources = AppResources { config };

    start_webserver(oauth2_state, resources).await?;
    Ok(())
}
