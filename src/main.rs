use anyhow::Result;
use tracing_subscriber::EnvFilter;

use speakup::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "speakup=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    speakup::run(config).await
}
