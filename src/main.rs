use urlshortener::{config, server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_from_env()?;
    let _telemetry = telemetry::init(&config)?;
    config.print_summary();

    server::run(config).await
}
