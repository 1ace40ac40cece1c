use std::sync::Arc;
use std::time::{Duration, SystemTime};
use telco_collector::carriers::StrategyRegistry;
use telco_collector::config::Config;
use telco_collector::relay::{create_router, AppState, HttpMailbox, MailboxClient, RelayStore};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    match dotenvy::dotenv() {
        Ok(path) => eprintln!("✅ .env loaded from: {:?}", path),
        Err(e) => eprintln!("⚠️  .env not found: {}", e),
    }

    // Logging setup
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,telco_collector=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Carrier collection relay starting...");

    let config = Arc::new(Config::from_env()?);
    tracing::info!("✅ Config loaded");
    tracing::info!("   HTTP Addr: {}", config.http_addr);
    tracing::info!("   WebDriver URL: {}", config.webdriver_url);
    tracing::info!("   Code TTL: {}s", config.code_ttl_secs);
    tracing::info!("   Download Dir: {}", config.download_dir);

    // One code slot per carrier channel, built once
    let store = Arc::new(RelayStore::new(Duration::from_secs(config.code_ttl_secs)));

    let mailbox: Option<Arc<dyn MailboxClient>> = config.mailbox_api_url.clone().map(|url| {
        tracing::info!("✅ Mailbox poller configured: {}", url);
        Arc::new(HttpMailbox::new(url, config.mailbox_api_token.clone())) as Arc<dyn MailboxClient>
    });
    if mailbox.is_none() {
        tracing::warn!("⚠️ MAILBOX_API_URL not set - email 2FA streams disabled");
    }

    // Strategy table is logged at startup so a misconfigured job surfaces
    // before the first webhook arrives
    let registry = StrategyRegistry::new(config.clone());
    let info = registry.bindings_info();
    tracing::info!("✅ Strategy registry built ({} bindings)", info.total);
    for binding in &info.bindings {
        tracing::info!(
            "   {} / {} -> {}",
            binding.carrier,
            binding.scraper_type,
            binding.login_url
        );
    }

    let state = AppState {
        config: config.clone(),
        store,
        mailbox,
        start_time: SystemTime::now(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!("🌐 Relay listening: http://{}", config.http_addr);
    tracing::info!("📋 Endpoints:");
    tracing::info!("   GET  /health");
    tracing::info!("   GET  /status");
    tracing::info!("   POST /{{channel}}/sms");
    tracing::info!("   GET  /{{channel}}/code");
    tracing::info!("   POST /{{channel}}/code/consume");
    tracing::info!("   GET  /api/v1/{{carrier}}?email_alias=...");

    axum::serve(listener, app).await?;

    Ok(())
}
