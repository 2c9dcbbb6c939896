use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use docvan::config::{self, AppConfig};
use docvan::proxy::{self, ProxyContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config_path = config::config_path();
    let config = AppConfig::load(&config_path);
    tracing::info!(
        config = %config_path.display(),
        port = config.proxy.port,
        "starting docvan synthesis proxy"
    );

    let ctx = Arc::new(ProxyContext::new(&config.proxy));
    proxy::serve(ctx, config.proxy.port).await?;
    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docvan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
