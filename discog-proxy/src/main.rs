mod catalog;
mod classify;
mod config;
mod detail;
mod dispatch;
mod document;
mod origin;
mod render;
mod resolver;
mod slug;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use catalog::HttpCatalogSource;
use classify::Classifier;
use config::Config;
use detail::HttpDetailSource;
use dispatch::{edge_router, EdgeState};
use origin::HttpOrigin;

#[derive(Parser)]
#[command(name = "discog-proxy")]
struct Args {
    /// Path to the YAML config file.
    #[arg(long, env = "DISCOG_CONFIG")]
    config: PathBuf,

    /// Port to listen on.
    #[arg(long, default_value = "8787", env = "DISCOG_PORT")]
    port: u16,

    /// Address to bind to.
    #[arg(long, default_value = "0.0.0.0", env = "DISCOG_BIND")]
    bind: String,
}

fn configure_logging() {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_target(false)
        .with_file(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() {
    configure_logging();
    let args = Args::parse();

    let config = Config::load(&args.config).unwrap_or_else(|e| {
        error!("failed to load config: {e}");
        std::process::exit(1);
    });

    let classifier = Classifier::new(&config.crawler_signatures).unwrap_or_else(|e| {
        error!("{e}");
        std::process::exit(1);
    });

    let client = reqwest::Client::builder()
        .user_agent(concat!("discog-proxy/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap_or_else(|e| {
            error!("failed to create HTTP client: {e}");
            std::process::exit(1);
        });

    info!(
        "catalog: {}, origin: {}, {} crawler signatures",
        config.catalog_url,
        config.origin_url,
        config.crawler_signatures.len()
    );

    let timeout = config.fetch_timeout();
    let state = Arc::new(EdgeState {
        catalog: Arc::new(HttpCatalogSource::new(
            config.catalog_url.clone(),
            client.clone(),
            timeout,
        )),
        details: Arc::new(HttpDetailSource::new(config.clone(), client.clone())),
        origin: Arc::new(HttpOrigin::new(
            config.origin_url.clone(),
            client,
            timeout,
        )),
        classifier,
        config,
    });

    let app = edge_router(state);
    let addr = format!("{}:{}", args.bind, args.port);

    info!("binding to {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!("failed to bind to {addr}: {e}");
            std::process::exit(1);
        });

    info!("discog-proxy listening on http://{addr}");
    if let Err(e) = axum::serve(listener, app).await {
        error!("server error: {e}");
        std::process::exit(1);
    }
}
