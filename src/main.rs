use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use wisata_rec::{api::create_router, init_tracing, AppState, Config};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (TOML, YAML or JSON); missing files are ignored
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Directory holding the model artifacts
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Load artifacts before accepting requests
    #[arg(long)]
    preload: bool,

    #[arg(short, long)]
    log_level: Option<String>,
}

async fn serve(config: Config) -> Result<()> {
    let addr = config.server.socket_addr()?;
    info!("Starting wisata recommendation server with config: {:?}", config.server);
    info!("Model directory: {}", config.model_dir().display());

    let preload = config.artifacts.preload;
    let state = AppState::new(config);

    if preload {
        match state.recommendation_service.warm_up().await {
            Ok(()) => info!("Model artifacts preloaded"),
            Err(e) => error!("Preload failed, service stays unready: {}", e),
        }
    }

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    let mut config = Config::load(Some(args.config.as_str()))?;
    if let Some(dir) = args.model_dir {
        config.artifacts.model_dir = Some(dir);
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.artifacts.preload |= args.preload;

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers.max(1))
        .enable_all()
        .build()?
        .block_on(serve(config))
}
