use anyhow::Context;
use clap::Parser;
use rendezvous_server::tasks::{SweeperConfig, start_room_sweeper};
use rendezvous_server::{
    AppState, Config, ConnectionRegistry, Coordinator, DurableRoomStore, EventBusTransport,
    MemoryRoomStore, RoomStore, SignalTransport, SocketTransport, StorageBackend, TransportKind,
    build_routes,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "rendezvous-server", about = "Room-based signaling coordination server")]
struct Cli {
    /// Address to listen on; overrides BIND_ADDRESS.
    #[arg(long)]
    bind: Option<String>,

    /// Directory for durable room records; overrides STORAGE_DIR.
    #[arg(long)]
    storage_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }
    if let Some(dir) = cli.storage_dir {
        config.storage_dir = dir;
    }
    info!("Starting with {:?}", config);

    let store: Arc<dyn RoomStore> = match config.storage_backend {
        StorageBackend::Memory => Arc::new(MemoryRoomStore::new()),
        StorageBackend::Durable => Arc::new(
            DurableRoomStore::open(config.storage_dir.clone())
                .await
                .with_context(|| format!("cannot open {}", config.storage_dir.display()))?,
        ),
    };

    let (transport, registry) = match config.transport {
        TransportKind::Socket => adapter_pair(Arc::new(SocketTransport::new())),
        TransportKind::EventBus => adapter_pair(Arc::new(EventBusTransport::default())),
    };

    let coordinator =
        Arc::new(Coordinator::new(store, transport).with_join_policy(config.join_policy));
    coordinator
        .reclaim_stale_seats()
        .await
        .context("cannot reclaim seats from a previous run")?;

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(start_room_sweeper(
        Arc::clone(&coordinator),
        SweeperConfig {
            interval: config.sweep_interval,
            max_idle: config.room_idle,
        },
        shutdown.clone(),
    ));

    let app = build_routes(AppState {
        coordinator,
        registry,
        dispatch_timeout: config.dispatch_timeout,
    });

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("cannot bind {}", config.bind_address))?;
    info!("Rendezvous server listening on {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown requested");
                shutdown.cancel();
            }
        })
        .await
        .context("server error")?;

    shutdown.cancel();
    let _ = sweeper.await;
    Ok(())
}

fn adapter_pair<T>(adapter: Arc<T>) -> (Arc<dyn SignalTransport>, Arc<dyn ConnectionRegistry>)
where
    T: SignalTransport + ConnectionRegistry + 'static,
{
    (adapter.clone(), adapter)
}
