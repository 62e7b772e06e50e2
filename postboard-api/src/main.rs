use postboard_common::wallet::{ConfiguredWallet, NoWallet, Wallet, WalletAddress, WalletConnection};
use postboard_store::{
    repository::{PostRepository, RepositoryError},
    store::{DEFAULT_SLOT, JsonFileStore, PostStore, StoreError},
};
use serde::Deserialize;
use session::WalletSession;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;
mod session;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error opening post store: {0}")]
    Store(#[from] StoreError),
    #[error("Error loading timeline: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    #[serde(default = "default_server_address")]
    server_address: IpAddr,
    #[serde(default = "default_server_port")]
    server_port: u16,
    #[serde(default = "default_data_dir")]
    data_dir: PathBuf,
    #[serde(default = "default_store_slot")]
    store_slot: String,
    wallet_address: Option<WalletAddress>,
    wallet_network: Option<String>,
    wallet_display_name: Option<String>,
    #[serde(default = "default_wallet_timeout_ms")]
    wallet_timeout_ms: u64,
}

fn default_server_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_server_port() -> u16 {
    3000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_store_slot() -> String {
    DEFAULT_SLOT.to_owned()
}

#[allow(clippy::cast_possible_truncation)]
fn default_wallet_timeout_ms() -> u64 {
    session::DEFAULT_WALLET_TIMEOUT.as_millis() as u64
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "postboard_api=debug,\
                postboard_store=debug,\
                postboard_common=debug,\
                tower_http=debug,axum::rejection=trace"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

fn build_wallet(env: &Env) -> Box<dyn Wallet> {
    match &env.wallet_address {
        Some(address) => {
            info!(address = address.get(), "Using configured wallet");
            Box::new(ConfiguredWallet {
                connection: WalletConnection {
                    address: address.clone(),
                    network: env.wallet_network.clone(),
                },
                display_name: env.wallet_display_name.clone(),
            })
        }
        None => {
            if env.wallet_network.is_some() || env.wallet_display_name.is_some() {
                warn!("Wallet settings given without WALLET_ADDRESS, ignoring them");
            }
            Box::new(NoWallet)
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let store = JsonFileStore::open(&env.data_dir, &env.store_slot)?;
    info!(path = %store.path().display(), "Opened post store");
    let store: Box<dyn PostStore + Send> = Box::new(store);
    let repository = PostRepository::initialize(store)?;

    let wallet = WalletSession::new(
        build_wallet(&env),
        Duration::from_millis(env.wallet_timeout_ms),
    );

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes()
        .with_state(server::ServerState::new(repository, wallet))
        .layer(tracing_layer);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
