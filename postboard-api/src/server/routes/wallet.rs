use crate::{
    server::{Result, ServerError, ServerRouter, json::Json},
    session::{ConnectedWallet, WalletSession},
};
use axum::extract::State;
use axum_extra::{
    TypedHeader,
    routing::{RouterExt, TypedPath},
};
use headers::{Host, UserAgent};
use postboard_common::wallet::UnavailableNotice;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const FALLBACK_HOST: &str = "localhost";

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(wallet_status)
        .typed_post(connect_wallet)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct WalletView {
    address: String,
    short_address: String,
    network: Option<String>,
    display_name: Option<String>,
}

impl From<&ConnectedWallet> for WalletView {
    fn from(connected: &ConnectedWallet) -> Self {
        let address = &connected.connection.address;
        Self {
            address: address.get().to_owned(),
            short_address: address.shortened(),
            network: connected.connection.network.clone(),
            display_name: connected.display_name.clone(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct WalletStatus {
    connected: Option<WalletView>,
    author: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ConnectResponse {
    Connected { wallet: WalletView },
    Unavailable { notice: UnavailableNotice },
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/wallet", rejection(ServerError))]
struct WalletPath();

async fn wallet_status(
    WalletPath(): WalletPath,
    State(wallet): State<Arc<WalletSession>>,
) -> Json<WalletStatus> {
    let connected = wallet.current().await;

    Json(WalletStatus {
        author: wallet.author().await.into_inner(),
        connected: connected.as_ref().map(WalletView::from),
    })
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/wallet/connect", rejection(ServerError))]
struct ConnectWalletPath();

async fn connect_wallet(
    ConnectWalletPath(): ConnectWalletPath,
    State(wallet): State<Arc<WalletSession>>,
    user_agent: Option<TypedHeader<UserAgent>>,
    host: Option<TypedHeader<Host>>,
) -> Result<Json<ConnectResponse>> {
    let response = match wallet.connect().await? {
        Some(connected) => ConnectResponse::Connected {
            wallet: WalletView::from(&connected),
        },
        None => {
            let host = host.as_ref().map_or(FALLBACK_HOST, |TypedHeader(host)| host.hostname());
            let user_agent = user_agent.as_ref().map(|TypedHeader(agent)| agent.as_str());

            ConnectResponse::Unavailable {
                notice: UnavailableNotice::for_client(user_agent, host),
            }
        }
    };

    Ok(Json(response))
}
