use crate::{
    server::{ServerError, ServerRouter, SharedRepository, json::Json, lock},
    session::WalletSession,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use postboard_common::model::user::{ActiveUser, ConnectedWalletBadge};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(active_users)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct ActiveUsers {
    authors: Vec<ActiveUser>,
    connected_wallet: Option<ConnectedWalletBadge>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/active", rejection(ServerError))]
struct ActiveUsersPath();

async fn active_users(
    ActiveUsersPath(): ActiveUsersPath,
    State(repository): State<SharedRepository>,
    State(wallet): State<Arc<WalletSession>>,
) -> Json<ActiveUsers> {
    let connected_wallet = wallet.current().await.map(|connected| connected.badge());
    let authors = lock(&repository).active_users();

    Json(ActiveUsers {
        authors,
        connected_wallet,
    })
}
