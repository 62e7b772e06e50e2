use crate::server::ServerRouter;
use axum::Router;

mod posts;
mod users;
mod wallet;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(posts::routes())
        .merge(users::routes())
        .merge(wallet::routes())
}
