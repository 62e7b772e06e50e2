use crate::session::{WalletSession, WalletSessionError};
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use postboard_common::{model::post::PostId, wallet::WalletError};
use postboard_store::{
    repository::{PostRepository, RepositoryError},
    store::PostStore,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{error, warn};

mod json;
mod routes;
#[cfg(test)]
mod tests;

pub type Repository = PostRepository<Box<dyn PostStore + Send>>;
pub type SharedRepository = Arc<Mutex<Repository>>;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub repository: SharedRepository,
    pub wallet: Arc<WalletSession>,
}

impl ServerState {
    #[must_use]
    pub fn new(repository: Repository, wallet: WalletSession) -> Self {
        Self {
            repository: Arc::new(Mutex::new(repository)),
            wallet: Arc::new(wallet),
        }
    }
}

/// Every repository call is synchronous, so the guard must never be held
/// across an `.await`.
pub(crate) fn lock(repository: &SharedRepository) -> MutexGuard<'_, Repository> {
    repository.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(PostId),
    #[error(transparent)]
    Wallet(#[from] WalletSessionError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::JsonRejection(_) => StatusCode::BAD_REQUEST,
            ServerError::Repository(RepositoryError::InvalidDraft(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServerError::Repository(RepositoryError::EditUnimplemented(_)) => {
                StatusCode::NOT_IMPLEMENTED
            }
            ServerError::JsonResponse(_)
            | ServerError::Repository(
                RepositoryError::Store(_) | RepositoryError::Model(_) | RepositoryError::Id(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Wallet(WalletSessionError::Wallet(WalletError::Declined)) => {
                StatusCode::FORBIDDEN
            }
            ServerError::Wallet(WalletSessionError::Wallet(WalletError::Provider(_))) => {
                StatusCode::BAD_GATEWAY
            }
            ServerError::Wallet(WalletSessionError::TimedOut(_)) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
        } else {
            warn!(error = %self, %status, "Rejecting request");
        }

        let error_response = ErrorResponse {
            status: status.as_u16(),
            message: self.to_string(),
        };
        json::reply(status, &error_response)
    }
}
