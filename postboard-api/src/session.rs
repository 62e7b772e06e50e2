//! The wallet connection of the running instance.
//!
//! Every call into the [`Wallet`] is bounded by a timeout so a stuck provider
//! cannot leave the client "connecting" forever. Name lookups degrade to no
//! name on any failure.

use postboard_common::{
    model::user::{Author, ConnectedWalletBadge},
    wallet::{ConnectionOutcome, Wallet, WalletConnection, WalletError},
};
use std::time::Duration;
use thiserror::Error;
use tokio::{sync::RwLock, time::timeout};
use tracing::{info, warn};

pub const DEFAULT_WALLET_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum WalletSessionError {
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("The wallet did not answer within {0:?}")]
    TimedOut(Duration),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ConnectedWallet {
    pub connection: WalletConnection,
    pub display_name: Option<String>,
}

impl ConnectedWallet {
    #[must_use]
    pub fn author(&self) -> Author {
        Author::resolve(self.display_name.as_deref(), Some(&self.connection.address))
    }

    #[must_use]
    pub fn badge(&self) -> ConnectedWalletBadge {
        ConnectedWalletBadge::new(&self.connection.address, self.display_name.as_deref())
    }
}

pub struct WalletSession {
    wallet: Box<dyn Wallet>,
    timeout: Duration,
    connected: RwLock<Option<ConnectedWallet>>,
}

impl WalletSession {
    #[must_use]
    pub fn new(wallet: Box<dyn Wallet>, timeout: Duration) -> Self {
        Self {
            wallet,
            timeout,
            connected: RwLock::new(None),
        }
    }

    /// Asks the wallet for an account. `Ok(None)` means there is no wallet to
    /// connect to. A failed attempt keeps any earlier connection.
    pub async fn connect(&self) -> Result<Option<ConnectedWallet>, WalletSessionError> {
        let outcome = match timeout(self.timeout, self.wallet.request_connection()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                warn!(error = %err, "Wallet connection failed");
                return Err(err.into());
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Wallet connection timed out");
                return Err(WalletSessionError::TimedOut(self.timeout));
            }
        };

        let connection = match outcome {
            ConnectionOutcome::Connected(connection) => connection,
            ConnectionOutcome::Unavailable => {
                info!("No wallet available to connect to");
                return Ok(None);
            }
        };

        let display_name = self.resolve_display_name(&connection).await;
        let connected = ConnectedWallet {
            connection,
            display_name,
        };
        info!(
            address = connected.connection.address.get(),
            network = connected.connection.network.as_deref(),
            display_name = connected.display_name.as_deref(),
            "Wallet connected"
        );

        *self.connected.write().await = Some(connected.clone());
        Ok(Some(connected))
    }

    async fn resolve_display_name(&self, connection: &WalletConnection) -> Option<String> {
        let lookup = self.wallet.resolve_display_name(&connection.address);

        match timeout(self.timeout, lookup).await {
            Ok(Ok(name)) => name.filter(|name| !name.trim().is_empty()),
            Ok(Err(err)) => {
                warn!(error = %err, "Failed to resolve wallet display name");
                None
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Wallet display name lookup timed out");
                None
            }
        }
    }

    pub async fn current(&self) -> Option<ConnectedWallet> {
        self.connected.read().await.clone()
    }

    /// Who new posts are attributed to right now.
    pub async fn author(&self) -> Author {
        self.current()
            .await
            .map_or_else(Author::anonymous, |connected| connected.author())
    }
}
