//! The wallet capability posts are attributed through.
//!
//! A [`Wallet`] is an opaque external collaborator: it may hand out an
//! address, and it may know a display name for that address. Neither call is
//! allowed to take the timeline down with it.

use async_trait::async_trait;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error as _, Unexpected},
};
use thiserror::Error;

pub const WALLET_ADDRESS_HEX_LEN: usize = 40;
pub const WALLET_APP_DAPP_LINK: &str = "https://metamask.app.link/dapp/";
pub const INSTALL_WALLET_MESSAGE: &str = "Please install MetaMask!";

const MOBILE_USER_AGENT_MARKERS: [&str; 4] = ["iphone", "ipad", "ipod", "android"];

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The wallet address is invalid: {0}")]
pub struct InvalidWalletAddressError(String);

/// A `0x`-prefixed, 20-byte hex account address.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn new(address: String) -> Result<Self, InvalidWalletAddressError> {
        let valid = address
            .strip_prefix("0x")
            .or_else(|| address.strip_prefix("0X"))
            .is_some_and(|hex| {
                hex.len() == WALLET_ADDRESS_HEX_LEN && hex.chars().all(|c| c.is_ascii_hexdigit())
            });

        if valid {
            Ok(Self(address))
        } else {
            Err(InvalidWalletAddressError(address))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    /// `0x1234...abcd`
    #[must_use]
    pub fn shortened(&self) -> String {
        // Addresses are ASCII, so byte slicing is safe.
        let head = &self.0[..6];
        let tail = &self.0[self.0.len() - 4..];
        format!("{head}...{tail}")
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        WalletAddress::new(inner)
            .map_err(|err| D::Error::invalid_value(Unexpected::Str(&err.0), &"WalletAddress"))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct WalletConnection {
    pub address: WalletAddress,
    /// Name of the network the wallet is on, if the provider reports one.
    pub network: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum ConnectionOutcome {
    Connected(WalletConnection),
    /// No wallet is installed for this client.
    Unavailable,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum WalletError {
    #[error("The connection request was declined")]
    Declined,
    #[error("The wallet provider failed: {0}")]
    Provider(String),
}

#[async_trait]
pub trait Wallet: Send + Sync {
    async fn request_connection(&self) -> Result<ConnectionOutcome, WalletError>;

    /// Best-effort reverse lookup of a human readable name.
    async fn resolve_display_name(
        &self,
        address: &WalletAddress,
    ) -> Result<Option<String>, WalletError>;
}

/// Used when no wallet is configured; every connection attempt reports
/// [`ConnectionOutcome::Unavailable`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct NoWallet;

#[async_trait]
impl Wallet for NoWallet {
    async fn request_connection(&self) -> Result<ConnectionOutcome, WalletError> {
        Ok(ConnectionOutcome::Unavailable)
    }

    async fn resolve_display_name(
        &self,
        _address: &WalletAddress,
    ) -> Result<Option<String>, WalletError> {
        Ok(None)
    }
}

/// A wallet whose account is fixed by configuration.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ConfiguredWallet {
    pub connection: WalletConnection,
    pub display_name: Option<String>,
}

#[async_trait]
impl Wallet for ConfiguredWallet {
    async fn request_connection(&self) -> Result<ConnectionOutcome, WalletError> {
        Ok(ConnectionOutcome::Connected(self.connection.clone()))
    }

    async fn resolve_display_name(
        &self,
        address: &WalletAddress,
    ) -> Result<Option<String>, WalletError> {
        if *address == self.connection.address {
            Ok(self.display_name.clone())
        } else {
            Ok(None)
        }
    }
}

/// What to tell a client that has no wallet to connect with.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnavailableNotice {
    /// Mobile clients are sent to the wallet app, which can open the dapp itself.
    DeepLink { url: String },
    InstallPrompt { message: String },
}

impl UnavailableNotice {
    #[must_use]
    pub fn for_client(user_agent: Option<&str>, host: &str) -> Self {
        let is_mobile = user_agent.is_some_and(|user_agent| {
            let user_agent = user_agent.to_ascii_lowercase();
            MOBILE_USER_AGENT_MARKERS
                .iter()
                .any(|marker| user_agent.contains(marker))
        });

        if is_mobile {
            Self::DeepLink {
                url: format!("{WALLET_APP_DAPP_LINK}{host}"),
            }
        } else {
            Self::InstallPrompt {
                message: INSTALL_WALLET_MESSAGE.to_owned(),
            }
        }
    }
}
