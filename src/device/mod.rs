//! Key-holding devices the signer can talk to.
//!
//! A [`DeviceTransport`] resolves derivation paths to addresses and signs a precomputed
//! EIP-712 hash pair. The Ledger transport is behind the `ledger` feature; a software key
//! transport backs tests and the `private-key` / `mnemonic` signer kinds.

#[cfg(feature = "ledger")]
mod ledger;
mod local;

use std::{env, fmt, str::FromStr};

use async_trait::async_trait;
use clap::ValueEnum;
use ethers::types::{Address, Signature, H256};
use log::info;
use thiserror::Error;

#[cfg(feature = "ledger")]
pub use ledger::LedgerTransport;
pub use local::LocalKeyTransport;

use crate::prelude::Result;
use crate::Error;

const MAX_PATH_DEPTH: usize = 10;
const HARDENED_OFFSET: u32 = 1 << 31;

/// Largest account index a hardened path segment can carry.
pub const MAX_ACCOUNT_INDEX: u32 = HARDENED_OFFSET - 1;

/// A BIP-32 path such as `44'/60'/0'/0/0`, stored without the leading `m/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivationPath(String);

impl DerivationPath {
    /// `44'/60'/{index}'/0/0`, the layout Ledger Live uses. `index` is hardened, so it
    /// must be below 2^31.
    pub fn ledger_live(index: u32) -> Result<Self> {
        let path = format!("44'/60'/{index}'/0/0");
        if index >= HARDENED_OFFSET {
            return Err(Error::InvalidDerivationPath {
                path,
                reason: format!("account index must be below {HARDENED_OFFSET}"),
            });
        }
        Ok(DerivationPath(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_bip32(&self) -> String {
        format!("m/{}", self.0)
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidDerivationPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let body = trimmed.strip_prefix("m/").unwrap_or(trimmed);
        if body.is_empty() {
            return Err(invalid("path is empty"));
        }

        let mut segments = Vec::new();
        for segment in body.split('/') {
            let (index, hardened) = match segment
                .strip_suffix('\'')
                .or_else(|| segment.strip_suffix('h'))
            {
                Some(index) => (index, true),
                None => (segment, false),
            };
            let index: u32 = index
                .parse()
                .map_err(|_| invalid(&format!("`{segment}` is not a path index")))?;
            if index >= HARDENED_OFFSET {
                return Err(invalid(&format!("index {index} is out of range")));
            }
            segments.push(if hardened {
                format!("{index}'")
            } else {
                index.to_string()
            });
        }
        if segments.len() > MAX_PATH_DEPTH {
            return Err(invalid(&format!(
                "at most {MAX_PATH_DEPTH} levels are supported"
            )));
        }

        Ok(DerivationPath(segments.join("/")))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A key on a device, resolved once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountHandle {
    pub path: DerivationPath,
    pub address: Address,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Rejected(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    async fn get_account_by_path(&self, path: &DerivationPath)
        -> std::result::Result<AccountHandle, DeviceError>;

    /// Signs `keccak256(0x1901 ‖ domain_hash ‖ message_hash)` with the key at `path`. The
    /// hashes are sent as they are and never re-hashed.
    async fn sign_precomputed_hash_pair(
        &self,
        domain_hash: H256,
        message_hash: H256,
        path: &DerivationPath,
    ) -> std::result::Result<Signature, DeviceError>;
}

#[async_trait]
impl<T: DeviceTransport + ?Sized> DeviceTransport for Box<T> {
    async fn get_account_by_path(
        &self,
        path: &DerivationPath,
    ) -> std::result::Result<AccountHandle, DeviceError> {
        (**self).get_account_by_path(path).await
    }

    async fn sign_precomputed_hash_pair(
        &self,
        domain_hash: H256,
        message_hash: H256,
        path: &DerivationPath,
    ) -> std::result::Result<Signature, DeviceError> {
        (**self)
            .sign_precomputed_hash_pair(domain_hash, message_hash, path)
            .await
    }
}

/// Where the signing key lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SignerKind {
    /// Ledger hardware wallet over USB
    Ledger,
    /// Raw key from `HYPERLIQUID_PRIVATE_KEY`
    PrivateKey,
    /// BIP-39 phrase from `HYPERLIQUID_MNEMONIC`
    Mnemonic,
}

pub const PRIVATE_KEY_ENV: &str = "HYPERLIQUID_PRIVATE_KEY";
pub const MNEMONIC_ENV: &str = "HYPERLIQUID_MNEMONIC";

fn secret_from_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Wallet(format!("{name} is not set")))
}

/// Opens the transport for `kind`. Software keys are read from the environment (a `.env`
/// file is honoured by the binaries).
pub fn open_transport(kind: SignerKind) -> Result<Box<dyn DeviceTransport>> {
    info!("Opening {kind:?} signer");
    match kind {
        SignerKind::Ledger => open_ledger(),
        SignerKind::PrivateKey => Ok(Box::new(LocalKeyTransport::from_private_key(
            &secret_from_env(PRIVATE_KEY_ENV)?,
        )?)),
        SignerKind::Mnemonic => Ok(Box::new(LocalKeyTransport::from_mnemonic(
            &secret_from_env(MNEMONIC_ENV)?,
        )?)),
    }
}

#[cfg(feature = "ledger")]
fn open_ledger() -> Result<Box<dyn DeviceTransport>> {
    Ok(Box::new(LedgerTransport::new()))
}

#[cfg(not(feature = "ledger"))]
fn open_ledger() -> Result<Box<dyn DeviceTransport>> {
    Err(Error::LedgerSupportDisabled)
}
