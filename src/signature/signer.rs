use std::{fmt, time::Duration};

use ethers::types::{Address, Signature, SignatureError, U256};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Eip712Hasher, HashPair, TypedDataHasher, TypedDataPayload};
use crate::device::{AccountHandle, DerivationPath, DeviceError, DeviceTransport};

/// Failures at the signing boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The payload does not fit its own schema. Raised before any device I/O.
    #[error("Malformed typed data: {0}")]
    MalformedTypedData(String),
    /// Device missing, locked, wrong app open, or no answer in time.
    #[error("Signing device unavailable: {0}")]
    DeviceUnavailable(String),
    /// The user declined on the device.
    #[error("Signature rejected on device: {0}")]
    UserRejected(String),
}

impl SignerError {
    /// Only an unavailable device is worth retrying once the user fixes it. A rejection
    /// has to be re-prompted deliberately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SignerError::DeviceUnavailable(_))
    }
}

impl From<DeviceError> for SignerError {
    fn from(e: DeviceError) -> Self {
        match e {
            DeviceError::Unavailable(reason) => SignerError::DeviceUnavailable(reason),
            DeviceError::Rejected(reason) => SignerError::UserRejected(reason),
        }
    }
}

/// `(r, s, v)` in the shape the exchange expects: `r` and `s` as hex strings, `v` as an
/// integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureTriple {
    pub r: U256,
    pub s: U256,
    pub v: u64,
}

impl SignatureTriple {
    /// Recovers the signing address from the hash pair this triple was produced for.
    pub fn recover(&self, pair: &HashPair) -> Result<Address, SignatureError> {
        Signature::from(*self).recover(pair.digest())
    }
}

impl From<Signature> for SignatureTriple {
    fn from(sig: Signature) -> Self {
        SignatureTriple {
            r: sig.r,
            s: sig.s,
            v: sig.v,
        }
    }
}

impl From<SignatureTriple> for Signature {
    fn from(sig: SignatureTriple) -> Self {
        Signature {
            r: sig.r,
            s: sig.s,
            v: sig.v,
        }
    }
}

impl fmt::Display for SignatureTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", Signature::from(*self))
    }
}

/// Signs EIP-712 typed data with a key that never leaves the device.
///
/// The payload is validated and hashed on the host; only the domain hash and message
/// hash reach the device, together with the account's derivation path.
pub struct TypedDataSigner<D, H = Eip712Hasher> {
    device: D,
    hasher: H,
    account: AccountHandle,
    timeout: Option<Duration>,
}

impl<D: DeviceTransport> TypedDataSigner<D> {
    pub async fn connect(device: D, path: DerivationPath) -> Result<Self, SignerError> {
        Self::connect_with_hasher(device, Eip712Hasher, path).await
    }
}

impl<D: DeviceTransport, H: TypedDataHasher> TypedDataSigner<D, H> {
    /// Opens the account at `path` on the device.
    pub async fn connect_with_hasher(
        device: D,
        hasher: H,
        path: DerivationPath,
    ) -> Result<Self, SignerError> {
        let account = device.get_account_by_path(&path).await?;
        info!("Signing account {:?} at m/{}", account.address, account.path);
        Ok(TypedDataSigner {
            device,
            hasher,
            account,
            timeout: None,
        })
    }

    /// Bounds how long a signing call waits for the device. Running out of time is
    /// reported as [`SignerError::DeviceUnavailable`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn address(&self) -> Address {
        self.account.address
    }

    pub fn account(&self) -> &AccountHandle {
        &self.account
    }

    pub async fn sign_typed_data(
        &mut self,
        payload: &TypedDataPayload,
    ) -> Result<SignatureTriple, SignerError> {
        payload.validate()?;
        let pair = self.hasher.hash_pair(payload)?;
        debug!(
            "Sending {} hash pair to device at m/{}: domain {:?}, message {:?}",
            payload.primary_type, self.account.path, pair.domain_hash, pair.message_hash
        );

        let request =
            self.device
                .sign_precomputed_hash_pair(pair.domain_hash, pair.message_hash, &self.account.path);
        let signature = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, request).await.map_err(|_| {
                SignerError::DeviceUnavailable(format!(
                    "no answer from the device within {}s",
                    limit.as_secs_f64()
                ))
            })??,
            None => request.await?,
        };

        Ok(signature.into())
    }
}
