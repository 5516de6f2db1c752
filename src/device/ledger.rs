use async_trait::async_trait;
use coins_ledger::{common::APDUResponseCodes, LedgerError as TransportError};
use ethers::{
    signers::{HDPath, Ledger, LedgerError},
    types::{
        transaction::eip712::{EIP712Domain, Eip712, Eip712Error},
        Signature, H256,
    },
};
use log::{debug, info, warn};
use tokio::sync::{Mutex, MutexGuard};

use super::{AccountHandle, DerivationPath, DeviceError, DeviceTransport};

// Only used for transaction signing, which this crate never does.
const SESSION_CHAIN_ID: u64 = 1;

// Lowercase fragments of a decline that reaches us only as text.
const REJECTION_MARKERS: [&str; 4] = [
    "6985",
    "conditions of use not satisfied",
    "denied",
    "rejected",
];

/// The hash pair handed over as an [`Eip712`] value, so that the Ethereum app's
/// `SIGN_ETH_EIP_712` instruction receives exactly these 64 bytes.
struct PrecomputedHashPair {
    domain_hash: H256,
    message_hash: H256,
}

impl Eip712 for PrecomputedHashPair {
    type Error = Eip712Error;

    fn domain_separator(&self) -> Result<[u8; 32], Self::Error> {
        Ok(self.domain_hash.to_fixed_bytes())
    }

    fn domain(&self) -> Result<EIP712Domain, Self::Error> {
        Err(Eip712Error::Message(
            "only the precomputed domain hash is known".to_string(),
        ))
    }

    fn type_hash() -> Result<[u8; 32], Self::Error> {
        Err(Eip712Error::Message(
            "only the precomputed struct hash is known".to_string(),
        ))
    }

    fn struct_hash(&self) -> Result<[u8; 32], Self::Error> {
        Ok(self.message_hash.to_fixed_bytes())
    }
}

fn is_rejection(e: &LedgerError) -> bool {
    if let LedgerError::LedgerError(TransportError::BadRetcode(code)) = e {
        return *code == APDUResponseCodes::ConditionsNotSatisfied;
    }
    let reason = e.to_string().to_lowercase();
    REJECTION_MARKERS.iter().any(|marker| reason.contains(marker))
}

fn classify(e: LedgerError) -> DeviceError {
    let reason = e.to_string();
    if is_rejection(&e) {
        DeviceError::Rejected(reason)
    } else {
        DeviceError::Unavailable(format!(
            "{reason} (is the Ledger connected, unlocked, with the Ethereum app open?)"
        ))
    }
}

/// Ledger Ethereum app over USB HID.
///
/// The device is opened on first use. A session is bound to one derivation path, so asking
/// for a different path closes the current session and opens a new one.
#[derive(Default)]
pub struct LedgerTransport {
    session: Mutex<Option<(DerivationPath, Ledger)>>,
}

impl LedgerTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the session, opening or re-opening the device for `path` when needed.
    async fn session(
        &self,
        path: &DerivationPath,
    ) -> Result<MutexGuard<'_, Option<(DerivationPath, Ledger)>>, DeviceError> {
        let mut session = self.session.lock().await;
        if matches!(&*session, Some((open, _)) if open == path) {
            return Ok(session);
        }

        if let Some((previous, ledger)) = session.take() {
            debug!("Closing Ledger session for m/{previous}");
            ledger.close();
        }
        info!("Opening Ledger session for m/{path}");
        let ledger = Ledger::new(HDPath::Other(path.to_bip32()), SESSION_CHAIN_ID)
            .await
            .map_err(|e| {
                warn!("Ledger unavailable: {e}");
                DeviceError::Unavailable(format!(
                    "failed to connect to Ledger device: {e}. Make sure it is connected via USB, unlocked, and the Ethereum app is open"
                ))
            })?;
        *session = Some((path.clone(), ledger));
        Ok(session)
    }
}

fn not_open() -> DeviceError {
    DeviceError::Unavailable("Ledger session is not open".to_string())
}

#[async_trait]
impl DeviceTransport for LedgerTransport {
    async fn get_account_by_path(&self, path: &DerivationPath) -> Result<AccountHandle, DeviceError> {
        let session = self.session(path).await?;
        let (_, ledger) = session.as_ref().ok_or_else(not_open)?;
        let address = ledger.get_address().await.map_err(classify)?;
        info!("Ledger address: {address:?}");
        Ok(AccountHandle {
            path: path.clone(),
            address,
        })
    }

    async fn sign_precomputed_hash_pair(
        &self,
        domain_hash: H256,
        message_hash: H256,
        path: &DerivationPath,
    ) -> Result<Signature, DeviceError> {
        let session = self.session(path).await?;
        let (_, ledger) = session.as_ref().ok_or_else(not_open)?;
        info!("Confirm the signature on your Ledger (m/{path})");
        let pair = PrecomputedHashPair {
            domain_hash,
            message_hash,
        };
        ledger.sign_typed_struct(&pair).await.map_err(classify)
    }
}
