use std::str::FromStr;

use async_trait::async_trait;
use ethers::{
    signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer},
    types::{PathOrString, Signature, H256},
};
use log::debug;

use super::{AccountHandle, DerivationPath, DeviceError, DeviceTransport};
use crate::{prelude::Result, signature::HashPair, Error};

enum KeySource {
    PrivateKey(LocalWallet),
    Mnemonic(String),
}

/// A software key standing in for a hardware device.
///
/// With a raw private key every path resolves to the same key. With a mnemonic, each path
/// derives its own key, as a hardware wallet would.
pub struct LocalKeyTransport {
    source: KeySource,
}

impl LocalKeyTransport {
    pub fn from_private_key(key: &str) -> Result<Self> {
        let key = key.trim();
        let wallet = LocalWallet::from_str(key.strip_prefix("0x").unwrap_or(key))
            .map_err(|e| Error::PrivateKeyParse(e.to_string()))?;
        Ok(LocalKeyTransport {
            source: KeySource::PrivateKey(wallet),
        })
    }

    pub fn from_mnemonic(phrase: &str) -> Result<Self> {
        let phrase = phrase.trim().to_string();
        // fail on a bad phrase now rather than at first use
        derive(&phrase, &DerivationPath::ledger_live(0)?).map_err(|e| Error::Wallet(e.to_string()))?;
        Ok(LocalKeyTransport {
            source: KeySource::Mnemonic(phrase),
        })
    }

    fn wallet_for(&self, path: &DerivationPath) -> std::result::Result<LocalWallet, DeviceError> {
        match &self.source {
            KeySource::PrivateKey(wallet) => Ok(wallet.clone()),
            KeySource::Mnemonic(phrase) => derive(phrase, path),
        }
    }
}

fn derive(phrase: &str, path: &DerivationPath) -> std::result::Result<LocalWallet, DeviceError> {
    MnemonicBuilder::<English>::default()
        .phrase(PathOrString::String(phrase.to_string()))
        .derivation_path(&path.to_bip32())
        .and_then(|builder| builder.build())
        .map_err(|e| DeviceError::Unavailable(format!("cannot derive key at m/{path}: {e}")))
}

#[async_trait]
impl DeviceTransport for LocalKeyTransport {
    async fn get_account_by_path(
        &self,
        path: &DerivationPath,
    ) -> std::result::Result<AccountHandle, DeviceError> {
        let wallet = self.wallet_for(path)?;
        Ok(AccountHandle {
            path: path.clone(),
            address: wallet.address(),
        })
    }

    async fn sign_precomputed_hash_pair(
        &self,
        domain_hash: H256,
        message_hash: H256,
        path: &DerivationPath,
    ) -> std::result::Result<Signature, DeviceError> {
        let digest = HashPair {
            domain_hash,
            message_hash,
        }
        .digest();
        debug!("Signing digest {digest:?} with software key at m/{path}");
        self.wallet_for(path)?
            .sign_hash(digest)
            .map_err(|e| DeviceError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Address;

    const TEST_KEY: &str = "0xe908f86dbb4d55ac876378565aafeabc187f6690f046459397b17d9b9a19688e";
    const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";

    fn address(s: &str) -> Address {
        Address::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_private_key_address() {
        let transport = LocalKeyTransport::from_private_key(TEST_KEY).unwrap();
        let account = transport
            .get_account_by_path(&DerivationPath::ledger_live(3).unwrap())
            .await
            .unwrap();
        assert_eq!(
            account.address,
            address("0xcd49bbac6e85fdeb167eb7ca41a945d2b8758f6f")
        );
        assert_eq!(account.path, DerivationPath::ledger_live(3).unwrap());
    }

    #[tokio::test]
    async fn test_mnemonic_derives_per_path() {
        let transport = LocalKeyTransport::from_mnemonic(TEST_MNEMONIC).unwrap();
        let first = transport
            .get_account_by_path(&"44'/60'/0'/0/0".parse().unwrap())
            .await
            .unwrap();
        let second = transport
            .get_account_by_path(&"44'/60'/0'/0/1".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(
            first.address,
            address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
        assert_eq!(
            second.address,
            address("0x70997970C51812dc3A010C7d01b50e0d17dC79C8")
        );
    }

    #[test]
    fn test_bad_secrets() {
        assert!(matches!(
            LocalKeyTransport::from_private_key("0x1234"),
            Err(Error::PrivateKeyParse(_))
        ));
        assert!(matches!(
            LocalKeyTransport::from_mnemonic("not a real phrase"),
            Err(Error::Wallet(_))
        ));
    }

    #[tokio::test]
    async fn test_signature_recovers_to_key() {
        let transport = LocalKeyTransport::from_private_key(TEST_KEY).unwrap();
        let pair = HashPair {
            domain_hash: H256::repeat_byte(1),
            message_hash: H256::repeat_byte(2),
        };
        let path = DerivationPath::ledger_live(0).unwrap();
        let signature = transport
            .sign_precomputed_hash_pair(pair.domain_hash, pair.message_hash, &path)
            .await
            .unwrap();
        assert!(signature.v == 27 || signature.v == 28);
        assert_eq!(
            signature.recover(pair.digest()).unwrap(),
            address("0xcd49bbac6e85fdeb167eb7ca41a945d2b8758f6f")
        );
    }
}
