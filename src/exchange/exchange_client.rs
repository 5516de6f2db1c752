use ethers::types::{Address, U256};
use log::{debug, info};
use reqwest::Client;
use serde::Serialize;

use crate::{
    consts::SIGNATURE_CHAIN_ID,
    device::{DeviceTransport, DerivationPath},
    exchange::{
        actions::{Actions, CSignerAction, CValidatorAction, StakingTransfer},
        validator::{ValidatorProfileChange, ValidatorRegistration},
        ExchangeResponseStatus,
    },
    helpers::next_nonce,
    prelude::*,
    req::HttpClient,
    signature::{SignatureTriple, TypedDataSigner},
    BaseUrl, Error,
};

/// Body of a POST to `/exchange`.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignedAction {
    pub action: serde_json::Value,
    pub nonce: u64,
    pub signature: SignatureTriple,
    pub vault_address: Option<Address>,
    pub expires_after: Option<u64>,
}

pub struct ExchangeClient<D = Box<dyn DeviceTransport>> {
    pub http_client: HttpClient,
    pub signer: TypedDataSigner<D>,
    pub base_url: BaseUrl,
    pub expires_after: Option<u64>,
}

impl<D: DeviceTransport> ExchangeClient<D> {
    pub fn new(client: Option<Client>, signer: TypedDataSigner<D>, base_url: Option<BaseUrl>) -> Self {
        let base_url = base_url.unwrap_or(BaseUrl::Mainnet);
        ExchangeClient {
            http_client: HttpClient::new(client, base_url),
            signer,
            base_url,
            expires_after: None,
        }
    }

    /// Connects to the account at `path` and builds a client around it.
    pub async fn connect(
        client: Option<Client>,
        device: D,
        path: DerivationPath,
        base_url: Option<BaseUrl>,
    ) -> Result<Self> {
        let signer = TypedDataSigner::connect(device, path).await?;
        Ok(Self::new(client, signer, base_url))
    }

    /// Actions signed after this call are rejected by the exchange once `expires_after`
    /// (milliseconds) has passed. Only L1 actions carry the expiry in their signature.
    pub fn set_expires_after(&mut self, expires_after: Option<u64>) {
        self.expires_after = expires_after;
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    fn staking_transfer(&self, wei: u64, nonce: u64) -> StakingTransfer {
        StakingTransfer {
            wei,
            nonce,
            signature_chain_id: U256::from(SIGNATURE_CHAIN_ID),
            hyperliquid_chain: self.base_url.hyperliquid_chain().to_string(),
        }
    }

    /// Signs `action` at `nonce` without sending it.
    pub async fn sign_action(&mut self, action: Actions, nonce: u64) -> Result<SignedAction> {
        let typed_data =
            action.typed_data(nonce, self.base_url.is_mainnet(), self.expires_after)?;
        let signature = self.signer.sign_typed_data(&typed_data).await?;
        debug!("Signed {} with {signature}", typed_data.primary_type);

        let action = serde_json::to_value(&action).map_err(|e| Error::JsonParse(e.to_string()))?;
        Ok(SignedAction {
            action,
            nonce,
            signature,
            vault_address: None,
            expires_after: self.expires_after,
        })
    }

    async fn post(&self, signed: SignedAction) -> Result<ExchangeResponseStatus> {
        let res = serde_json::to_string(&signed).map_err(|e| Error::JsonParse(e.to_string()))?;
        debug!("Sending request {res:?}");

        let output = &self.http_client.post("/exchange", res).await?;
        serde_json::from_str(output).map_err(|e| Error::JsonParse(e.to_string()))
    }

    async fn sign_and_post(&mut self, action: Actions, nonce: u64) -> Result<ExchangeResponseStatus> {
        let signed = self.sign_action(action, nonce).await?;
        let response = self.post(signed).await?;
        info!("Exchange responded: {response:?}");
        Ok(response)
    }

    pub async fn c_deposit(&mut self, wei: u64) -> Result<ExchangeResponseStatus> {
        let nonce = next_nonce();
        let action = Actions::CDeposit(self.staking_transfer(wei, nonce));
        self.sign_and_post(action, nonce).await
    }

    pub async fn c_withdraw(&mut self, wei: u64) -> Result<ExchangeResponseStatus> {
        let nonce = next_nonce();
        let action = Actions::CWithdraw(self.staking_transfer(wei, nonce));
        self.sign_and_post(action, nonce).await
    }

    pub async fn c_signer_jail_self(&mut self) -> Result<ExchangeResponseStatus> {
        let action = Actions::CSignerAction(CSignerAction::JailSelf);
        self.sign_and_post(action, next_nonce()).await
    }

    pub async fn c_signer_unjail_self(&mut self) -> Result<ExchangeResponseStatus> {
        let action = Actions::CSignerAction(CSignerAction::UnjailSelf);
        self.sign_and_post(action, next_nonce()).await
    }

    pub async fn c_validator_register(
        &mut self,
        registration: ValidatorRegistration,
    ) -> Result<ExchangeResponseStatus> {
        registration.validate()?;
        let action = Actions::CValidatorAction(CValidatorAction::Register(registration));
        self.sign_and_post(action, next_nonce()).await
    }

    pub async fn c_validator_change_profile(
        &mut self,
        change: ValidatorProfileChange,
    ) -> Result<ExchangeResponseStatus> {
        change.validate()?;
        let action = Actions::CValidatorAction(CValidatorAction::ChangeProfile(change));
        self.sign_and_post(action, next_nonce()).await
    }

    pub async fn c_validator_unregister(&mut self) -> Result<ExchangeResponseStatus> {
        let action = Actions::CValidatorAction(CValidatorAction::Unregister);
        self.sign_and_post(action, next_nonce()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::LocalKeyTransport;
    use serde_json::json;
    use std::str::FromStr;

    const TEST_KEY: &str = "e908f86dbb4d55ac876378565aafeabc187f6690f046459397b17d9b9a19688e";
    const NONCE: u64 = 1_700_000_000_000;

    async fn client(base_url: BaseUrl) -> ExchangeClient<LocalKeyTransport> {
        let device = LocalKeyTransport::from_private_key(TEST_KEY).unwrap();
        ExchangeClient::connect(None, device, DerivationPath::ledger_live(0).unwrap(), Some(base_url))
            .await
            .unwrap()
    }

    fn u256(s: &str) -> U256 {
        U256::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_jail_self_signature() {
        let mut mainnet = client(BaseUrl::Mainnet).await;
        let signed = mainnet
            .sign_action(Actions::CSignerAction(CSignerAction::JailSelf), NONCE)
            .await
            .unwrap();
        assert_eq!(
            signed.signature,
            SignatureTriple {
                r: u256("0x75193b33a847a99feceebe2528359aeb3c35470b76e3920a549b3b3c173d5d97"),
                s: u256("0x1710aaf8c994b9000de61c6bfc190b99ec0e10bfdd7f31a229c7f9bf8a38ed09"),
                v: 28,
            }
        );

        let mut testnet = client(BaseUrl::Testnet).await;
        let signed = testnet
            .sign_action(Actions::CSignerAction(CSignerAction::JailSelf), NONCE)
            .await
            .unwrap();
        assert_eq!(
            signed.signature,
            SignatureTriple {
                r: u256("0x1b8fb580f79d4627dfd744e4ceaa5be8b3adddd566b881a6017109aa6e64a171"),
                s: u256("0x456fc0a9db380ffcf2cbdfd5000474a89383dfd4d1c1e7b6bec7dc95b5d8ecb1"),
                v: 27,
            }
        );
    }

    #[tokio::test]
    async fn test_deposit_payload() {
        let mut exchange = client(BaseUrl::Mainnet).await;
        let action = Actions::CDeposit(exchange.staking_transfer(100_000_000, NONCE));
        let signed = exchange.sign_action(action, NONCE).await.unwrap();

        assert_eq!(
            serde_json::to_value(&signed).unwrap(),
            json!({
                "action": {
                    "type": "cDeposit",
                    "wei": 100000000u64,
                    "nonce": NONCE,
                    "signatureChainId": "0x66eee",
                    "hyperliquidChain": "Mainnet"
                },
                "nonce": NONCE,
                "signature": {
                    "r": "0x842a929515ab4f572a3d96d29ba7d7f8da9ce1905b46df911c592115fde9266f",
                    "s": "0x44a668d30f379b50f0d76c0d950e8a7e342f4b100c19c6b2c7e8cf0e6d6e09d0",
                    "v": 27
                },
                "vaultAddress": null,
                "expiresAfter": null
            })
        );
    }

    #[tokio::test]
    async fn test_withdraw_uses_testnet_chain() {
        let mut exchange = client(BaseUrl::Testnet).await;
        let action = Actions::CWithdraw(exchange.staking_transfer(50_000_000, NONCE));
        let signed = exchange.sign_action(action, NONCE).await.unwrap();
        assert_eq!(signed.action["hyperliquidChain"], "Testnet");
        assert_eq!(
            signed.signature,
            SignatureTriple {
                r: u256("0x92d51a1de9c749fd23d977e953ee5988d7fe7395fe2ad1c6fb410405269b5dc2"),
                s: u256("0x10be3f52b4725942ac56b44a425ad6dc7d98cf49605c83368d90d6942df640aa"),
                v: 28,
            }
        );
    }

    #[tokio::test]
    async fn test_expiry_is_sent_with_action() {
        let mut exchange = client(BaseUrl::Mainnet).await;
        exchange.set_expires_after(Some(NONCE + 60_000));
        let with_expiry = exchange
            .sign_action(Actions::CSignerAction(CSignerAction::UnjailSelf), NONCE)
            .await
            .unwrap();
        exchange.set_expires_after(None);
        let without = exchange
            .sign_action(Actions::CSignerAction(CSignerAction::UnjailSelf), NONCE)
            .await
            .unwrap();

        assert_eq!(with_expiry.expires_after, Some(NONCE + 60_000));
        assert_ne!(with_expiry.signature, without.signature);
    }

    #[tokio::test]
    async fn test_invalid_registration_is_not_signed() {
        let mut exchange = client(BaseUrl::Testnet).await;
        let mut registration = ValidatorRegistration::from_json(
            r#"{
                "node_ip": "1.2.3.4",
                "name": "My Validator",
                "description": "A great validator",
                "delegations_disabled": false,
                "commission_bps": 1000,
                "signer": "0x0000000000000000000000000000000000000001",
                "unjailed": true,
                "initial_wei": 100000000
            }"#,
        )
        .unwrap();
        registration.profile.commission_bps = 20_000;
        assert!(matches!(
            exchange.c_validator_register(registration).await,
            Err(Error::InvalidValidatorParams(_))
        ));
    }
}
