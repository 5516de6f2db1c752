use ethers::{
    types::{H256, U256},
    utils::keccak256,
};
use serde::Serialize;
use serde_json::{json, Map};

use crate::{
    prelude::*,
    signature::{l1_payload, user_signed_payload, TypedDataPayload},
    Error,
};

use super::validator::{ValidatorProfileChange, ValidatorRegistration};

const STAKING_TRANSFER_FIELDS: [(&str, &str); 3] = [
    ("hyperliquidChain", "string"),
    ("wei", "uint64"),
    ("nonce", "uint64"),
];

/// Moves HYPE between the spot balance and staking. Signed by the user directly.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StakingTransfer {
    pub wei: u64,
    pub nonce: u64,
    pub signature_chain_id: U256,
    pub hyperliquid_chain: String,
}

impl StakingTransfer {
    fn typed_data(&self, primary_type: &str) -> TypedDataPayload {
        let mut message = Map::new();
        message.insert("hyperliquidChain".to_string(), json!(self.hyperliquid_chain));
        message.insert("wei".to_string(), json!(self.wei));
        message.insert("nonce".to_string(), json!(self.nonce));
        user_signed_payload(primary_type, &STAKING_TRANSFER_FIELDS, message)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CSignerAction {
    JailSelf,
    UnjailSelf,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CValidatorAction {
    Register(ValidatorRegistration),
    ChangeProfile(ValidatorProfileChange),
    Unregister,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Actions {
    #[serde(rename = "cDeposit")]
    CDeposit(StakingTransfer),
    #[serde(rename = "cWithdraw")]
    CWithdraw(StakingTransfer),
    #[serde(rename = "CSignerAction")]
    CSignerAction(CSignerAction),
    #[serde(rename = "CValidatorAction")]
    CValidatorAction(CValidatorAction),
}

impl Actions {
    /// `keccak256(msgpack(action) ‖ nonce ‖ vault flag [‖ 0x00 ‖ expires_after])`, the
    /// connection id of the phantom agent.
    pub fn hash(&self, nonce: u64, expires_after: Option<u64>) -> Result<H256> {
        let mut bytes =
            rmp_serde::to_vec_named(self).map_err(|e| Error::RmpParse(e.to_string()))?;
        bytes.extend(nonce.to_be_bytes());
        // no vault address
        bytes.push(0);
        if let Some(expires_after) = expires_after {
            bytes.push(0);
            bytes.extend(expires_after.to_be_bytes());
        }
        Ok(H256(keccak256(bytes)))
    }

    /// Deposits and withdrawals are signed as their own EIP-712 struct; everything else
    /// goes through the L1 phantom agent.
    pub fn is_user_signed(&self) -> bool {
        matches!(self, Actions::CDeposit(_) | Actions::CWithdraw(_))
    }

    /// The typed data that gets signed for this action.
    pub fn typed_data(
        &self,
        nonce: u64,
        is_mainnet: bool,
        expires_after: Option<u64>,
    ) -> Result<TypedDataPayload> {
        match self {
            Actions::CDeposit(transfer) => {
                Ok(transfer.typed_data("HyperliquidTransaction:CDeposit"))
            }
            Actions::CWithdraw(transfer) => {
                Ok(transfer.typed_data("HyperliquidTransaction:CWithdraw"))
            }
            _ => Ok(l1_payload(self.hash(nonce, expires_after)?, is_mainnet)),
        }
    }
}
