use ethers::{
    types::{transaction::eip712::hash_struct, H256},
    utils::keccak256,
};
use serde_json::Value;

use super::{signer::SignerError, typed_data::EIP712_DOMAIN_TYPE, TypedDataPayload};

/// The two hashes a device needs to sign EIP-712 data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashPair {
    pub domain_hash: H256,
    pub message_hash: H256,
}

impl HashPair {
    /// `keccak256(0x19 0x01 ‖ domainHash ‖ messageHash)`, the value actually signed.
    pub fn digest(&self) -> H256 {
        let mut input = Vec::with_capacity(66);
        input.extend_from_slice(&[0x19, 0x01]);
        input.extend_from_slice(self.domain_hash.as_bytes());
        input.extend_from_slice(self.message_hash.as_bytes());
        H256::from(keccak256(input))
    }
}

/// Produces the domain separator and struct hash for a payload.
pub trait TypedDataHasher: Send + Sync {
    fn hash_pair(&self, payload: &TypedDataPayload) -> Result<HashPair, SignerError>;
}

/// EIP-712 hashing backed by the `ethers` encoder.
///
/// The domain is hashed against its own schema only, and the message against `types`
/// with `EIP712Domain` stripped out.
#[derive(Debug, Default, Clone, Copy)]
pub struct Eip712Hasher;

impl TypedDataHasher for Eip712Hasher {
    fn hash_pair(&self, payload: &TypedDataPayload) -> Result<HashPair, SignerError> {
        payload.validate()?;

        let domain_hash = hash_struct(
            EIP712_DOMAIN_TYPE,
            &Value::Object(payload.domain.clone()),
            &payload.domain_types()?,
        )
        .map_err(|e| SignerError::MalformedTypedData(e.to_string()))?;

        let message_hash = hash_struct(
            &payload.primary_type,
            &Value::Object(payload.message.clone()),
            &payload.message_types(),
        )
        .map_err(|e| SignerError::MalformedTypedData(e.to_string()))?;

        Ok(HashPair {
            domain_hash: H256::from(domain_hash),
            message_hash: H256::from(message_hash),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::transaction::eip712::{Eip712, TypedData};
    use serde_json::json;
    use std::str::FromStr;

    fn agent_json(source: &str) -> Value {
        json!({
            "domain": {
                "chainId": 1337,
                "name": "Exchange",
                "verifyingContract": "0x0000000000000000000000000000000000000000",
                "version": "1"
            },
            "types": {
                "Agent": [
                    {"name": "source", "type": "string"},
                    {"name": "connectionId", "type": "bytes32"}
                ],
                "EIP712Domain": [
                    {"name": "name", "type": "string"},
                    {"name": "version", "type": "string"},
                    {"name": "chainId", "type": "uint256"},
                    {"name": "verifyingContract", "type": "address"}
                ]
            },
            "primaryType": "Agent",
            "message": {
                "source": source,
                "connectionId": "0xde6c4037798a4434ca03cd05f00e3b803126221375cd1e7eaaaf041768be06eb"
            }
        })
    }

    fn h256(s: &str) -> H256 {
        H256::from_str(s).unwrap()
    }

    #[test]
    fn test_exchange_domain_and_agent_hashes() {
        let payload: TypedDataPayload = serde_json::from_value(agent_json("a")).unwrap();
        let pair = Eip712Hasher.hash_pair(&payload).unwrap();
        assert_eq!(
            pair.domain_hash,
            h256("0xd79297fcdf2ffcd4ae223d01edaa2ba214ff8f401d7c9300d995d17c82aa4040")
        );
        assert_eq!(
            pair.message_hash,
            h256("0xc51496e8f35291422589efd41c9c709f282115707876af4836ceb56d61ee4af0")
        );
    }

    #[test]
    fn test_digest_matches_ethers_typed_data() {
        for source in ["a", "b"] {
            let json = agent_json(source);
            let payload: TypedDataPayload = serde_json::from_value(json.clone()).unwrap();
            let mut typed_data: TypedData = serde_json::from_value(json).unwrap();
            typed_data.types.remove(EIP712_DOMAIN_TYPE);

            let pair = Eip712Hasher.hash_pair(&payload).unwrap();
            assert_eq!(
                pair.digest(),
                H256::from(typed_data.encode_eip712().unwrap())
            );
        }
    }

    #[test]
    fn test_hashing_ignores_key_order() {
        let shuffled: TypedDataPayload = serde_json::from_str(
            r#"{
                "message": {
                    "connectionId": "0xde6c4037798a4434ca03cd05f00e3b803126221375cd1e7eaaaf041768be06eb",
                    "source": "a"
                },
                "primaryType": "Agent",
                "types": {
                    "EIP712Domain": [
                        {"name": "name", "type": "string"},
                        {"name": "version", "type": "string"},
                        {"name": "chainId", "type": "uint256"},
                        {"name": "verifyingContract", "type": "address"}
                    ],
                    "Agent": [
                        {"name": "source", "type": "string"},
                        {"name": "connectionId", "type": "bytes32"}
                    ]
                },
                "domain": {
                    "version": "1",
                    "verifyingContract": "0x0000000000000000000000000000000000000000",
                    "name": "Exchange",
                    "chainId": 1337
                }
            }"#,
        )
        .unwrap();
        let ordered: TypedDataPayload = serde_json::from_value(agent_json("a")).unwrap();

        let first = Eip712Hasher.hash_pair(&ordered).unwrap();
        assert_eq!(first, Eip712Hasher.hash_pair(&shuffled).unwrap());
        assert_eq!(first, Eip712Hasher.hash_pair(&ordered).unwrap());
    }

    #[test]
    fn test_derived_domain_type_hashes_like_declared() {
        let declared: TypedDataPayload = serde_json::from_value(agent_json("a")).unwrap();
        let mut derived = declared.clone();
        derived.types.remove(EIP712_DOMAIN_TYPE);

        assert_eq!(
            Eip712Hasher.hash_pair(&declared).unwrap(),
            Eip712Hasher.hash_pair(&derived).unwrap()
        );
    }

    #[test]
    fn test_three_field_domain() {
        let mut json = agent_json("a");
        json["domain"] = json!({
            "name": "Hyperliquid",
            "chainId": 1337,
            "verifyingContract": "0x0000000000000000000000000000000000000000"
        });
        json["types"]["EIP712Domain"] = json!([
            {"name": "name", "type": "string"},
            {"name": "chainId", "type": "uint256"},
            {"name": "verifyingContract", "type": "address"}
        ]);
        let payload: TypedDataPayload = serde_json::from_value(json).unwrap();
        let pair = Eip712Hasher.hash_pair(&payload).unwrap();
        assert_eq!(
            pair.domain_hash,
            h256("0xd8779665dd8ae5ff576dcb5e6a067abfa6ec33dd80189a88f26c5338babbcf99")
        );
    }

    #[test]
    fn test_malformed_payload_is_rejected_before_hashing() {
        let mut payload: TypedDataPayload = serde_json::from_value(agent_json("a")).unwrap();
        payload.types.remove("Agent");
        assert!(matches!(
            Eip712Hasher.hash_pair(&payload),
            Err(SignerError::MalformedTypedData(_))
        ));
    }
}
