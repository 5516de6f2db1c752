use ethers::types::{transaction::eip712::Types, H256};
use serde_json::{json, Map, Value};

use super::{typed_field, TypedDataPayload, EIP712_DOMAIN_TYPE};
use crate::consts::{
    L1_CHAIN_ID, L1_DOMAIN_NAME, L1_DOMAIN_VERSION, SIGNATURE_CHAIN_ID, USER_SIGNED_DOMAIN_NAME,
    USER_SIGNED_DOMAIN_VERSION, ZERO_ADDRESS,
};

pub fn phantom_agent_source(is_mainnet: bool) -> &'static str {
    if is_mainnet {
        "a"
    } else {
        "b"
    }
}

/// The phantom agent an L1 action is signed as. `connection_id` is the action hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub source: String,
    pub connection_id: H256,
}

impl Agent {
    pub fn new(connection_id: H256, is_mainnet: bool) -> Self {
        Agent {
            source: phantom_agent_source(is_mainnet).to_string(),
            connection_id,
        }
    }

    pub fn typed_data(&self) -> TypedDataPayload {
        let mut types = domain_types();
        types.insert(
            "Agent".to_string(),
            vec![
                typed_field("source", "string"),
                typed_field("connectionId", "bytes32"),
            ],
        );

        let mut message = Map::new();
        message.insert("source".to_string(), json!(self.source));
        message.insert("connectionId".to_string(), json!(self.connection_id));

        TypedDataPayload::new(
            domain(L1_DOMAIN_NAME, L1_DOMAIN_VERSION, L1_CHAIN_ID),
            types,
            "Agent",
            message,
        )
    }
}

pub(crate) fn l1_payload(connection_id: H256, is_mainnet: bool) -> TypedDataPayload {
    Agent::new(connection_id, is_mainnet).typed_data()
}

/// Typed data for an action the user signs directly, e.g.
/// `HyperliquidTransaction:CDeposit`.
pub(crate) fn user_signed_payload(
    primary_type: &str,
    fields: &[(&str, &str)],
    message: Map<String, Value>,
) -> TypedDataPayload {
    let mut types = domain_types();
    types.insert(
        primary_type.to_string(),
        fields.iter().map(|(name, ty)| typed_field(name, ty)).collect(),
    );
    TypedDataPayload::new(
        domain(
            USER_SIGNED_DOMAIN_NAME,
            USER_SIGNED_DOMAIN_VERSION,
            SIGNATURE_CHAIN_ID,
        ),
        types,
        primary_type,
        message,
    )
}

fn domain(name: &str, version: &str, chain_id: u64) -> Map<String, Value> {
    let mut domain = Map::new();
    domain.insert("name".to_string(), json!(name));
    domain.insert("version".to_string(), json!(version));
    domain.insert("chainId".to_string(), json!(chain_id));
    domain.insert("verifyingContract".to_string(), json!(ZERO_ADDRESS));
    domain
}

fn domain_types() -> Types {
    let mut types = Types::new();
    types.insert(
        EIP712_DOMAIN_TYPE.to_string(),
        vec![
            typed_field("name", "string"),
            typed_field("version", "string"),
            typed_field("chainId", "uint256"),
            typed_field("verifyingContract", "address"),
        ],
    );
    types
}
