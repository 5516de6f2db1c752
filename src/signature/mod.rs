//! EIP-712 signing through a hardware device.
//!
//! [`TypedDataSigner`] turns a [`TypedDataPayload`] into the pair of 32-byte hashes
//! (domain separator, struct hash) with a [`TypedDataHasher`], hands that pair to a
//! [`DeviceTransport`](crate::device::DeviceTransport) and returns the `(r, s, v)` triple
//! the exchange expects in its signature objects.

mod agent;
mod hasher;
mod signer;
mod typed_data;

pub(crate) use agent::{l1_payload, user_signed_payload};
pub use agent::{phantom_agent_source, Agent};
pub use hasher::{Eip712Hasher, HashPair, TypedDataHasher};
pub use signer::{SignatureTriple, SignerError, TypedDataSigner};
pub use typed_data::{typed_field, TypedDataPayload, EIP712_DOMAIN_TYPE};
