pub mod cli;
mod consts;
pub mod device;
mod errors;
pub mod exchange;
mod helpers;
pub mod info;
pub mod prelude;
mod req;
pub mod signature;

pub use consts::{
    DEFAULT_DEVICE_TIMEOUT_SECS, LOCAL_API_URL, MAINNET_API_URL, TESTNET_API_URL, WEI_PER_HYPE,
};
pub use device::{AccountHandle, DerivationPath, DeviceError, DeviceTransport, SignerKind};
pub use errors::Error;
pub use exchange::*;
pub use helpers::{format_hype, next_nonce, BaseUrl};
pub use info::{info_client::*, *};
pub use signature::{
    Eip712Hasher, HashPair, SignatureTriple, SignerError, TypedDataHasher, TypedDataPayload,
    TypedDataSigner,
};
