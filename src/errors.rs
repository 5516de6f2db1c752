use thiserror::Error;

use crate::signature::SignerError;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Client error: status code: {status_code}, error code: {error_code:?}, error message: {error_message}, error data: {error_data:?}")]
    ClientRequest {
        status_code: u16,
        error_code: Option<u16>,
        error_message: String,
        error_data: Option<String>,
    },
    #[error("Server error: status code: {status_code}, error message: {error_message}")]
    ServerRequest {
        status_code: u16,
        error_message: String,
    },
    #[error("Generic request error: {0:?}")]
    GenericRequest(String),
    #[error("Json parse error: {0:?}")]
    JsonParse(String),
    #[error("Rmp parse error: {0:?}")]
    RmpParse(String),
    #[error("Wallet error: {0:?}")]
    Wallet(String),
    #[error("Private key parse error: {0:?}")]
    PrivateKeyParse(String),
    #[error("Invalid derivation path {path:?}: {reason}")]
    InvalidDerivationPath { path: String, reason: String },
    #[error("Invalid validator parameters: {0}")]
    InvalidValidatorParams(String),
    #[error("--{argument} is required for {command}")]
    MissingArgument {
        argument: &'static str,
        command: &'static str,
    },
    #[error("Terminal error: {0}")]
    Terminal(String),
    #[error("Ledger support is not compiled in; rebuild with `--features ledger`")]
    LedgerSupportDisabled,
    #[error(transparent)]
    Signer(#[from] SignerError),
}
