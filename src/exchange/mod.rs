mod actions;
mod exchange_client;
mod exchange_responses;
mod validator;

pub use actions::{Actions, CSignerAction, CValidatorAction, StakingTransfer};
pub use exchange_client::*;
pub use exchange_responses::*;
pub use validator::{
    NodeIp, ValidatorProfile, ValidatorProfileChange, ValidatorRegistration, MAX_COMMISSION_BPS,
};
