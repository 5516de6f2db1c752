//! Validator registration and profile parameters.
//!
//! Both commands take JSON in one of two shapes: a flat object (`"node_ip": "1.2.3.4"`)
//! or the exchange's own nested shape (`"node_ip": {"Ip": "1.2.3.4"}`, with the
//! registration profile under `"profile"`). Either is normalized to the wire records
//! below.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{prelude::*, Error};

pub const MAX_COMMISSION_BPS: u64 = 10_000;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NodeIp {
    #[serde(rename = "Ip")]
    pub ip: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ValidatorProfile {
    pub node_ip: NodeIp,
    pub name: String,
    pub description: String,
    pub delegations_disabled: bool,
    pub commission_bps: u64,
    pub signer: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ValidatorRegistration {
    pub profile: ValidatorProfile,
    pub unjailed: bool,
    pub initial_wei: u64,
}

/// Fields left as `None` are sent as `null` and stay unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ValidatorProfileChange {
    #[serde(default)]
    pub node_ip: Option<NodeIp>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub unjailed: bool,
    #[serde(default)]
    pub disable_delegations: Option<bool>,
    #[serde(default)]
    pub commission_bps: Option<u64>,
    #[serde(default)]
    pub signer: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct FlatRegistration {
    node_ip: String,
    name: String,
    description: String,
    delegations_disabled: bool,
    commission_bps: u64,
    signer: String,
    unjailed: bool,
    initial_wei: u64,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct FlatProfileChange {
    #[serde(default)]
    node_ip: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    unjailed: bool,
    #[serde(default)]
    disable_delegations: Option<bool>,
    #[serde(default)]
    commission_bps: Option<u64>,
    #[serde(default)]
    signer: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum RegistrationParams {
    Api(ValidatorRegistration),
    Flat(FlatRegistration),
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum ProfileChangeParams {
    Api(ValidatorProfileChange),
    Flat(FlatProfileChange),
}

impl From<FlatRegistration> for ValidatorRegistration {
    fn from(flat: FlatRegistration) -> Self {
        ValidatorRegistration {
            profile: ValidatorProfile {
                node_ip: NodeIp { ip: flat.node_ip },
                name: flat.name,
                description: flat.description,
                delegations_disabled: flat.delegations_disabled,
                commission_bps: flat.commission_bps,
                signer: flat.signer,
            },
            unjailed: flat.unjailed,
            initial_wei: flat.initial_wei,
        }
    }
}

impl From<FlatProfileChange> for ValidatorProfileChange {
    fn from(flat: FlatProfileChange) -> Self {
        ValidatorProfileChange {
            node_ip: flat.node_ip.map(|ip| NodeIp { ip }),
            name: flat.name,
            description: flat.description,
            unjailed: flat.unjailed,
            disable_delegations: flat.disable_delegations,
            commission_bps: flat.commission_bps,
            signer: flat.signer,
        }
    }
}

fn parse_json(json: &str) -> Result<Value> {
    serde_json::from_str(json).map_err(|e| Error::InvalidValidatorParams(format!("invalid JSON: {e}")))
}

// An untagged union only reports "did not match any variant", so the flat shape is
// re-parsed to name the missing or mistyped field.
fn shape_error<Flat: for<'de> Deserialize<'de>>(value: Value) -> Error {
    let reason = match serde_json::from_value::<Flat>(value) {
        Err(e) => e.to_string(),
        Ok(_) => "parameters match neither the flat nor the API shape".to_string(),
    };
    Error::InvalidValidatorParams(reason)
}

fn check_commission(commission_bps: u64) -> Result<()> {
    if commission_bps > MAX_COMMISSION_BPS {
        return Err(Error::InvalidValidatorParams(format!(
            "commission_bps must be at most {MAX_COMMISSION_BPS}, got {commission_bps}"
        )));
    }
    Ok(())
}

fn check_signer(signer: &str) -> Result<()> {
    let valid = signer
        .strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);
    if !valid {
        return Err(Error::InvalidValidatorParams(format!(
            "signer must be a 0x-prefixed 20-byte address, got {signer:?}"
        )));
    }
    Ok(())
}

impl ValidatorRegistration {
    pub fn from_json(json: &str) -> Result<Self> {
        let value = parse_json(json)?;
        let registration = match serde_json::from_value::<RegistrationParams>(value.clone()) {
            Ok(RegistrationParams::Api(registration)) => registration,
            Ok(RegistrationParams::Flat(flat)) => flat.into(),
            Err(_) => return Err(shape_error::<FlatRegistration>(value)),
        };
        registration.validate()?;
        Ok(registration)
    }

    pub fn validate(&self) -> Result<()> {
        check_commission(self.profile.commission_bps)?;
        check_signer(&self.profile.signer)
    }
}

impl ValidatorProfileChange {
    pub fn from_json(json: &str) -> Result<Self> {
        let value = parse_json(json)?;
        let change = match serde_json::from_value::<ProfileChangeParams>(value.clone()) {
            Ok(ProfileChangeParams::Api(change)) => change,
            Ok(ProfileChangeParams::Flat(flat)) => flat.into(),
            Err(_) => return Err(shape_error::<FlatProfileChange>(value)),
        };
        change.validate()?;
        Ok(change)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(commission_bps) = self.commission_bps {
            check_commission(commission_bps)?;
        }
        if let Some(signer) = &self.signer {
            check_signer(signer)?;
        }
        Ok(())
    }
}
