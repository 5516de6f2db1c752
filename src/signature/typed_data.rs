use ethers::types::{
    transaction::eip712::{Eip712DomainType, Types},
    U256,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::signer::SignerError;

/// Name of the domain separator type.
pub const EIP712_DOMAIN_TYPE: &str = "EIP712Domain";

// Member order of an EIP712Domain derived from the domain object alone.
const CANONICAL_DOMAIN_FIELDS: [(&str, &str); 5] = [
    ("name", "string"),
    ("version", "string"),
    ("chainId", "uint256"),
    ("verifyingContract", "address"),
    ("salt", "bytes32"),
];

pub fn typed_field(name: &str, r#type: &str) -> Eip712DomainType {
    Eip712DomainType {
        name: name.to_string(),
        r#type: r#type.to_string(),
    }
}

/// A full `eth_signTypedData_v4` message.
///
/// Field values are JSON so that the same struct carries whatever primary type the
/// exchange uses. The order in which fields are hashed comes from `types`, never from the
/// order of keys in `domain` or `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataPayload {
    pub domain: Map<String, Value>,
    pub types: Types,
    pub primary_type: String,
    pub message: Map<String, Value>,
}

fn malformed(reason: impl Into<String>) -> SignerError {
    SignerError::MalformedTypedData(reason.into())
}

impl TypedDataPayload {
    pub fn new(
        domain: Map<String, Value>,
        types: Types,
        primary_type: impl Into<String>,
        message: Map<String, Value>,
    ) -> Self {
        TypedDataPayload {
            domain,
            types,
            primary_type: primary_type.into(),
            message,
        }
    }

    /// Members of the domain type: the declared `EIP712Domain` entry, or one derived from
    /// the keys present in `domain` when the entry is absent.
    pub fn domain_schema(&self) -> Result<Vec<Eip712DomainType>, SignerError> {
        if let Some(declared) = self.types.get(EIP712_DOMAIN_TYPE) {
            let mut declared_names: Vec<&str> = declared.iter().map(|f| f.name.as_str()).collect();
            let mut domain_names: Vec<&str> = self.domain.keys().map(String::as_str).collect();
            declared_names.sort_unstable();
            domain_names.sort_unstable();
            if declared_names != domain_names {
                return Err(malformed(format!(
                    "domain fields {domain_names:?} do not match the declared {EIP712_DOMAIN_TYPE} fields {declared_names:?}"
                )));
            }
            return Ok(declared.clone());
        }

        if let Some(unknown) = self
            .domain
            .keys()
            .find(|key| !CANONICAL_DOMAIN_FIELDS.iter().any(|(name, _)| *name == key.as_str()))
        {
            return Err(malformed(format!(
                "domain field `{unknown}` needs an explicit {EIP712_DOMAIN_TYPE} type"
            )));
        }
        Ok(CANONICAL_DOMAIN_FIELDS
            .iter()
            .filter(|(name, _)| self.domain.contains_key(*name))
            .map(|(name, ty)| typed_field(name, ty))
            .collect())
    }

    /// The type set used to hash the domain: only the domain type itself.
    pub fn domain_types(&self) -> Result<Types, SignerError> {
        let mut types = Types::new();
        types.insert(EIP712_DOMAIN_TYPE.to_string(), self.domain_schema()?);
        Ok(types)
    }

    /// The type set used to hash the message body, with the domain type removed.
    pub fn message_types(&self) -> Types {
        self.types
            .iter()
            .filter(|(name, _)| name.as_str() != EIP712_DOMAIN_TYPE)
            .map(|(name, fields)| (name.clone(), fields.clone()))
            .collect()
    }

    /// Checks the payload against its own schema without touching any device.
    pub fn validate(&self) -> Result<(), SignerError> {
        if self.primary_type == EIP712_DOMAIN_TYPE {
            return Err(malformed(format!(
                "primary type cannot be {EIP712_DOMAIN_TYPE}"
            )));
        }
        let message_types = self.message_types();
        let primary_fields = message_types.get(&self.primary_type).ok_or_else(|| {
            malformed(format!(
                "primary type `{}` has no entry in `types`",
                self.primary_type
            ))
        })?;

        let domain_types = self.domain_types()?;
        check_fields(
            &domain_types,
            EIP712_DOMAIN_TYPE,
            &domain_types[EIP712_DOMAIN_TYPE],
            &self.domain,
            "domain",
        )?;
        check_fields(
            &message_types,
            &self.primary_type,
            primary_fields,
            &self.message,
            "message",
        )
    }
}

/// `"Foo[3]"` -> `("Foo", Some(3))`, `"Foo[]"` -> `("Foo", None)`.
fn split_array(ty: &str) -> Result<Option<(&str, Option<usize>)>, SignerError> {
    let Some(stripped) = ty.strip_suffix(']') else {
        return Ok(None);
    };
    let (inner, len) = stripped
        .rsplit_once('[')
        .ok_or_else(|| malformed(format!("unbalanced array type `{ty}`")))?;
    if len.is_empty() {
        return Ok(Some((inner, None)));
    }
    let len = len
        .parse::<usize>()
        .map_err(|_| malformed(format!("bad array length in `{ty}`")))?;
    Ok(Some((inner, Some(len))))
}

fn check_fields(
    types: &Types,
    ty: &str,
    fields: &[Eip712DomainType],
    object: &Map<String, Value>,
    at: &str,
) -> Result<(), SignerError> {
    for field in fields {
        let value = object.get(&field.name).ok_or_else(|| {
            malformed(format!("`{at}` is missing field `{}` of `{ty}`", field.name))
        })?;
        check_value(types, &field.r#type, value, &format!("{at}.{}", field.name))?;
    }
    Ok(())
}

fn check_value(types: &Types, ty: &str, value: &Value, at: &str) -> Result<(), SignerError> {
    if let Some((inner, len)) = split_array(ty)? {
        let items = value
            .as_array()
            .ok_or_else(|| malformed(format!("`{at}` must be an array for `{ty}`")))?;
        if let Some(len) = len {
            if items.len() != len {
                return Err(malformed(format!(
                    "`{at}` has {} items, `{ty}` needs {len}",
                    items.len()
                )));
            }
        }
        for (i, item) in items.iter().enumerate() {
            check_value(types, inner, item, &format!("{at}[{i}]"))?;
        }
        return Ok(());
    }

    if let Some(fields) = types.get(ty) {
        let object = value
            .as_object()
            .ok_or_else(|| malformed(format!("`{at}` must be an object of type `{ty}`")))?;
        return check_fields(types, ty, fields, object, at);
    }

    check_atomic(ty, value, at)
}

fn check_atomic(ty: &str, value: &Value, at: &str) -> Result<(), SignerError> {
    let mismatch = || malformed(format!("`{at}` is not a valid `{ty}`: {value}"));
    match ty {
        "address" => match value.as_str().and_then(hex_bytes) {
            Some(bytes) if bytes.len() == 20 => Ok(()),
            _ => Err(mismatch()),
        },
        "bool" => value.is_boolean().then_some(()).ok_or_else(mismatch),
        "string" => value.is_string().then_some(()).ok_or_else(mismatch),
        "bytes" => value
            .as_str()
            .and_then(hex_bytes)
            .map(|_| ())
            .ok_or_else(mismatch),
        _ => {
            if let Some(width) = ty.strip_prefix("bytes") {
                let width = fixed_bytes_width(width)
                    .ok_or_else(|| malformed(format!("type `{ty}` is not defined")))?;
                return match value.as_str().and_then(hex_bytes) {
                    Some(bytes) if bytes.len() == width => Ok(()),
                    _ => Err(mismatch()),
                };
            }
            let (bits, signed) = if let Some(bits) = ty.strip_prefix("uint") {
                (integer_width(bits), false)
            } else if let Some(bits) = ty.strip_prefix("int") {
                (integer_width(bits), true)
            } else {
                (None, false)
            };
            let bits = bits.ok_or_else(|| malformed(format!("type `{ty}` is not defined")))?;
            if integer_fits(value, bits, signed) {
                Ok(())
            } else {
                Err(mismatch())
            }
        }
    }
}

fn hex_bytes(s: &str) -> Option<Vec<u8>> {
    hex::decode(s.strip_prefix("0x")?).ok()
}

fn fixed_bytes_width(width: &str) -> Option<usize> {
    let width = width.parse::<usize>().ok()?;
    (1..=32).contains(&width).then_some(width)
}

fn integer_width(bits: &str) -> Option<usize> {
    if bits.is_empty() {
        return Some(256);
    }
    let bits = bits.parse::<usize>().ok()?;
    (bits % 8 == 0 && (8..=256).contains(&bits)).then_some(bits)
}

/// Decimal or 0x-hex digits, with no sign.
fn parse_magnitude(digits: &str) -> Option<U256> {
    match digits.strip_prefix("0x") {
        Some(hex) if !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()) => {
            U256::from_str_radix(hex, 16).ok()
        }
        Some(_) => None,
        None if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
            U256::from_dec_str(digits).ok()
        }
        None => None,
    }
}

/// Whether `value` is an integer that fits `uint<bits>` (or `int<bits>` when `signed`).
fn integer_fits(value: &Value, bits: usize, signed: bool) -> bool {
    let (negative, magnitude) = match value {
        Value::Number(n) => match (n.as_u64(), n.as_i64()) {
            (Some(n), _) => (false, U256::from(n)),
            (None, Some(n)) => (true, U256::from(n.unsigned_abs())),
            _ => return false,
        },
        Value::String(s) => {
            let (negative, digits) = match s.strip_prefix('-') {
                Some(digits) => (true, digits),
                None => (false, s.as_str()),
            };
            match parse_magnitude(digits) {
                Some(magnitude) => (negative, magnitude),
                None => return false,
            }
        }
        _ => return false,
    };

    if !signed {
        return !negative && (bits == 256 || magnitude < U256::one() << bits);
    }
    // int<bits> spans [-2^(bits-1), 2^(bits-1))
    let bound = U256::one() << (bits - 1);
    if negative {
        magnitude <= bound
    } else {
        magnitude < bound
    }
}
