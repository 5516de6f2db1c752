pub const MAINNET_API_URL: &str = "https://api.hyperliquid.xyz";
pub const TESTNET_API_URL: &str = "https://api.hyperliquid-testnet.xyz";
pub const LOCAL_API_URL: &str = "http://localhost:3001";

/// Staking amounts are expressed in base units: 1 HYPE = 1e8 wei.
pub const WEI_PER_HYPE: u64 = 100_000_000;

/// How long the CLI waits for the user to approve on the device.
pub const DEFAULT_DEVICE_TIMEOUT_SECS: u64 = 300;

// L1 actions are signed as a phantom agent under this domain
pub(crate) const L1_DOMAIN_NAME: &str = "Exchange";
pub(crate) const L1_DOMAIN_VERSION: &str = "1";
pub(crate) const L1_CHAIN_ID: u64 = 1337;

// user-signed actions (cDeposit / cWithdraw)
pub(crate) const USER_SIGNED_DOMAIN_NAME: &str = "HyperliquidSignTransaction";
pub(crate) const USER_SIGNED_DOMAIN_VERSION: &str = "1";
pub(crate) const SIGNATURE_CHAIN_ID: u64 = 0x66eee;

pub(crate) const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
