use crate::consts::{LOCAL_API_URL, MAINNET_API_URL, TESTNET_API_URL, WEI_PER_HYPE};
use chrono::Utc;
use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

static CUR_NONCE: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp nonce, strictly increasing within the process.
pub fn next_nonce() -> u64 {
    let now_ms = Utc::now().timestamp_millis() as u64;
    let prev = CUR_NONCE.fetch_max(now_ms, Ordering::Relaxed);
    if prev < now_ms {
        return now_ms;
    }
    let nonce = CUR_NONCE.fetch_add(1, Ordering::Relaxed) + 1;
    if nonce > now_ms + 1000 {
        info!("nonce progressed too far ahead {nonce} {now_ms}");
    }
    nonce
}

/// Renders a wei amount as HYPE, e.g. `150000000` -> `"1.5"`.
pub fn format_hype(wei: u64) -> String {
    let whole = wei / WEI_PER_HYPE;
    let frac = wei % WEI_PER_HYPE;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:08}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BaseUrl {
    Localhost,
    Testnet,
    Mainnet,
}

impl BaseUrl {
    pub fn get_url(&self) -> String {
        match self {
            BaseUrl::Localhost => LOCAL_API_URL.to_string(),
            BaseUrl::Mainnet => MAINNET_API_URL.to_string(),
            BaseUrl::Testnet => TESTNET_API_URL.to_string(),
        }
    }

    pub fn is_mainnet(&self) -> bool {
        matches!(self, BaseUrl::Mainnet)
    }

    /// Chain name embedded in user-signed actions.
    pub fn hyperliquid_chain(&self) -> &'static str {
        if self.is_mainnet() {
            "Mainnet"
        } else {
            "Testnet"
        }
    }

    pub fn network_name(&self) -> &'static str {
        match self {
            BaseUrl::Localhost => "LOCALHOST",
            BaseUrl::Testnet => "TESTNET",
            BaseUrl::Mainnet => "MAINNET",
        }
    }
}
