use ethers::types::Address;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    info::{Delegation, DelegatorReward, DelegatorSummary},
    prelude::*,
    req::HttpClient,
    BaseUrl, Error,
};

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
#[serde(tag = "type")]
pub enum InfoRequest {
    DelegatorSummary { user: Address },
    Delegations { user: Address },
    DelegatorRewards { user: Address },
}

pub struct InfoClient {
    pub http_client: HttpClient,
}

impl InfoClient {
    pub fn new(client: Option<Client>, base_url: Option<BaseUrl>) -> InfoClient {
        InfoClient {
            http_client: HttpClient::new(client, base_url.unwrap_or(BaseUrl::Mainnet)),
        }
    }

    async fn send_info_request<T: for<'a> Deserialize<'a>>(
        &self,
        info_request: InfoRequest,
    ) -> Result<T> {
        let data =
            serde_json::to_string(&info_request).map_err(|e| Error::JsonParse(e.to_string()))?;
        debug!("Info request {data}");

        let return_data = self.http_client.post("/info", data).await?;
        serde_json::from_str(&return_data).map_err(|e| Error::JsonParse(e.to_string()))
    }

    /// Delegated, undelegated and pending-withdrawal totals.
    pub async fn user_staking_summary(&self, address: Address) -> Result<DelegatorSummary> {
        let input = InfoRequest::DelegatorSummary { user: address };
        self.send_info_request(input).await
    }

    /// One entry per validator the user delegates to.
    pub async fn user_staking_delegations(&self, address: Address) -> Result<Vec<Delegation>> {
        let input = InfoRequest::Delegations { user: address };
        self.send_info_request(input).await
    }

    /// Reward history, most recent first.
    pub async fn user_staking_rewards(&self, address: Address) -> Result<Vec<DelegatorReward>> {
        let input = InfoRequest::DelegatorRewards { user: address };
        self.send_info_request(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_info_request_format() {
        let user = Address::from_str("0xcd49bbac6e85fdeb167eb7ca41a945d2b8758f6f").unwrap();
        assert_eq!(
            serde_json::to_value(InfoRequest::DelegatorSummary { user }).unwrap(),
            json!({"type": "delegatorSummary", "user": "0xcd49bbac6e85fdeb167eb7ca41a945d2b8758f6f"})
        );
        assert_eq!(
            serde_json::to_value(InfoRequest::Delegations { user }).unwrap()["type"],
            "delegations"
        );
        assert_eq!(
            serde_json::to_value(InfoRequest::DelegatorRewards { user }).unwrap()["type"],
            "delegatorRewards"
        );
    }

    #[test]
    fn test_parse_staking_responses() {
        let summary: DelegatorSummary = serde_json::from_str(
            r#"{"delegated":"12060.16529862","undelegated":"0.0","totalPendingWithdrawal":"0.0","nPendingWithdrawals":0}"#,
        )
        .unwrap();
        assert_eq!(summary.delegated, "12060.16529862");
        assert_eq!(summary.n_pending_withdrawals, 0);

        let delegations: Vec<Delegation> = serde_json::from_str(
            r#"[{"validator":"0x5ac99df645f3414876c816caa18b2d234024b487","amount":"12060.16529862","lockedUntilTimestamp":1735466781353}]"#,
        )
        .unwrap();
        assert_eq!(delegations[0].locked_until_timestamp, 1_735_466_781_353);

        let rewards: Vec<DelegatorReward> = serde_json::from_str(
            r#"[{"time":1736726400073,"source":"delegation","totalAmount":"0.73117184"}]"#,
        )
        .unwrap();
        assert_eq!(rewards[0].source, "delegation");
    }
}
