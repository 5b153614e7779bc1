use super::types::*;
use crate::errors::{EngineError, EngineResult};
use reqwest::Client;

/// Upstox REST API client. All methods return Result, never panic.
/// No retries here -- retry policy belongs to the caller, not the engine.
#[derive(Clone)]
pub struct UpstoxClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl UpstoxClient {
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .pool_max_idle_per_host(4)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    async fn auth_get<T: serde::de::DeserializeOwned>(&self, path: &str) -> EngineResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::UpstoxApi {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>().await.map_err(|e| EngineError::Parse(format!("GET {path}: {e}")))
    }

    async fn auth_post<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> EngineResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::UpstoxApi {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>().await.map_err(|e| EngineError::Parse(format!("POST {path}: {e}")))
    }

    /// Distinct expiry dates for an underlying, ascending. Empty if none listed.
    pub async fn get_expiries(&self, instrument_key: &str) -> EngineResult<Vec<String>> {
        let path = format!("/option/contract?instrument_key={}", urlencode(instrument_key));
        let resp: ContractResponse = self.auth_get(&path).await?;
        let mut expiries: Vec<String> = resp
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| c.expiry)
            .collect();
        expiries.sort();
        expiries.dedup();
        Ok(expiries)
    }

    /// Raw per-strike chain snapshot for one underlying + expiry.
    pub async fn get_option_chain(
        &self,
        instrument_key: &str,
        expiry_date: &str,
    ) -> EngineResult<Vec<RawStrikeRecord>> {
        let path = format!(
            "/option/chain?instrument_key={}&expiry_date={expiry_date}",
            urlencode(instrument_key)
        );
        let resp: OptionChainResponse = self.auth_get(&path).await?;
        Ok(resp.data.unwrap_or_default())
    }

    pub async fn place_order(&self, order: &OrderRequest) -> EngineResult<OrderData> {
        let resp: PlaceOrderResponse = self.auth_post("/order/place", order).await?;
        resp.data
            .ok_or_else(|| EngineError::Parse("order response missing data".into()))
    }

    pub async fn get_funds_and_margin(&self) -> EngineResult<FundsData> {
        let resp: FundsResponse = self.auth_get("/user/get-funds-and-margin").await?;
        Ok(resp.data.unwrap_or_default())
    }
}

/// Minimal percent-encoding for instrument keys ("NSE_INDEX|Nifty 50").
fn urlencode(s: &str) -> String {
    s.replace('|', "%7C").replace(' ', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlencode_instrument_key() {
        assert_eq!(urlencode("NSE_INDEX|Nifty 50"), "NSE_INDEX%7CNifty%2050");
    }
}
