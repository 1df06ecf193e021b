/// Market-data service client
///
/// Thin specialization of [`ApiClient`] bound to the token/wallet endpoints.
/// Response shapes are relayed as raw JSON; interpreting them is the
/// caller's concern.
use serde_json::Value;

use crate::apis::client::ApiClient;
use crate::apis::descriptor::RequestDescriptor;
use crate::errors::GatewayResult;

pub struct MarketDataClient {
    client: ApiClient,
}

impl MarketDataClient {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Market cap summary for a token unit
    pub async fn token_mcap(&self, unit: &str) -> GatewayResult<Value> {
        let descriptor = RequestDescriptor::get("token/mcap").with_param("unit", unit);
        self.client.request(&descriptor).await
    }

    /// Paged holder list for a token unit
    pub async fn token_holders(&self, unit: &str, page: Option<u32>) -> GatewayResult<Value> {
        let descriptor = RequestDescriptor::get("token/holders")
            .with_param("unit", unit)
            .with_param("page", page.map_or(Value::Null, Value::from));
        self.client.request(&descriptor).await
    }

    /// Portfolio positions for a wallet address
    pub async fn wallet_portfolio(&self, address: &str) -> GatewayResult<Value> {
        let descriptor =
            RequestDescriptor::get("wallet/portfolio/positions").with_param("address", address);
        self.client.request(&descriptor).await
    }
}
