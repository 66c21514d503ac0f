use anyhow::bail;

use crate::models::attribution::AttributionOrder;

/// Client for the marketing-attribution API. Callers treat every failure as
/// non-fatal; this type only reports them.
pub struct AttributionApi {
    url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl AttributionApi {
    pub fn new(url: String, token: Option<String>) -> Self {
        AttributionApi {
            url,
            token,
            client: reqwest::Client::new(),
        }
    }

    pub async fn send_order(&self, order: &AttributionOrder) -> Result<(), anyhow::Error> {
        let mut request = self.client.post(&self.url).json(order);
        if let Some(token) = &self.token {
            request = request.header("x-api-token", token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("attribution service returned http {}: {}", status, body);
        }

        Ok(())
    }
}
