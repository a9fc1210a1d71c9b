//! Inventory client for the inventory service's HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use common::ProductCode;
use inventory::{AdjustOutcome, InventoryRecord, StockAdjustment};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::error::SagaError;
use crate::services::inventory::InventoryClient;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    available: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TryAdjustBody<'a> {
    product_code: &'a ProductCode,
    delta: i64,
}

/// Talks to a remote inventory service.
///
/// Every call is bounded by the configured timeout; timeouts and connection
/// failures become [`SagaError::Dependency`].
#[derive(Debug, Clone)]
pub struct HttpInventoryClient {
    client: Client,
    base_url: Url,
}

impl HttpInventoryClient {
    /// Creates a client for the service at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SagaError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SagaError::Validation(format!("invalid inventory URL {base_url}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SagaError::Dependency(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Gets the service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SagaError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                SagaError::Validation(format!("inventory URL {} cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, SagaError> {
        request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Inventory request failed");
            SagaError::Dependency(e.to_string())
        })
    }

    async fn error_from(response: Response) -> SagaError {
        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("inventory service returned {status}"),
        };

        if status == StatusCode::BAD_REQUEST {
            SagaError::Validation(message)
        } else {
            SagaError::Dependency(message)
        }
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, SagaError> {
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| SagaError::Dependency(format!("malformed inventory response: {e}")))
    }
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    async fn check_available(
        &self,
        product_code: &ProductCode,
        quantity: i64,
    ) -> Result<bool, SagaError> {
        let mut url = self.url(&["inventory", product_code.as_str(), "available"])?;
        url.query_pairs_mut()
            .append_pair("quantity", &quantity.to_string());

        let response = self.send(self.client.get(url)).await?;
        Self::json(response).await
    }

    async fn adjust(
        &self,
        product_code: &ProductCode,
        delta: i64,
    ) -> Result<InventoryRecord, SagaError> {
        let url = self.url(&["inventory", "adjust"])?;
        let body = StockAdjustment::pieces(product_code.clone(), delta);

        let response = self.send(self.client.post(url).json(&body)).await?;
        Self::json(response).await
    }

    async fn try_adjust(
        &self,
        product_code: &ProductCode,
        delta: i64,
    ) -> Result<AdjustOutcome, SagaError> {
        let url = self.url(&["inventory", "try-adjust"])?;
        let body = TryAdjustBody {
            product_code,
            delta,
        };

        let response = match self.client.post(url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                if outcome_unknown(&e) {
                    tracing::error!(
                        %product_code,
                        delta,
                        error = %e,
                        "Conditional adjustment outcome unknown, manual reconciliation required"
                    );
                } else {
                    tracing::warn!(error = %e, "Inventory request failed");
                }
                return Err(SagaError::Dependency(e.to_string()));
            }
        };
        if response.status() == StatusCode::CONFLICT {
            let body: ErrorBody = response
                .json()
                .await
                .map_err(|e| SagaError::Dependency(format!("malformed inventory response: {e}")))?;
            return Ok(AdjustOutcome::Insufficient {
                available: body.available.unwrap_or(0),
            });
        }

        Ok(AdjustOutcome::Applied(Self::json(response).await?))
    }

    async fn get_quantity(&self, product_code: &ProductCode) -> Result<i64, SagaError> {
        let url = self.url(&["inventory", product_code.as_str(), "quantity"])?;
        let response = self.send(self.client.get(url)).await?;
        Self::json(response).await
    }
}

/// True when the request may have reached the service before failing, so
/// a mutation it carried may or may not have been applied.
fn outcome_unknown(err: &reqwest::Error) -> bool {
    !err.is_connect() && !err.is_builder()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpInventoryClient {
        HttpInventoryClient::new(base, Duration::from_millis(100)).unwrap()
    }

    #[test]
    fn test_urls_escape_product_codes() {
        let url = client("http://localhost:3001")
            .url(&["inventory", "A B/C", "quantity"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3001/inventory/A%20B%2FC/quantity"
        );
    }

    #[test]
    fn test_urls_keep_base_path() {
        let url = client("http://localhost:3001/api/")
            .url(&["inventory", "adjust"])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/api/inventory/adjust");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let result = HttpInventoryClient::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(SagaError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_dependency_error() {
        // Port 9 (discard) is not expected to have an HTTP listener.
        let client = client("http://127.0.0.1:9");
        let result = client.get_quantity(&ProductCode::new("WIDGET")).await;
        assert!(matches!(result, Err(SagaError::Dependency(_))));
    }

    #[tokio::test]
    async fn test_refused_connection_has_known_outcome() {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:9/inventory")
            .send()
            .await
            .unwrap_err();
        assert!(!outcome_unknown(&err));
    }

    #[tokio::test]
    async fn test_timed_out_adjustment_has_unknown_outcome() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = client(&format!("http://{addr}"));
        let result = client.try_adjust(&ProductCode::new("WIDGET"), -1).await;
        assert!(matches!(result, Err(SagaError::Dependency(_))));

        let err = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap()
            .post(format!("http://{addr}/inventory/try-adjust"))
            .send()
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(outcome_unknown(&err));

        server.abort();
    }
}
