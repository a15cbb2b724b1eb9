use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// One line of a shipment request.
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentLine {
    pub sku: String,
    pub quantity: i32,
}

/// Payload POSTed to the shipping SaaS when an order is submitted.
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentRequest {
    pub order_number: String,
    pub reference_id: Uuid,
    pub lines: Vec<ShipmentLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentResponse {
    pub tracking_number: String,
}

/// Thin client for the external fulfillment API. The API is a black box;
/// any failure surfaces as `ExternalServiceError` (502 at the edge).
#[derive(Clone)]
pub struct ShippingClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ShippingClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client init failed: {}", e)))?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// Creates a shipment and returns the carrier tracking number.
    #[instrument(skip(self, request), fields(order_number = %request.order_number))]
    pub async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<ShipmentResponse, ServiceError> {
        let url = format!("{}/shipments", self.base_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                ServiceError::ExternalServiceError(format!("Shipping API unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ExternalServiceError(format!(
                "Shipping API returned {}: {}",
                status, body
            )));
        }

        let shipment: ShipmentResponse = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("Malformed shipping API response: {}", e))
        })?;

        info!(tracking_number = %shipment.tracking_number, "Shipment created");
        Ok(shipment)
    }
}
