//! # Booking Client SDK
//!
//! A typed Rust client for the reservation API.

use booking_types::{
    CheckoutRequest, CheckoutResponse, DeadLetter, ReservationView, Service, WebhookAck,
};
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Header carrying the payment provider's webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reservation API client.
pub struct BookingClient {
    base_url: String,
    session_token: Option<String>,
    http: Client,
}

impl BookingClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_token: None,
            http: Client::new(),
        }
    }

    /// Sets the session token sent as a bearer credential.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Lists bookable services.
    pub async fn list_services(&self) -> Result<Vec<Service>, ClientError> {
        self.get("/api/services").await
    }

    /// Starts a hosted checkout for the given service, date and time.
    pub async fn create_checkout(
        &self,
        service_id: &str,
        date: &str,
        time: &str,
    ) -> Result<CheckoutResponse, ClientError> {
        let req = CheckoutRequest::new(service_id, date, time);
        self.post("/api/checkout", &req).await
    }

    /// Lists every reservation (admin only).
    pub async fn list_reservations(&self) -> Result<Vec<ReservationView>, ClientError> {
        self.get("/api/admin/reservations").await
    }

    /// Lists the most recent failed webhook events (admin only).
    pub async fn list_dead_letters(&self, limit: i64) -> Result<Vec<DeadLetter>, ClientError> {
        self.get(&format!("/api/admin/dead-letters?limit={}", limit))
            .await
    }

    /// Delivers a raw provider event to the webhook endpoint.
    ///
    /// The body is sent untouched so that a signature computed over it stays valid.
    pub async fn send_event(
        &self,
        body: impl Into<String>,
        signature: Option<&str>,
    ) -> Result<WebhookAck, ClientError> {
        let mut req = self
            .http
            .post(format!("{}/api/webhook", self.base_url))
            .header("Content-Type", "application/json")
            .body(body.into());
        if let Some(signature) = signature {
            req = req.header(SIGNATURE_HEADER, signature);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let mut req = self.http.get(format!("{}{}", self.base_url, path));
        if let Some(token) = &self.session_token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let mut req = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(token) = &self.session_token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(body),
            })
        }
    }
}

/// Pulls `error` out of a JSON error body, falling back to the raw text.
fn error_message(body: String) -> String {
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = BookingClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = BookingClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_token() {
        let client = BookingClient::new("http://localhost:3000").with_token("sess_abc");
        assert_eq!(client.session_token, Some("sess_abc".to_string()));
    }

    #[test]
    fn test_error_message_from_json_body() {
        let body = r#"{"error":"Service not found","code":404}"#.to_string();
        assert_eq!(error_message(body), "Service not found");
    }

    #[test]
    fn test_error_message_falls_back_to_text() {
        assert_eq!(error_message("Bad Gateway".to_string()), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        let client = BookingClient::new("http://127.0.0.1:1");
        let err = client.list_services().await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
    }
}
