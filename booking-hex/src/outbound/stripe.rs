//! Hosted checkout adapter for the Stripe API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use booking_types::{CheckoutGateway, CheckoutSession, CheckoutSessionRequest, GatewayError};

/// Default public API origin.
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Creates one-item payment sessions through `POST /v1/checkout/sessions`.
pub struct StripeCheckout {
    api_base: String,
    secret_key: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl StripeCheckout {
    pub fn new(api_base: impl Into<String>, secret_key: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            http,
        })
    }
}

/// Flattens a session request into the provider's bracketed form encoding.
pub fn session_form(req: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let item = "line_items[0]";
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        (
            format!("{item}[price_data][currency]"),
            req.currency.provider_code().to_string(),
        ),
        (
            format!("{item}[price_data][product_data][name]"),
            req.service.name.clone(),
        ),
        (
            format!("{item}[price_data][product_data][description]"),
            req.description.clone(),
        ),
        (
            format!("{item}[price_data][unit_amount]"),
            req.service.price.to_string(),
        ),
        (format!("{item}[quantity]"), "1".to_string()),
        ("success_url".to_string(), req.success_url.clone()),
        ("cancel_url".to_string(), req.cancel_url.clone()),
    ];
    form.extend(
        req.metadata
            .to_pairs()
            .into_iter()
            .map(|(key, value)| (format!("metadata[{key}]"), value)),
    );
    form
}

#[async_trait]
impl CheckoutGateway for StripeCheckout {
    #[tracing::instrument(skip(self, req), fields(service_id = %req.service.id))]
    async fn create_session(
        &self,
        req: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let resp = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&session_form(&req))
            .send()
            .await
            .map_err(|e| GatewayError::Provider(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GatewayError::Provider(format!("HTTP {}: {}", status, message)));
        }

        let session: SessionResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Provider(e.to_string()))?;
        let url = session
            .url
            .ok_or_else(|| GatewayError::Provider("session has no redirect URL".into()))?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_types::{BookingMetadata, Currency, Service};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    fn request() -> CheckoutSessionRequest {
        let service = Service::new("spa", "Head Spa", 4000, 45).unwrap();
        CheckoutSessionRequest {
            metadata: BookingMetadata {
                user_id: "u1".into(),
                service_id: service.id.clone(),
                reservation_date: Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap(),
                service_duration: 45,
            },
            service,
            currency: Currency::JPY,
            description: "2024-06-01 14:00".into(),
            success_url: "http://localhost:3000/success?session_id={CHECKOUT_SESSION_ID}".into(),
            cancel_url: "http://localhost:3000/book".into(),
        }
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_session_form_line_item() {
        let form = session_form(&request());

        assert_eq!(value(&form, "mode"), Some("payment"));
        assert_eq!(value(&form, "line_items[0][price_data][currency]"), Some("jpy"));
        assert_eq!(
            value(&form, "line_items[0][price_data][product_data][name]"),
            Some("Head Spa")
        );
        assert_eq!(
            value(&form, "line_items[0][price_data][product_data][description]"),
            Some("2024-06-01 14:00")
        );
        assert_eq!(value(&form, "line_items[0][price_data][unit_amount]"), Some("4000"));
        assert_eq!(value(&form, "line_items[0][quantity]"), Some("1"));
    }

    #[test]
    fn test_session_form_metadata() {
        let form = session_form(&request());

        assert_eq!(value(&form, "metadata[userId]"), Some("u1"));
        assert_eq!(value(&form, "metadata[serviceId]"), Some("spa"));
        assert_eq!(
            value(&form, "metadata[reservationDate]"),
            Some("2024-06-01T14:00:00.000Z")
        );
        assert_eq!(value(&form, "metadata[serviceDuration]"), Some("45"));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_a_provider_error() {
        let gateway = StripeCheckout::new("http://127.0.0.1:1", "sk_test").unwrap();

        let result = gateway.create_session(request()).await;

        assert!(matches!(result, Err(GatewayError::Provider(_))));
    }

    fn gateway_for(server: &MockServer) -> StripeCheckout {
        StripeCheckout::new(server.uri(), "sk_test_123").unwrap()
    }

    #[tokio::test]
    async fn test_create_session_posts_form_and_decodes_session() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/checkout/sessions"))
            .and(matchers::header("authorization", "Bearer sk_test_123"))
            .and(matchers::header("content-type", "application/x-www-form-urlencoded"))
            .and(matchers::body_string_contains(
                "metadata%5BreservationDate%5D=2024-06-01T14%3A00%3A00.000Z",
            ))
            .and(matchers::body_string_contains("metadata%5BserviceDuration%5D=45"))
            .and(matchers::body_string_contains(
                "line_items%5B0%5D%5Bprice_data%5D%5Bunit_amount%5D=4000",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_abc",
                "object": "checkout.session",
                "url": "https://checkout.stripe.com/c/pay/cs_test_abc",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = gateway_for(&server)
            .create_session(request())
            .await
            .unwrap();

        assert_eq!(session.id, "cs_test_abc");
        assert_eq!(session.url, "https://checkout.stripe.com/c/pay/cs_test_abc");
    }

    #[tokio::test]
    async fn test_provider_error_message_is_extracted() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "type": "invalid_request_error",
                    "message": "Invalid currency: xyz",
                }
            })))
            .mount(&server)
            .await;

        let result = gateway_for(&server).create_session(request()).await;

        match result {
            Err(GatewayError::Provider(msg)) => {
                assert!(msg.contains("400"), "{msg}");
                assert!(msg.ends_with("Invalid currency: xyz"), "{msg}");
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body_is_kept_verbatim() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let result = gateway_for(&server).create_session(request()).await;

        match result {
            Err(GatewayError::Provider(msg)) => assert!(msg.ends_with("upstream unavailable")),
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_session_without_redirect_url_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": "cs_test_abc", "url": null })),
            )
            .mount(&server)
            .await;

        let result = gateway_for(&server).create_session(request()).await;

        assert_eq!(
            result.err(),
            Some(GatewayError::Provider("session has no redirect URL".into()))
        );
    }
}
