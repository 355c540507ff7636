//! Hosted payment provider client.
//!
//! Checkout hands off to an externally hosted payment page: the storefront
//! creates a checkout session against the provider's REST API and redirects
//! the browser to the returned URL. Payment internals (capture, webhooks,
//! refunds) are the provider's problem, not ours.

use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use marigold_core::CurrencyCode;

use crate::config::PaymentConfig;

/// Errors from the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error payload.
    #[error("provider error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Provider response carried no session handle.
    #[error("provider response missing session id")]
    MissingSessionId,
}

/// A line item in a payment session, priced in the currency's standard unit.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentLineItem {
    pub name: String,
    pub unit_amount: Decimal,
    pub quantity: u32,
}

/// Request body for creating a checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentSessionRequest {
    pub currency: CurrencyCode,
    pub line_items: Vec<PaymentLineItem>,
    pub shipping_label: String,
    pub shipping_amount: Decimal,
    pub discount_amount: Decimal,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Client-generated key so a double-submit cannot create two sessions.
    pub idempotency_key: Uuid,
}

/// A created payment session: the handle plus the hosted page to redirect to.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponseBody {
    id: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponseBody {
    error: Option<String>,
}

/// Client for the hosted payment provider API.
#[derive(Clone)]
pub struct PaymentClient {
    inner: Arc<PaymentClientInner>,
}

struct PaymentClientInner {
    client: reqwest::Client,
    endpoint: String,
    secret_key: String,
}

impl PaymentClient {
    /// Create a new payment client.
    #[must_use]
    pub fn new(config: &PaymentConfig) -> Self {
        let endpoint = format!("{}/v1/checkout/sessions", config.api_url.trim_end_matches('/'));

        Self {
            inner: Arc::new(PaymentClientInner {
                client: reqwest::Client::new(),
                endpoint,
                secret_key: config.secret_key.expose_secret().to_string(),
            }),
        }
    }

    /// Create a checkout session and return its handle and hosted-page URL.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Http` on transport failure, `PaymentError::Api`
    /// when the provider rejects the request, and
    /// `PaymentError::MissingSessionId` when the response carries no handle.
    #[instrument(skip(self, request), fields(items = request.line_items.len()))]
    pub async fn create_checkout_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> Result<PaymentSession, PaymentError> {
        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .bearer_auth(&self.inner.secret_key)
            .header("Idempotency-Key", request.idempotency_key.to_string())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Error bodies are not always JSON (gateway HTML, empty 502);
            // keep the status and salvage whatever message is there.
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body: SessionResponseBody = response.json().await?;

        let (Some(id), Some(url)) = (body.id, body.url) else {
            return Err(PaymentError::MissingSessionId);
        };

        debug!(session_id = %id, "payment session created");
        Ok(PaymentSession { id, url })
    }
}

/// Best-effort message from an error body: the JSON `error` field when the
/// body parses, otherwise the raw text truncated to 200 characters, otherwise
/// a generic fallback.
fn error_message(body: &str) -> String {
    if let Ok(ErrorResponseBody { error: Some(error) }) = serde_json::from_str(body)
        && !error.is_empty()
    {
        return error;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "unknown provider error".to_owned();
    }

    let mut message: String = trimmed.chars().take(200).collect();
    if trimmed.chars().count() > 200 {
        message.push_str("...");
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_error_display() {
        let err = PaymentError::Api {
            status: 402,
            message: "card declined".to_owned(),
        };
        assert_eq!(err.to_string(), "provider error (402): card declined");
        assert_eq!(
            PaymentError::MissingSessionId.to_string(),
            "provider response missing session id"
        );
    }

    #[test]
    fn test_error_message_prefers_json_error_field() {
        assert_eq!(
            error_message(r#"{"error": "card declined"}"#),
            "card declined"
        );
    }

    #[test]
    fn test_error_message_salvages_non_json_bodies() {
        assert_eq!(
            error_message("<html><body>502 Bad Gateway</body></html>"),
            "<html><body>502 Bad Gateway</body></html>"
        );

        let long = "x".repeat(300);
        let salvaged = error_message(&long);
        assert_eq!(salvaged.chars().count(), 203);
        assert!(salvaged.ends_with("..."));
    }

    #[test]
    fn test_error_message_falls_back_when_body_is_empty() {
        assert_eq!(error_message(""), "unknown provider error");
        assert_eq!(error_message("  \n"), "unknown provider error");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = PaymentConfig {
            api_url: "https://pay.test/".to_owned(),
            public_key: "pk".to_owned(),
            secret_key: secrecy::SecretString::from("sk"),
        };
        let client = PaymentClient::new(&config);
        assert_eq!(client.inner.endpoint, "https://pay.test/v1/checkout/sessions");
    }
}
