use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::transport::{DeliveryError, PushTransport};

#[derive(Serialize)]
struct PushPayload<'a> {
    user_id: Uuid,
    title: &'a str,
    body: &'a str,
}

/// Posts push messages to an HTTP push gateway.
#[derive(Clone)]
pub struct HttpPushTransport {
    client: Client,
    gateway_url: Option<String>,
}

impl HttpPushTransport {
    pub fn new(gateway_url: Option<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .user_agent("RentalEnquiries/1.0")
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Push(format!("failed to build push http client: {e}")))?;

        if gateway_url.is_none() {
            tracing::warn!("PUSH_GATEWAY_URL not set, push notifications will fail");
        }

        Ok(Self { client, gateway_url })
    }
}

impl PushTransport for HttpPushTransport {
    #[tracing::instrument(skip(self, title, body), fields(%user_id))]
    async fn send(&self, user_id: Uuid, title: &str, body: &str) -> Result<(), DeliveryError> {
        let url = self
            .gateway_url
            .as_deref()
            .ok_or(DeliveryError::NotConfigured("push"))?;

        let response = self
            .client
            .post(url)
            .json(&PushPayload { user_id, title, body })
            .send()
            .await
            .map_err(|e| DeliveryError::Push(e.to_string()))?;

        if !response.status().is_success() {
            tracing::warn!(status = response.status().as_u16(), "push gateway rejected message");
            return Err(DeliveryError::HttpStatus(response.status().as_u16()));
        }

        tracing::debug!("push message accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_posts_payload() {
        let server = MockServer::start().await;
        let user_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/push"))
            .and(body_partial_json(serde_json::json!({
                "user_id": user_id,
                "title": "New Enquiry",
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let transport =
            HttpPushTransport::new(Some(format!("{}/push", server.uri())), Duration::from_secs(5)).unwrap();
        let result = transport.send(user_id, "New Enquiry", "You have a new enquiry").await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_send_maps_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let transport = HttpPushTransport::new(Some(server.uri()), Duration::from_secs(5)).unwrap();
        let result = transport.send(Uuid::new_v4(), "t", "b").await;

        assert!(matches!(result, Err(DeliveryError::HttpStatus(503))));
    }

    #[tokio::test]
    async fn test_send_without_gateway_fails() {
        let transport = HttpPushTransport::new(None, Duration::from_secs(5)).unwrap();
        let result = transport.send(Uuid::new_v4(), "t", "b").await;

        assert!(matches!(result, Err(DeliveryError::NotConfigured("push"))));
    }
}
