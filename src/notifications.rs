use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

/// Outbound notification delivery. Implementations must be fire-and-forget:
/// a delivery failure is logged and never surfaced to the caller, so it can
/// never block or roll back a business operation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_login_code(&self, email: &str, code: &str);
}

/// Notifier that posts JSON payloads to an email-gateway endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_login_code(&self, email: &str, code: &str) {
        let payload = json!({
            "type": "login_code",
            "to": email,
            "code": code,
        });

        match self.client.post(&self.endpoint).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(email = %email, "login code delivered");
            }
            Ok(resp) => {
                warn!(email = %email, status = %resp.status(), "login code delivery rejected");
            }
            Err(e) => {
                warn!(email = %email, error = %e, "login code delivery failed");
            }
        }
    }
}
