use chrono::Utc;
use falu_api::APP_USER_AGENT;
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use sha2::Sha256;
use std::time::Duration;

use super::BackgroundTaskManager;
use crate::console::{Console, TIMESTAMP_FORMAT};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Falu-Signature";

const FORWARD_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts received events to a local URL without holding up the receive loop
pub struct EventForwarder {
    client: reqwest::Client,
    url: Url,
    secret: Option<String>,
    console: Console,
    tasks: BackgroundTaskManager,
    deliveries: u64,
}

impl EventForwarder {
    pub fn new(
        url: Url,
        secret: Option<String>,
        skip_validation: bool,
        console: Console,
    ) -> anyhow::Result<Self> {
        if skip_validation {
            tracing::warn!("TLS certificate validation disabled for forwarding to {}", url);
        }
        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(FORWARD_TIMEOUT)
            .tls_danger_accept_invalid_certs(skip_validation)
            .build()?;

        Ok(Self {
            client,
            url,
            secret,
            console,
            tasks: BackgroundTaskManager::new(),
            deliveries: 0,
        })
    }

    /// Spawn the delivery of one event. The outcome is reported on the
    /// console and never returned to the caller.
    ///
    /// Every call gets its own task, so a redelivered event id never
    /// cancels the earlier attempt.
    pub fn forward(&mut self, event_id: String, body: Vec<u8>) {
        self.deliveries += 1;
        let task_id = format!("{}#{}", event_id, self.deliveries);
        let client = self.client.clone();
        let url = self.url.clone();
        let secret = self.secret.clone();
        let console = self.console.clone();
        let id = event_id;

        self.tasks.spawn_task(task_id, async move {
            let mut request = client
                .post(url.clone())
                .header(CONTENT_TYPE, "application/json");
            if let Some(secret) = secret {
                match sign_payload(&secret, Utc::now().timestamp(), &body) {
                    Ok(signature) => request = request.header(SIGNATURE_HEADER, signature),
                    Err(e) => tracing::warn!("Failed to sign event {}: {:#}", id, e),
                }
            }

            let result = request.body(body).send().await;
            let now = Utc::now().format(TIMESTAMP_FORMAT).to_string();
            match result {
                Ok(response) => {
                    let status = response.status();
                    tracing::debug!("Forwarded event {} to {}: {}", id, url, status);
                    console.line(format!(
                        "{} <-- [{}] POST {} [{}]",
                        now,
                        status.as_u16(),
                        url,
                        id
                    ));
                }
                Err(e) => {
                    tracing::warn!("Failed to forward event {} to {}: {}", id, url, e);
                    console.line(format!("{} <-- [ERR] POST {} [{}] {}", now, url, id, e));
                }
            }
        });
    }

    /// Give in-flight deliveries `grace` to finish, then abort them
    pub async fn shutdown(&mut self, grace: Duration) {
        self.tasks.wait_all(grace).await;
    }
}

/// `t={timestamp},sha256={hex(hmac_sha256(secret, "{timestamp}.{body}"))}`
pub fn sign_payload(secret: &str, timestamp: i64, body: &[u8]) -> anyhow::Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("HMAC init: {}", e))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    let digest = hex::encode(mac.finalize().into_bytes());
    Ok(format!("t={},sha256={}", timestamp, digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SharedBuffer;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_signature_is_stable() {
        let body = br#"{"id":"evt_1"}"#;
        let first = sign_payload("whsec_test", 1_700_000_000, body).unwrap();
        let second = sign_payload("whsec_test", 1_700_000_000, body).unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("t=1700000000,sha256="));
        // 32-byte digest
        assert_eq!(first.len(), "t=1700000000,sha256=".len() + 64);
    }

    #[test]
    fn test_signature_depends_on_secret_and_timestamp() {
        let body = br#"{"id":"evt_1"}"#;
        let base = sign_payload("whsec_a", 1, body).unwrap();

        assert_ne!(base, sign_payload("whsec_b", 1, body).unwrap());
        assert_ne!(
            base.split_once(",").unwrap().1,
            sign_payload("whsec_a", 2, body).unwrap().split_once(",").unwrap().1
        );
    }

    #[tokio::test]
    async fn test_forward_posts_signed_event() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhooks"))
            .and(header("content-type", "application/json"))
            .and(header_exists(SIGNATURE_HEADER))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let buffer = SharedBuffer::new();
        let url = Url::parse(&format!("{}/webhooks", server.uri())).unwrap();
        let mut forwarder = EventForwarder::new(
            url,
            Some("whsec_test".to_string()),
            false,
            Console::new(buffer.clone()),
        )
        .unwrap();

        forwarder.forward("evt_1".to_string(), br#"{"id":"evt_1"}"#.to_vec());
        forwarder.shutdown(Duration::from_secs(5)).await;

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("<-- [200] POST"));
        assert!(lines[0].ends_with("/webhooks [evt_1]"));
    }

    #[tokio::test]
    async fn test_forward_reports_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let buffer = SharedBuffer::new();
        let url = Url::parse(&server.uri()).unwrap();
        let mut forwarder = EventForwarder::new(url, None, false, Console::new(buffer.clone())).unwrap();

        forwarder.forward("evt_2".to_string(), b"{}".to_vec());
        forwarder.shutdown(Duration::from_secs(5)).await;

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("<-- [500] POST"));
        assert!(lines[0].ends_with("[evt_2]"));
    }

    #[tokio::test]
    async fn test_redelivered_event_id_prints_a_line_per_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202).set_delay(Duration::from_millis(200)))
            .expect(2)
            .mount(&server)
            .await;

        let buffer = SharedBuffer::new();
        let url = Url::parse(&server.uri()).unwrap();
        let mut forwarder = EventForwarder::new(url, None, false, Console::new(buffer.clone())).unwrap();

        forwarder.forward("evt_dup".to_string(), b"{}".to_vec());
        forwarder.forward("evt_dup".to_string(), b"{}".to_vec());
        forwarder.shutdown(Duration::from_secs(5)).await;

        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.contains("<-- [202] POST") && l.ends_with("[evt_dup]")));
    }

    #[tokio::test]
    async fn test_unreachable_target_prints_failure_line() {
        let buffer = SharedBuffer::new();
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let mut forwarder = EventForwarder::new(url, None, false, Console::new(buffer.clone())).unwrap();

        forwarder.forward("evt_3".to_string(), b"{}".to_vec());
        forwarder.shutdown(Duration::from_secs(10)).await;

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("<-- [ERR] POST http://127.0.0.1:9/ [evt_3]"));
    }
}
