use serde::Serialize;

use super::{build_client, error_body, MessageSender};
use crate::config::WhatsAppConfig;
use crate::error::BridgeError;

const SERVICE: &str = "whatsapp";

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

/// Graph API `messages` request for a plain text reply.
#[derive(Debug, Serialize)]
struct OutboundText<'a> {
    messaging_product: &'static str,
    to: &'a str,
    text: TextBody<'a>,
}

impl<'a> OutboundText<'a> {
    fn new(to: &'a str, body: &'a str) -> Self {
        Self {
            messaging_product: "whatsapp",
            to,
            text: TextBody { body },
        }
    }
}

/// Sends replies through `POST {api_base}/{phone_number_id}/messages`.
pub struct GraphMessenger {
    cfg: WhatsAppConfig,
    client: reqwest::Client,
}

impl GraphMessenger {
    pub fn new(cfg: WhatsAppConfig, timeout_ms: u64) -> Result<Self, BridgeError> {
        let client = build_client(timeout_ms)?;
        Ok(Self { cfg, client })
    }

    fn messages_url(&self) -> Result<String, BridgeError> {
        let phone_id = self
            .cfg
            .phone_number_id
            .as_deref()
            .ok_or(BridgeError::NotConfigured("PHONE_NUMBER_ID"))?;
        Ok(format!(
            "{}/{}/messages",
            self.cfg.api_base.trim_end_matches('/'),
            phone_id
        ))
    }
}

#[async_trait::async_trait]
impl MessageSender for GraphMessenger {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), BridgeError> {
        let url = self.messages_url()?;
        let mut rb = self.client.post(&url).json(&OutboundText::new(to, body));
        if let Some(tok) = &self.cfg.access_token {
            rb = rb.bearer_auth(tok);
        }
        let resp = rb.send().await.map_err(BridgeError::transport(SERVICE))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BridgeError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: error_body(resp).await,
            });
        }
        // The API echoes message ids; only logged.
        let ack = resp.text().await.unwrap_or_default();
        tracing::debug!(to = %to, status = status.as_u16(), response = %ack, "sent WhatsApp reply");
        Ok(())
    }
}
