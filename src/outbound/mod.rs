//! Outbound HTTP clients.
//!
//! The dispatcher only sees the two traits below; production wiring uses the
//! reqwest-backed `GraphMessenger` and `ChatCompletionClient`.

use std::time::Duration;

use crate::error::BridgeError;

pub mod completion;
pub mod whatsapp;

pub use self::completion::ChatCompletionClient;
pub use self::whatsapp::GraphMessenger;

/// Delivers a text message to a WhatsApp user.
#[async_trait::async_trait]
pub trait MessageSender: Send + Sync {
    /// `Err(BridgeError::Status { .. })` means the API refused this message;
    /// any other error means the API could not be reached.
    async fn send_text(&self, to: &str, body: &str) -> Result<(), BridgeError>;
}

/// Produces a model answer for a single user message.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the raw (untrimmed, possibly empty) answer text.
    async fn complete(&self, user_text: &str) -> Result<String, BridgeError>;
}

pub(crate) fn build_client(timeout_ms: u64) -> Result<reqwest::Client, BridgeError> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(BridgeError::Client)
}

/// Read a response body for logging, capped so a noisy error page does not
/// flood the log.
pub(crate) async fn error_body(resp: reqwest::Response) -> String {
    const MAX: usize = 2048;
    match resp.text().await {
        Ok(mut text) => {
            if text.len() > MAX {
                let mut cut = MAX;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
            }
            text
        }
        Err(err) => format!("<unreadable body: {}>", err),
    }
}
