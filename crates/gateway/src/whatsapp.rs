//! WhatsApp Cloud API delivery.
//!
//! Documents are delivered as WhatsApp document messages: a POST to
//! `{api_base}/{phone_id}/messages` with a bearer token and a JSON body
//! carrying the file link and display filename. The call is
//! request/response with no caller-imposed timeout and no retry; the
//! dispatch pipeline treats the result as fire-and-forget.

use async_trait::async_trait;
use consult_core::{GatewayError, NotificationGateway};
use serde::Serialize;

/// Default Graph API base URL.
pub const DEFAULT_API_BASE: &str = "https://graph.facebook.com/v17.0";

/// Credentials and endpoint for the WhatsApp Cloud API.
#[derive(Clone, Debug)]
pub struct WhatsAppConfig {
    pub api_base: String,
    /// WhatsApp Business phone number id.
    pub phone_id: String,
    pub access_token: String,
}

impl WhatsAppConfig {
    /// Config against the default API base.
    pub fn new(phone_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            phone_id: phone_id.into(),
            access_token: access_token.into(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_owned();
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("gateway rejected the send ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Wire body of a document message.
#[derive(Serialize)]
struct DocumentMessage<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    document: DocumentLink<'a>,
}

#[derive(Serialize)]
struct DocumentLink<'a> {
    link: &'a str,
    filename: &'a str,
}

fn document_message<'a>(recipient: &'a str, file_url: &'a str, filename: &'a str) -> DocumentMessage<'a> {
    DocumentMessage {
        messaging_product: "whatsapp",
        to: recipient,
        kind: "document",
        document: DocumentLink {
            link: file_url,
            filename,
        },
    }
}

/// WhatsApp Cloud API client.
#[derive(Clone)]
pub struct WhatsAppGateway {
    cfg: WhatsAppConfig,
    http: reqwest::Client,
}

impl WhatsAppGateway {
    pub fn new(cfg: WhatsAppConfig) -> Self {
        Self {
            cfg,
            http: reqwest::Client::new(),
        }
    }

    async fn post_document(
        &self,
        recipient: &str,
        file_url: &str,
        filename: &str,
    ) -> Result<(), WhatsAppError> {
        let url = format!("{}/{}/messages", self.cfg.api_base, self.cfg.phone_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.cfg.access_token)
            .json(&document_message(recipient, file_url, filename))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WhatsAppError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(recipient, filename, "document message accepted");
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for WhatsAppGateway {
    async fn send_document(
        &self,
        recipient: &str,
        file_url: &str,
        filename: &str,
    ) -> Result<(), GatewayError> {
        self.post_document(recipient, file_url, filename)
            .await
            .map_err(|err| GatewayError(err.to_string()))
    }
}

/// Gateway that logs the would-be send and reports success. Used by the
/// CLI demo and anywhere delivery should be suppressed.
#[derive(Clone, Copy, Debug, Default)]
pub struct DryRunGateway;

#[async_trait]
impl NotificationGateway for DryRunGateway {
    async fn send_document(
        &self,
        recipient: &str,
        file_url: &str,
        filename: &str,
    ) -> Result<(), GatewayError> {
        tracing::info!(recipient, file_url, filename, "dry run: document send suppressed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_message_matches_cloud_api_shape() {
        let message = document_message("254700111222", "https://x/doc.pdf", "prescription.pdf");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "254700111222",
                "type": "document",
                "document": {
                    "link": "https://x/doc.pdf",
                    "filename": "prescription.pdf"
                }
            })
        );
    }

    #[test]
    fn api_base_trailing_slash_is_stripped() {
        let cfg = WhatsAppConfig::new("12345", "token").with_api_base("https://graph.example/v17.0/");
        assert_eq!(cfg.api_base, "https://graph.example/v17.0");
    }

    #[tokio::test]
    async fn dry_run_accepts_every_send() {
        let gateway = DryRunGateway;
        gateway
            .send_document("254700111222", "https://x/doc.pdf", "prescription.pdf")
            .await
            .unwrap();
    }
}
