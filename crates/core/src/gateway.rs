//! Seam to the external notification gateway.
//!
//! The core never talks to a messaging provider directly; it calls this
//! trait and treats the result as fire-and-forget. No timeout is imposed
//! and no retry is attempted; the dispatch loop records failures per
//! item and moves on.

use async_trait::async_trait;

/// Failure reported by a gateway implementation. Opaque on purpose: the
/// dispatch loop only logs and records it, it never branches on the cause.
#[derive(Debug, thiserror::Error)]
#[error("notification gateway failure: {0}")]
pub struct GatewayError(pub String);

/// Delivers a document link to a patient's messaging client.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Sends `file_url` to `recipient` (canonical international phone
    /// form), presented under `filename`.
    async fn send_document(
        &self,
        recipient: &str,
        file_url: &str,
        filename: &str,
    ) -> Result<(), GatewayError>;
}
