//! Append-only audit trail of coordination operations.
//!
//! Every lifecycle transition and dispatch appends an event naming the
//! acting provider. Audit writes are best-effort: a failed append is
//! logged and never blocks the clinical operation that triggered it.

use crate::records::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// An intake record was promoted into a consultation.
    Promoted,
    /// Status and assignment were written to the record pair.
    StatusChanged,
    /// A document selection was dispatched to the patient.
    Dispatched,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Promoted => "promoted",
            AuditAction::StatusChanged => "status_changed",
            AuditAction::Dispatched => "dispatched",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable audit entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Store-assigned id.
    pub id: Uuid,
    /// Store-assigned timestamp.
    pub at: DateTime<Utc>,
    pub action: AuditAction,
    /// The intake/consultation id the event concerns.
    pub record_id: String,
    pub actor: Provider,
    /// Free-form human-readable context.
    pub detail: String,
}

/// Field set for an audit event about to be appended. The store assigns
/// the id and timestamp.
#[derive(Clone, Debug)]
pub struct AuditSeed {
    pub action: AuditAction,
    pub record_id: String,
    pub actor: Provider,
    pub detail: String,
}
