//! # Consult Core
//!
//! Core coordination logic for moving a patient's pre-visit intake record
//! into an active consultation and sharing the resulting clinical
//! documents with the patient over an external messaging channel.
//!
//! This crate contains:
//! - Record types and the lifecycle status model
//! - The backing-store abstraction with live subscriptions, plus an
//!   in-memory implementation
//! - The lifecycle coordinator (idempotent promotion, status propagation)
//! - The document dispatch pipeline with its append-only sharing ledger
//! - A live view adapter for interactive surfaces
//! - An append-only audit trail of coordination operations
//!
//! **No delivery concerns**: the messaging gateway is a trait here; the
//! HTTP implementation lives in `consult-gateway`. Rendering, document
//! authoring, and authentication belong to other layers entirely.

pub mod audit;
pub mod config;
pub mod dispatch;
pub mod documents;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod records;
pub mod store;
pub mod view;

pub use audit::{AuditAction, AuditEvent, AuditSeed};
pub use config::CoreConfig;
pub use dispatch::{DispatchOutcome, DispatchReport, DispatchService, DocOutcome};
pub use documents::{DocKind, DocumentUrls};
pub use error::{CoordinationError, CoordinationResult};
pub use gateway::{GatewayError, NotificationGateway};
pub use lifecycle::LifecycleService;
pub use records::{
    ConsultationRecord, ConsultationSeed, ConsultationStatus, IntakeRecord, Provider,
    SharedFileRecord, SharedFileSeed,
};
pub use store::{DocumentStore, MemoryStore, Subscription};
pub use view::{ConsultationMonitor, ConsultationView};
