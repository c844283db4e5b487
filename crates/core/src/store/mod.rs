//! Backing document store abstraction.
//!
//! The store is the single source of truth: components never share
//! mutable entity state in-process, they read and write through this
//! trait and re-derive local view state from its change notifications.
//!
//! The store guarantees per-record update ordering but no cross-record
//! transactional ordering, so a consumer may observe the intake record
//! update before or after a dependent consultation update.

mod memory;

pub use memory::MemoryStore;

use crate::audit::{AuditEvent, AuditSeed};
use crate::documents::DocKind;
use crate::error::CoordinationResult;
use crate::records::{
    ConsultationRecord, ConsultationSeed, ConsultationStatus, IntakeRecord, Provider,
    SharedFileRecord, SharedFileSeed,
};
use async_trait::async_trait;
use tokio::sync::watch;

/// A live read channel onto one stored value.
///
/// The first call to [`Subscription::next`] yields the current snapshot
/// immediately; every later call waits for a change and yields the full
/// snapshot after it. Rapid successive writes may be coalesced into one
/// delivery; each delivered snapshot is always complete.
///
/// Cancellation happens exactly once per subscription: call
/// [`Subscription::cancel`] (or drop the value, which is equivalent).
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
    delivered_initial: bool,
}

impl<T: Clone> Subscription<T> {
    pub(crate) fn new(rx: watch::Receiver<T>) -> Self {
        Self {
            rx,
            delivered_initial: false,
        }
    }

    /// Waits for the next snapshot. Returns `None` once the store side of
    /// the channel has gone away.
    pub async fn next(&mut self) -> Option<T> {
        if !self.delivered_initial {
            self.delivered_initial = true;
            return Some(self.rx.borrow_and_update().clone());
        }

        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    /// Releases the subscription and stops delivery.
    pub fn cancel(self) {}
}

/// Operations on the backing store.
///
/// All timestamps on created records (`created_at`, `shared_at`, audit
/// `at`) are assigned by the store, never by callers. Any infrastructure
/// fault surfaces as [`crate::CoordinationError::StoreUnavailable`]; no
/// automatic retry is performed at this layer.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Snapshot of the intake record, if one exists.
    async fn intake(&self, id: &str) -> CoordinationResult<Option<IntakeRecord>>;

    /// Creates or replaces an intake record. This is the entry point used
    /// by the external intake flow; the coordinator itself never calls it.
    async fn put_intake(&self, record: IntakeRecord) -> CoordinationResult<()>;

    /// Snapshot of the consultation record, if promotion has occurred.
    async fn consultation(&self, id: &str) -> CoordinationResult<Option<ConsultationRecord>>;

    /// Conditionally creates a consultation record.
    ///
    /// Returns `true` when a record was created, `false` when one already
    /// existed (in which case nothing is written and the stored
    /// `created_at` is untouched). The check and the write happen under
    /// one guard, which closes the double-promotion race at this layer.
    async fn create_consultation_if_absent(
        &self,
        seed: ConsultationSeed,
    ) -> CoordinationResult<bool>;

    /// Writes status and assignment to the intake record.
    async fn update_intake_assignment(
        &self,
        id: &str,
        status: ConsultationStatus,
        assigned_to: Option<Provider>,
    ) -> CoordinationResult<()>;

    /// Writes status and assignment to the consultation record.
    async fn update_consultation_assignment(
        &self,
        id: &str,
        status: ConsultationStatus,
        assigned_to: Option<Provider>,
    ) -> CoordinationResult<()>;

    /// Replaces the consultation's dispatched-document selection in a
    /// single write.
    async fn set_shared_docs(
        &self,
        consultation_id: &str,
        kinds: &[DocKind],
    ) -> CoordinationResult<()>;

    /// Appends one entry to the consultation's sharing ledger. The store
    /// assigns the id and `shared_at`. No update or delete is exposed.
    async fn append_shared_file(
        &self,
        consultation_id: &str,
        seed: SharedFileSeed,
    ) -> CoordinationResult<SharedFileRecord>;

    /// Appends one audit event. The store assigns the id and timestamp.
    async fn append_audit_event(&self, seed: AuditSeed) -> CoordinationResult<AuditEvent>;

    /// Audit events for one record id, oldest first.
    async fn audit_events(&self, record_id: &str) -> CoordinationResult<Vec<AuditEvent>>;

    /// Live subscription to the intake record. Subscribing to an id with
    /// no record yet is valid and observes its later creation.
    async fn watch_intake(
        &self,
        id: &str,
    ) -> CoordinationResult<Subscription<Option<IntakeRecord>>>;

    /// Live subscription to the consultation record (and thereby to its
    /// existence).
    async fn watch_consultation(
        &self,
        id: &str,
    ) -> CoordinationResult<Subscription<Option<ConsultationRecord>>>;

    /// Live subscription to the sharing ledger. Every delivered snapshot
    /// is the full entry list ordered by `shared_at` descending, ties
    /// broken by insertion order.
    async fn watch_ledger(
        &self,
        consultation_id: &str,
    ) -> CoordinationResult<Subscription<Vec<SharedFileRecord>>>;
}
