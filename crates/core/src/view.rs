//! Live view over one consultation's records.
//!
//! The monitor subscribes to the intake record and to the consultation
//! record's existence, and, once promotion is observed, to the sharing
//! ledger. Local view state is always re-derived from delivered
//! snapshots; the monitor holds no mutable entity state of its own.
//!
//! The store gives per-record ordering only, so the intake update of an
//! operation may arrive before or after the consultation update of the
//! same operation.

use std::sync::Arc;

use crate::error::{CoordinationError, CoordinationResult};
use crate::records::{ConsultationRecord, IntakeRecord, Provider, SharedFileRecord};
use crate::store::{DocumentStore, Subscription};
use serde::Serialize;

/// Snapshot of everything the interactive surface renders for one
/// consultation.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConsultationView {
    pub intake: Option<IntakeRecord>,
    pub consultation: Option<ConsultationRecord>,
    /// Sharing ledger, newest first. Empty until promotion is observed.
    pub shared_files: Vec<SharedFileRecord>,
}

impl ConsultationView {
    /// Whether promotion has occurred for this id.
    pub fn is_promoted(&self) -> bool {
        self.consultation.is_some()
    }

    /// Provider currently assigned on the intake record.
    pub fn selected_provider(&self) -> Option<&Provider> {
        self.intake.as_ref().and_then(|i| i.assigned_to.as_ref())
    }
}

/// Owns the live subscriptions for one consultation id.
///
/// Each subscription is cancelled exactly once: the ledger subscription
/// starts only when its dependency (the consultation's existence) is
/// observed, and [`ConsultationMonitor::detach`] releases whatever is
/// active.
pub struct ConsultationMonitor {
    store: Arc<dyn DocumentStore>,
    record_id: String,
    intake_sub: Subscription<Option<IntakeRecord>>,
    consultation_sub: Subscription<Option<ConsultationRecord>>,
    ledger_sub: Option<Subscription<Vec<SharedFileRecord>>>,
    view: ConsultationView,
}

fn subscription_closed() -> CoordinationError {
    CoordinationError::StoreUnavailable("subscription closed".into())
}

impl ConsultationMonitor {
    /// Subscribes to the record pair and primes the view with the current
    /// snapshots. Valid for ids with no records yet; the monitor then
    /// observes their creation.
    pub async fn attach(
        store: Arc<dyn DocumentStore>,
        record_id: &str,
    ) -> CoordinationResult<Self> {
        let mut intake_sub = store.watch_intake(record_id).await?;
        let mut consultation_sub = store.watch_consultation(record_id).await?;

        let intake = intake_sub.next().await.ok_or_else(subscription_closed)?;
        let consultation = consultation_sub
            .next()
            .await
            .ok_or_else(subscription_closed)?;

        let mut monitor = Self {
            store,
            record_id: record_id.to_owned(),
            intake_sub,
            consultation_sub,
            ledger_sub: None,
            view: ConsultationView {
                intake,
                consultation,
                shared_files: Vec::new(),
            },
        };
        monitor.ensure_ledger_watch().await?;
        Ok(monitor)
    }

    /// The most recently derived view.
    pub fn view(&self) -> &ConsultationView {
        &self.view
    }

    /// Waits for the next upstream change and returns the re-derived
    /// view. Rapid successive writes may arrive coalesced into one
    /// delivery.
    pub async fn next(&mut self) -> CoordinationResult<ConsultationView> {
        match &mut self.ledger_sub {
            Some(ledger_sub) => {
                tokio::select! {
                    snap = self.intake_sub.next() => {
                        self.view.intake = snap.ok_or_else(subscription_closed)?;
                    }
                    snap = self.consultation_sub.next() => {
                        self.view.consultation = snap.ok_or_else(subscription_closed)?;
                    }
                    snap = ledger_sub.next() => {
                        self.view.shared_files = snap.ok_or_else(subscription_closed)?;
                    }
                }
            }
            None => {
                tokio::select! {
                    snap = self.intake_sub.next() => {
                        self.view.intake = snap.ok_or_else(subscription_closed)?;
                    }
                    snap = self.consultation_sub.next() => {
                        self.view.consultation = snap.ok_or_else(subscription_closed)?;
                    }
                }
            }
        }

        self.ensure_ledger_watch().await?;
        Ok(self.view.clone())
    }

    /// Cancels every active subscription.
    pub fn detach(self) {
        self.intake_sub.cancel();
        self.consultation_sub.cancel();
        if let Some(sub) = self.ledger_sub {
            sub.cancel();
        }
    }

    /// Starts ledger observation the first time the consultation is seen
    /// to exist, folding the initial ledger snapshot into the view.
    async fn ensure_ledger_watch(&mut self) -> CoordinationResult<()> {
        if self.view.consultation.is_some() && self.ledger_sub.is_none() {
            let mut sub = self.store.watch_ledger(&self.record_id).await?;
            self.view.shared_files = sub.next().await.ok_or_else(subscription_closed)?;
            self.ledger_sub = Some(sub);
        }
        Ok(())
    }
}
