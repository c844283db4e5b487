//! In-process implementation of the document store.
//!
//! Backed by plain maps behind a mutex, with a `tokio::sync::watch`
//! channel per record feeding live subscriptions. Lock sections are short
//! and never await; a poisoned lock is reported as `StoreUnavailable`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::audit::{AuditEvent, AuditSeed};
use crate::documents::DocKind;
use crate::error::{CoordinationError, CoordinationResult};
use crate::records::{
    ConsultationRecord, ConsultationSeed, ConsultationStatus, IntakeRecord, Provider,
    SharedFileRecord, SharedFileSeed,
};
use crate::store::{DocumentStore, Subscription};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

/// Per-consultation ledger state: entries in insertion order plus the
/// channel that publishes ordered snapshots.
struct Ledger {
    entries: Vec<SharedFileRecord>,
    tx: watch::Sender<Vec<SharedFileRecord>>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            tx: watch::channel(Vec::new()).0,
        }
    }
}

#[derive(Default)]
struct Tables {
    intakes: HashMap<String, watch::Sender<Option<IntakeRecord>>>,
    consultations: HashMap<String, watch::Sender<Option<ConsultationRecord>>>,
    ledgers: HashMap<String, Ledger>,
    audit: Vec<AuditEvent>,
}

impl Tables {
    fn intake_cell(&mut self, id: &str) -> &watch::Sender<Option<IntakeRecord>> {
        self.intakes
            .entry(id.to_owned())
            .or_insert_with(|| watch::channel(None).0)
    }

    fn consultation_cell(&mut self, id: &str) -> &watch::Sender<Option<ConsultationRecord>> {
        self.consultations
            .entry(id.to_owned())
            .or_insert_with(|| watch::channel(None).0)
    }

    fn ledger(&mut self, consultation_id: &str) -> &mut Ledger {
        self.ledgers.entry(consultation_id.to_owned()).or_default()
    }
}

/// Orders ledger entries by `shared_at` descending. The sort is stable,
/// so entries with equal timestamps keep their insertion order.
fn ledger_snapshot(entries: &[SharedFileRecord]) -> Vec<SharedFileRecord> {
    let mut snapshot = entries.to_vec();
    snapshot.sort_by(|a, b| b.shared_at.cmp(&a.shared_at));
    snapshot
}

/// In-memory document store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> CoordinationResult<MutexGuard<'_, Tables>> {
        self.inner
            .lock()
            .map_err(|e| CoordinationError::StoreUnavailable(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn intake(&self, id: &str) -> CoordinationResult<Option<IntakeRecord>> {
        let tables = self.tables()?;
        Ok(tables.intakes.get(id).and_then(|cell| cell.borrow().clone()))
    }

    async fn put_intake(&self, record: IntakeRecord) -> CoordinationResult<()> {
        let mut tables = self.tables()?;
        let id = record.id.clone();
        tables.intake_cell(&id).send_replace(Some(record));
        Ok(())
    }

    async fn consultation(&self, id: &str) -> CoordinationResult<Option<ConsultationRecord>> {
        let tables = self.tables()?;
        Ok(tables
            .consultations
            .get(id)
            .and_then(|cell| cell.borrow().clone()))
    }

    async fn create_consultation_if_absent(
        &self,
        seed: ConsultationSeed,
    ) -> CoordinationResult<bool> {
        let mut tables = self.tables()?;
        let cell = tables.consultation_cell(&seed.id);
        if cell.borrow().is_some() {
            return Ok(false);
        }

        let record = ConsultationRecord {
            id: seed.id,
            patient_name: seed.patient_name,
            age: seed.age,
            phone: seed.phone,
            service: seed.service,
            symptoms: seed.symptoms,
            allergies: seed.allergies,
            medical_history: seed.medical_history,
            preferred_at: seed.preferred_at,
            status: seed.status,
            assigned_to: seed.assigned_to,
            created_at: Utc::now(),
            shared_docs: Vec::new(),
        };
        cell.send_replace(Some(record));
        Ok(true)
    }

    async fn update_intake_assignment(
        &self,
        id: &str,
        status: ConsultationStatus,
        assigned_to: Option<Provider>,
    ) -> CoordinationResult<()> {
        let mut tables = self.tables()?;
        let cell = tables.intake_cell(id);
        let mut record = cell
            .borrow()
            .clone()
            .ok_or_else(|| CoordinationError::RecordNotFound(id.to_owned()))?;
        record.status = status;
        record.assigned_to = assigned_to;
        cell.send_replace(Some(record));
        Ok(())
    }

    async fn update_consultation_assignment(
        &self,
        id: &str,
        status: ConsultationStatus,
        assigned_to: Option<Provider>,
    ) -> CoordinationResult<()> {
        let mut tables = self.tables()?;
        let cell = tables.consultation_cell(id);
        let mut record = cell
            .borrow()
            .clone()
            .ok_or_else(|| CoordinationError::RecordNotFound(id.to_owned()))?;
        record.status = status;
        record.assigned_to = assigned_to;
        cell.send_replace(Some(record));
        Ok(())
    }

    async fn set_shared_docs(
        &self,
        consultation_id: &str,
        kinds: &[DocKind],
    ) -> CoordinationResult<()> {
        let mut tables = self.tables()?;
        let cell = tables.consultation_cell(consultation_id);
        let mut record = cell
            .borrow()
            .clone()
            .ok_or_else(|| CoordinationError::RecordNotFound(consultation_id.to_owned()))?;
        record.shared_docs = kinds.to_vec();
        cell.send_replace(Some(record));
        Ok(())
    }

    async fn append_shared_file(
        &self,
        consultation_id: &str,
        seed: SharedFileSeed,
    ) -> CoordinationResult<SharedFileRecord> {
        let mut tables = self.tables()?;
        let promoted = tables
            .consultations
            .get(consultation_id)
            .map_or(false, |cell| cell.borrow().is_some());
        if !promoted {
            return Err(CoordinationError::RecordNotFound(
                consultation_id.to_owned(),
            ));
        }

        let record = SharedFileRecord {
            id: Uuid::new_v4(),
            file_type: seed.file_type,
            shared_at: Utc::now(),
            shared_with: seed.shared_with,
            patient_name: seed.patient_name,
            provider: seed.provider,
            file_url: seed.file_url,
        };

        let ledger = tables.ledger(consultation_id);
        ledger.entries.push(record.clone());
        let snapshot = ledger_snapshot(&ledger.entries);
        ledger.tx.send_replace(snapshot);
        Ok(record)
    }

    async fn append_audit_event(&self, seed: AuditSeed) -> CoordinationResult<AuditEvent> {
        let mut tables = self.tables()?;
        let event = AuditEvent {
            id: Uuid::new_v4(),
            at: Utc::now(),
            action: seed.action,
            record_id: seed.record_id,
            actor: seed.actor,
            detail: seed.detail,
        };
        tables.audit.push(event.clone());
        Ok(event)
    }

    async fn audit_events(&self, record_id: &str) -> CoordinationResult<Vec<AuditEvent>> {
        let tables = self.tables()?;
        Ok(tables
            .audit
            .iter()
            .filter(|event| event.record_id == record_id)
            .cloned()
            .collect())
    }

    async fn watch_intake(
        &self,
        id: &str,
    ) -> CoordinationResult<Subscription<Option<IntakeRecord>>> {
        let mut tables = self.tables()?;
        Ok(Subscription::new(tables.intake_cell(id).subscribe()))
    }

    async fn watch_consultation(
        &self,
        id: &str,
    ) -> CoordinationResult<Subscription<Option<ConsultationRecord>>> {
        let mut tables = self.tables()?;
        Ok(Subscription::new(tables.consultation_cell(id).subscribe()))
    }

    async fn watch_ledger(
        &self,
        consultation_id: &str,
    ) -> CoordinationResult<Subscription<Vec<SharedFileRecord>>> {
        let mut tables = self.tables()?;
        Ok(Subscription::new(tables.ledger(consultation_id).tx.subscribe()))
    }
}
