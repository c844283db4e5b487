//! Lifecycle coordinator: promotion and status/assignment propagation.
//!
//! Promotion turns a pre-visit intake record into an active consultation
//! record under the same id. It is idempotent by construction: the
//! conditional-create primitive of the store guarantees at most one
//! consultation per id, and a repeat call performs no write.
//!
//! Status updates are duplicated across the record pair as two sequential,
//! independent writes. There is no transaction across the pair: if the
//! second write fails, the records stay diverged until the next successful
//! call. Callers see the failure and may retry the whole operation.

use std::sync::Arc;

use crate::audit::{AuditAction, AuditSeed};
use crate::error::{CoordinationError, CoordinationResult};
use crate::records::{ConsultationSeed, ConsultationStatus, Provider};
use crate::store::DocumentStore;

/// Coordinates the intake-to-consultation lifecycle.
#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn DocumentStore>,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Promotes the intake record `intake_id` into a consultation.
    ///
    /// If a consultation already exists for the id, nothing is written and
    /// the existing id is returned; `created_at` is never overwritten. On
    /// first promotion the current intake fields are copied, status is set
    /// to In-Progress, and assignment goes to `selected_provider` or, when
    /// none is selected, to the acting provider.
    ///
    /// # Errors
    ///
    /// - [`CoordinationError::RecordNotFound`] when no intake record
    ///   exists for `intake_id`.
    /// - [`CoordinationError::StoreUnavailable`] on store faults; no
    ///   partial local state is assumed committed.
    pub async fn promote(
        &self,
        intake_id: &str,
        selected_provider: Option<Provider>,
        acting: &Provider,
    ) -> CoordinationResult<String> {
        if self.store.consultation(intake_id).await?.is_some() {
            return Ok(intake_id.to_owned());
        }

        let intake = self
            .store
            .intake(intake_id)
            .await?
            .ok_or_else(|| CoordinationError::RecordNotFound(intake_id.to_owned()))?;

        let assigned = selected_provider.unwrap_or_else(|| acting.clone());
        let seed = ConsultationSeed::from_intake(
            &intake,
            ConsultationStatus::InProgress,
            Some(assigned.clone()),
        );

        let created = self.store.create_consultation_if_absent(seed).await?;
        if created {
            tracing::info!(
                record_id = intake_id,
                assigned_to = %assigned.name,
                "intake promoted to consultation"
            );
            self.audit(
                AuditAction::Promoted,
                intake_id,
                acting,
                format!("assigned to {}", assigned.name),
            )
            .await;
        }

        Ok(intake_id.to_owned())
    }

    /// Writes `status` and `assigned_to` to the intake record, then, when
    /// promotion has occurred, the same pair to the consultation record.
    ///
    /// The two writes are sequential and independent; both records
    /// converge to the new values only if both succeed. A failure of the
    /// second write propagates to the caller with the first already
    /// committed.
    pub async fn set_status(
        &self,
        intake_id: &str,
        status: ConsultationStatus,
        assigned_to: Option<Provider>,
        acting: &Provider,
    ) -> CoordinationResult<()> {
        self.store
            .update_intake_assignment(intake_id, status, assigned_to.clone())
            .await?;

        self.audit(
            AuditAction::StatusChanged,
            intake_id,
            acting,
            format!("status set to {status}"),
        )
        .await;

        if self.store.consultation(intake_id).await?.is_some() {
            self.store
                .update_consultation_assignment(intake_id, status, assigned_to)
                .await?;
        }

        Ok(())
    }

    /// Best-effort audit append; failures are logged and absorbed.
    async fn audit(&self, action: AuditAction, record_id: &str, actor: &Provider, detail: String) {
        let seed = AuditSeed {
            action,
            record_id: record_id.to_owned(),
            actor: actor.clone(),
            detail,
        };
        if let Err(err) = self.store.append_audit_event(seed).await {
            tracing::warn!(record_id, %err, "failed to append audit event");
        }
    }
}
