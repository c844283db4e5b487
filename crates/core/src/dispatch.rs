//! Document dispatch pipeline.
//!
//! For a selected set of document kinds, the pipeline persists the
//! selection on the consultation record, appends one ledger entry per
//! resolvable document, and invokes the notification gateway per item.
//!
//! The ledger entry for each item is written **before** the gateway call:
//! the ledger records intent to share at least once, not confirmed
//! delivery. Gateway failures are absorbed per item so one bad send never
//! aborts the rest of the selection; they surface in the per-item outcome
//! list of the returned report rather than as errors.
//!
//! Dispatch is not idempotent across invocations: re-running the same
//! selection appends fresh ledger entries, because every invocation is a
//! new sharing event.

use std::sync::Arc;

use crate::audit::{AuditAction, AuditSeed};
use crate::config::CoreConfig;
use crate::documents::DocKind;
use crate::error::{CoordinationError, CoordinationResult};
use crate::gateway::NotificationGateway;
use crate::records::{Provider, SharedFileSeed};
use crate::store::DocumentStore;
use consult_types::phone;
use serde::Serialize;

/// Outcome of one selected document kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocOutcome {
    /// Ledger entry written and the gateway accepted the send.
    Sent,
    /// Ledger entry written, but the gateway call failed.
    SendFailed { reason: String },
    /// No stored URL for this kind; nothing was written or sent.
    Skipped,
}

/// One per-item line of a dispatch report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub kind: DocKind,
    pub outcome: DocOutcome,
}

/// Result of a dispatch invocation.
///
/// The overall operation succeeds as long as preconditions held; partial
/// gateway failures are visible here, item by item.
#[derive(Clone, Debug, Serialize)]
pub struct DispatchReport {
    pub consultation_id: String,
    /// Canonical recipient phone number.
    pub recipient: String,
    pub outcomes: Vec<DispatchOutcome>,
    /// Human-readable message naming the patient and the selection.
    pub summary_message: String,
    /// Pre-filled chat link for sending the summary by hand.
    pub fallback_link: String,
}

impl DispatchReport {
    /// Number of documents the gateway accepted.
    pub fn sent(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome == DocOutcome::Sent)
            .count()
    }

    /// Number of documents whose gateway call failed.
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, DocOutcome::SendFailed { .. }))
            .count()
    }
}

/// Builds the manual fallback chat link: base URL parameterised by the
/// recipient, with the percent-encoded message as a query parameter.
pub fn prefilled_chat_link(base: &str, recipient: &str, message: &str) -> String {
    format!("{base}/{recipient}?text={}", urlencoding::encode(message))
}

/// Shares selected consultation documents with the patient.
#[derive(Clone)]
pub struct DispatchService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn DocumentStore>,
    gateway: Arc<dyn NotificationGateway>,
}

impl DispatchService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<dyn DocumentStore>,
        gateway: Arc<dyn NotificationGateway>,
    ) -> Self {
        Self {
            cfg,
            store,
            gateway,
        }
    }

    /// Dispatches the selected document kinds for `consultation_id`.
    ///
    /// Preconditions, checked before any write: the consultation must
    /// exist, its intake record must exist, and the patient's phone number
    /// must be non-empty after trimming. When a precondition fails the
    /// operation aborts with no writes and no external calls.
    ///
    /// The selection is deduplicated and processed in the canonical
    /// [`DocKind::ALL`] order regardless of the order given. `shared_docs`
    /// is replaced in a single write; it never partially updates.
    ///
    /// # Errors
    ///
    /// - [`CoordinationError::RecordNotFound`]: no consultation (or no
    ///   intake record) for the id.
    /// - [`CoordinationError::MissingRecipient`]: no phone number on
    ///   file.
    /// - [`CoordinationError::StoreUnavailable`]: store faults.
    pub async fn dispatch(
        &self,
        consultation_id: &str,
        selection: &[DocKind],
        acting: &Provider,
    ) -> CoordinationResult<DispatchReport> {
        if self.store.consultation(consultation_id).await?.is_none() {
            return Err(CoordinationError::RecordNotFound(
                consultation_id.to_owned(),
            ));
        }

        let intake = self
            .store
            .intake(consultation_id)
            .await?
            .ok_or_else(|| CoordinationError::RecordNotFound(consultation_id.to_owned()))?;

        if intake.phone.trim().is_empty() {
            return Err(CoordinationError::MissingRecipient);
        }
        let recipient = phone::canonicalise(&intake.phone);

        let selected = normalise_selection(selection);
        self.store
            .set_shared_docs(consultation_id, &selected)
            .await?;

        let mut outcomes = Vec::with_capacity(selected.len());
        for kind in &selected {
            let Some(file_url) = intake.documents.url(*kind) else {
                outcomes.push(DispatchOutcome {
                    kind: *kind,
                    outcome: DocOutcome::Skipped,
                });
                continue;
            };

            // Record intent before attempting delivery.
            self.store
                .append_shared_file(
                    consultation_id,
                    SharedFileSeed {
                        file_type: *kind,
                        shared_with: recipient.clone(),
                        patient_name: intake.patient_name.clone(),
                        provider: acting.clone(),
                        file_url: file_url.to_owned(),
                    },
                )
                .await?;

            let outcome = match self
                .gateway
                .send_document(&recipient, file_url, kind.filename())
                .await
            {
                Ok(()) => DocOutcome::Sent,
                Err(err) => {
                    tracing::warn!(
                        consultation_id,
                        kind = %kind,
                        %err,
                        "document send failed; continuing with remaining items"
                    );
                    DocOutcome::SendFailed {
                        reason: err.to_string(),
                    }
                }
            };
            outcomes.push(DispatchOutcome {
                kind: *kind,
                outcome,
            });
        }

        let summary_message = summary_message(intake.patient_name.as_str(), &selected);
        let fallback_link =
            prefilled_chat_link(self.cfg.chat_link_base(), &recipient, &summary_message);

        let report = DispatchReport {
            consultation_id: consultation_id.to_owned(),
            recipient,
            outcomes,
            summary_message,
            fallback_link,
        };

        self.audit(consultation_id, acting, &report, selected.len())
            .await;

        Ok(report)
    }

    /// Best-effort audit append; failures are logged and absorbed.
    async fn audit(
        &self,
        consultation_id: &str,
        acting: &Provider,
        report: &DispatchReport,
        selected: usize,
    ) {
        let seed = AuditSeed {
            action: AuditAction::Dispatched,
            record_id: consultation_id.to_owned(),
            actor: acting.clone(),
            detail: format!(
                "sent {} of {} selected document(s) to {}",
                report.sent(),
                selected,
                report.recipient
            ),
        };
        if let Err(err) = self.store.append_audit_event(seed).await {
            tracing::warn!(consultation_id, %err, "failed to append audit event");
        }
    }
}

/// Deduplicates a selection into the canonical iteration order.
fn normalise_selection(selection: &[DocKind]) -> Vec<DocKind> {
    DocKind::ALL
        .iter()
        .copied()
        .filter(|kind| selection.contains(kind))
        .collect()
}

/// Message offered to the operator for manual sending.
fn summary_message(patient_name: &str, selected: &[DocKind]) -> String {
    if selected.is_empty() {
        return format!("Hello {patient_name}, your medical documents are ready.");
    }
    let labels: Vec<&str> = selected.iter().map(|kind| kind.label()).collect();
    format!(
        "Hello {patient_name}, your medical documents are ready: {}.",
        labels.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::DocumentUrls;
    use crate::gateway::GatewayError;
    use crate::lifecycle::LifecycleService;
    use crate::records::{ConsultationStatus, IntakeRecord};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use consult_types::NonEmptyText;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Test gateway that records every attempt and fails on request.
    #[derive(Default)]
    struct RecordingGateway {
        attempts: Mutex<Vec<(String, String, String)>>,
        fail_filenames: HashSet<String>,
    }

    impl RecordingGateway {
        fn failing_on(filenames: &[&str]) -> Self {
            Self {
                attempts: Mutex::new(Vec::new()),
                fail_filenames: filenames.iter().map(|f| f.to_string()).collect(),
            }
        }

        fn attempts(&self) -> Vec<(String, String, String)> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationGateway for RecordingGateway {
        async fn send_document(
            &self,
            recipient: &str,
            file_url: &str,
            filename: &str,
        ) -> Result<(), GatewayError> {
            self.attempts.lock().unwrap().push((
                recipient.to_owned(),
                file_url.to_owned(),
                filename.to_owned(),
            ));
            if self.fail_filenames.contains(filename) {
                return Err(GatewayError("simulated outage".into()));
            }
            Ok(())
        }
    }

    fn intake(id: &str, phone: &str, documents: DocumentUrls) -> IntakeRecord {
        IntakeRecord {
            id: id.into(),
            patient_name: NonEmptyText::new("Asha").unwrap(),
            age: Some(31),
            phone: phone.into(),
            service: "General Consultation".into(),
            symptoms: "cough".into(),
            allergies: "none".into(),
            medical_history: "none".into(),
            preferred_at: None,
            status: ConsultationStatus::Pending,
            assigned_to: None,
            documents,
        }
    }

    fn acting() -> Provider {
        Provider {
            id: "prov-1".into(),
            name: NonEmptyText::new("Dr. Njeri").unwrap(),
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        gateway: Arc<RecordingGateway>,
        dispatch: DispatchService,
    }

    /// Seeds an intake record, promotes it, and wires a dispatch service
    /// over the given gateway.
    async fn promoted(record: IntakeRecord, gateway: RecordingGateway) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let id = record.id.clone();
        store.put_intake(record).await.unwrap();
        LifecycleService::new(store.clone())
            .promote(&id, None, &acting())
            .await
            .unwrap();

        let gateway = Arc::new(gateway);
        let dispatch = DispatchService::new(
            Arc::new(CoreConfig::default()),
            store.clone(),
            gateway.clone(),
        );
        Harness {
            store,
            gateway,
            dispatch,
        }
    }

    async fn ledger(store: &MemoryStore, id: &str) -> Vec<crate::records::SharedFileRecord> {
        let mut sub = store.watch_ledger(id).await.unwrap();
        sub.next().await.unwrap()
    }

    #[tokio::test]
    async fn shares_prescription_end_to_end() {
        let documents = DocumentUrls {
            prescription: Some("https://x/doc.pdf".into()),
            ..Default::default()
        };
        let h = promoted(intake("p1", "0700111222", documents), RecordingGateway::default()).await;

        let report = h
            .dispatch
            .dispatch("p1", &[DocKind::Prescription], &acting())
            .await
            .unwrap();

        assert_eq!(report.recipient, "254700111222");
        assert_eq!(report.sent(), 1);

        let consultation = h.store.consultation("p1").await.unwrap().unwrap();
        assert_eq!(consultation.shared_docs, vec![DocKind::Prescription]);

        let entries = ledger(&h.store, "p1").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].shared_with, "254700111222");
        assert_eq!(entries[0].file_type, DocKind::Prescription);
        assert_eq!(entries[0].file_url, "https://x/doc.pdf");
        assert_eq!(entries[0].provider.id, "prov-1");

        assert_eq!(
            h.gateway.attempts(),
            vec![(
                "254700111222".into(),
                "https://x/doc.pdf".into(),
                "prescription.pdf".into()
            )]
        );

        let actions: Vec<AuditAction> = h
            .store
            .audit_events("p1")
            .await
            .unwrap()
            .iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(actions, vec![AuditAction::Promoted, AuditAction::Dispatched]);
    }

    #[tokio::test]
    async fn missing_recipient_aborts_before_any_write() {
        let documents = DocumentUrls {
            prescription: Some("https://x/doc.pdf".into()),
            ..Default::default()
        };
        let h = promoted(intake("p1", "   ", documents), RecordingGateway::default()).await;

        let err = h
            .dispatch
            .dispatch("p1", &[DocKind::Prescription], &acting())
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinationError::MissingRecipient));

        assert!(h.gateway.attempts().is_empty());
        assert!(ledger(&h.store, "p1").await.is_empty());
        let consultation = h.store.consultation("p1").await.unwrap().unwrap();
        assert!(consultation.shared_docs.is_empty());
        let dispatched = h
            .store
            .audit_events("p1")
            .await
            .unwrap()
            .iter()
            .filter(|e| e.action == AuditAction::Dispatched)
            .count();
        assert_eq!(dispatched, 0);
    }

    #[tokio::test]
    async fn empty_selection_clears_shared_docs_without_side_effects() {
        let documents = DocumentUrls {
            prescription: Some("https://x/doc.pdf".into()),
            ..Default::default()
        };
        let h = promoted(intake("p1", "0700111222", documents), RecordingGateway::default()).await;

        h.dispatch
            .dispatch("p1", &[DocKind::Prescription], &acting())
            .await
            .unwrap();
        let report = h.dispatch.dispatch("p1", &[], &acting()).await.unwrap();

        assert!(report.outcomes.is_empty());
        let consultation = h.store.consultation("p1").await.unwrap().unwrap();
        assert!(consultation.shared_docs.is_empty());
        // Only the first dispatch touched the ledger and the gateway.
        assert_eq!(ledger(&h.store, "p1").await.len(), 1);
        assert_eq!(h.gateway.attempts().len(), 1);
    }

    #[tokio::test]
    async fn kinds_without_documents_are_skipped_silently() {
        let documents = DocumentUrls {
            prescription: Some("https://x/doc.pdf".into()),
            ..Default::default()
        };
        let h = promoted(intake("p1", "0700111222", documents), RecordingGateway::default()).await;

        let report = h
            .dispatch
            .dispatch("p1", &[DocKind::Prescription, DocKind::Referral], &acting())
            .await
            .unwrap();

        assert_eq!(
            report.outcomes,
            vec![
                DispatchOutcome {
                    kind: DocKind::Prescription,
                    outcome: DocOutcome::Sent
                },
                DispatchOutcome {
                    kind: DocKind::Referral,
                    outcome: DocOutcome::Skipped
                },
            ]
        );
        assert_eq!(ledger(&h.store, "p1").await.len(), 1);
        assert_eq!(h.gateway.attempts().len(), 1);
        // The selection itself is persisted in full.
        let consultation = h.store.consultation("p1").await.unwrap().unwrap();
        assert_eq!(
            consultation.shared_docs,
            vec![DocKind::Prescription, DocKind::Referral]
        );
    }

    #[tokio::test]
    async fn gateway_failure_is_absorbed_per_item() {
        let documents = DocumentUrls {
            prescription: Some("https://x/rx.pdf".into()),
            lab_request: Some("https://x/lab.pdf".into()),
            ..Default::default()
        };
        let h = promoted(
            intake("p1", "0700111222", documents),
            RecordingGateway::failing_on(&["prescription.pdf"]),
        )
        .await;

        let report = h
            .dispatch
            .dispatch("p1", &[DocKind::LabRequest, DocKind::Prescription], &acting())
            .await
            .unwrap();

        assert_eq!(report.failed(), 1);
        assert_eq!(report.sent(), 1);
        assert!(matches!(
            report.outcomes[0],
            DispatchOutcome {
                kind: DocKind::Prescription,
                outcome: DocOutcome::SendFailed { .. }
            }
        ));

        // The failed item still has its ledger entry: intent is logged
        // before the delivery attempt.
        assert_eq!(ledger(&h.store, "p1").await.len(), 2);
        assert_eq!(h.gateway.attempts().len(), 2);
    }

    #[tokio::test]
    async fn selection_is_deduplicated_into_canonical_order() {
        let documents = DocumentUrls {
            prescription: Some("https://x/rx.pdf".into()),
            referral: Some("https://x/ref.pdf".into()),
            ..Default::default()
        };
        let h = promoted(intake("p1", "0700111222", documents), RecordingGateway::default()).await;

        let report = h
            .dispatch
            .dispatch(
                "p1",
                &[DocKind::Referral, DocKind::Prescription, DocKind::Prescription],
                &acting(),
            )
            .await
            .unwrap();

        let kinds: Vec<DocKind> = report.outcomes.iter().map(|o| o.kind).collect();
        assert_eq!(kinds, vec![DocKind::Prescription, DocKind::Referral]);
        let consultation = h.store.consultation("p1").await.unwrap().unwrap();
        assert_eq!(
            consultation.shared_docs,
            vec![DocKind::Prescription, DocKind::Referral]
        );
        assert_eq!(ledger(&h.store, "p1").await.len(), 2);
    }

    #[tokio::test]
    async fn redispatch_appends_rather_than_deduplicates() {
        let documents = DocumentUrls {
            prescription: Some("https://x/doc.pdf".into()),
            ..Default::default()
        };
        let h = promoted(intake("p1", "0700111222", documents), RecordingGateway::default()).await;

        h.dispatch
            .dispatch("p1", &[DocKind::Prescription], &acting())
            .await
            .unwrap();
        h.dispatch
            .dispatch("p1", &[DocKind::Prescription], &acting())
            .await
            .unwrap();

        assert_eq!(ledger(&h.store, "p1").await.len(), 2);
    }

    #[tokio::test]
    async fn dispatch_requires_promotion() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_intake(intake("p1", "0700111222", DocumentUrls::default()))
            .await
            .unwrap();
        let dispatch = DispatchService::new(
            Arc::new(CoreConfig::default()),
            store,
            Arc::new(RecordingGateway::default()),
        );

        let err = dispatch
            .dispatch("p1", &[DocKind::Prescription], &acting())
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinationError::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn report_carries_summary_and_fallback_link() {
        let documents = DocumentUrls {
            prescription: Some("https://x/doc.pdf".into()),
            ..Default::default()
        };
        let h = promoted(intake("p1", "0700111222", documents), RecordingGateway::default()).await;

        let report = h
            .dispatch
            .dispatch("p1", &[DocKind::Prescription], &acting())
            .await
            .unwrap();

        assert_eq!(
            report.summary_message,
            "Hello Asha, your medical documents are ready: Prescription."
        );
        assert_eq!(
            report.fallback_link,
            format!(
                "https://wa.me/254700111222?text={}",
                urlencoding::encode(&report.summary_message)
            )
        );
    }

    #[test]
    fn chat_link_percent_encodes_the_message() {
        let link = prefilled_chat_link("https://wa.me", "254700111222", "Hello Asha, ready.");
        assert_eq!(
            link,
            "https://wa.me/254700111222?text=Hello%20Asha%2C%20ready."
        );
    }
}
