//! Domain records owned by the backing store.
//!
//! The intake record and the consultation record share one opaque id; a
//! consultation exists for an id exactly when promotion has occurred. Both
//! are owned by the store and shared by reference between components, so
//! none of these types carries behaviour beyond field access; every
//! mutation goes through [`crate::store::DocumentStore`].

use crate::documents::{DocKind, DocumentUrls};
use chrono::{DateTime, Utc};
use consult_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status shared by the intake and consultation records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsultationStatus {
    Pending,
    #[serde(rename = "In-Progress")]
    InProgress,
    Completed,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Pending => "Pending",
            ConsultationStatus::InProgress => "In-Progress",
            ConsultationStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A clinician identity, used both for assignment and as the acting user
/// on an operation.
///
/// Operations take the acting provider explicitly as a parameter; there is
/// no ambient current-user state anywhere in this crate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Opaque identity from the authentication layer.
    pub id: String,
    /// Display name.
    pub name: NonEmptyText,
}

/// The patient's pre-visit intake submission, before a provider engages.
///
/// Created by the external intake flow. The coordinator mutates only
/// `status` and `assigned_to`; the external authoring tools populate the
/// URL fields in `documents`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub id: String,
    pub patient_name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// Raw phone number exactly as the patient entered it. May be empty;
    /// canonicalisation happens at dispatch time.
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub symptoms: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub medical_history: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_at: Option<DateTime<Utc>>,
    pub status: ConsultationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Provider>,
    #[serde(default)]
    pub documents: DocumentUrls,
}

/// The active working record once a provider begins the encounter.
///
/// Shares its id with the originating intake record. `created_at` is
/// assigned by the store when the record is first created and never
/// changes afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub id: String,
    pub patient_name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub symptoms: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub medical_history: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_at: Option<DateTime<Utc>>,
    pub status: ConsultationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Provider>,
    pub created_at: DateTime<Utc>,
    /// Document kinds most recently selected for dispatch. Replaced as a
    /// whole on every dispatch, not appended to.
    #[serde(default)]
    pub shared_docs: Vec<DocKind>,
}

/// Field set for a consultation about to be created.
///
/// The store stamps `created_at` when (and only when) the conditional
/// create actually writes a record.
#[derive(Clone, Debug)]
pub struct ConsultationSeed {
    pub id: String,
    pub patient_name: NonEmptyText,
    pub age: Option<u32>,
    pub phone: String,
    pub service: String,
    pub symptoms: String,
    pub allergies: String,
    pub medical_history: String,
    pub preferred_at: Option<DateTime<Utc>>,
    pub status: ConsultationStatus,
    pub assigned_to: Option<Provider>,
}

impl ConsultationSeed {
    /// Copies the current intake fields into a seed for promotion.
    pub fn from_intake(
        intake: &IntakeRecord,
        status: ConsultationStatus,
        assigned_to: Option<Provider>,
    ) -> Self {
        Self {
            id: intake.id.clone(),
            patient_name: intake.patient_name.clone(),
            age: intake.age,
            phone: intake.phone.clone(),
            service: intake.service.clone(),
            symptoms: intake.symptoms.clone(),
            allergies: intake.allergies.clone(),
            medical_history: intake.medical_history.clone(),
            preferred_at: intake.preferred_at,
            status,
            assigned_to,
        }
    }
}

/// One immutable entry in the per-consultation sharing ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedFileRecord {
    /// Store-assigned id.
    pub id: Uuid,
    pub file_type: DocKind,
    /// Store-assigned timestamp; ledger snapshots are ordered by this
    /// field, descending.
    pub shared_at: DateTime<Utc>,
    /// Canonical recipient phone number.
    pub shared_with: String,
    pub patient_name: NonEmptyText,
    /// The provider who performed the dispatch.
    pub provider: Provider,
    pub file_url: String,
}

/// Field set for a ledger entry about to be appended. The store assigns
/// the id and timestamp.
#[derive(Clone, Debug)]
pub struct SharedFileSeed {
    pub file_type: DocKind,
    pub shared_with: String,
    pub patient_name: NonEmptyText,
    pub provider: Provider,
    pub file_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serialises_with_hyphenated_in_progress() {
        let json = serde_json::to_string(&ConsultationStatus::InProgress).unwrap();
        assert_eq!(json, "\"In-Progress\"");
        let back: ConsultationStatus = serde_json::from_str("\"In-Progress\"").unwrap();
        assert_eq!(back, ConsultationStatus::InProgress);
    }

    #[test]
    fn seed_copies_intake_fields() {
        let intake = IntakeRecord {
            id: "p1".into(),
            patient_name: NonEmptyText::new("Asha").unwrap(),
            age: Some(29),
            phone: "0700111222".into(),
            service: "General Consultation".into(),
            symptoms: "headache".into(),
            allergies: "none".into(),
            medical_history: "none".into(),
            preferred_at: None,
            status: ConsultationStatus::Pending,
            assigned_to: None,
            documents: DocumentUrls::default(),
        };

        let seed =
            ConsultationSeed::from_intake(&intake, ConsultationStatus::InProgress, None);
        assert_eq!(seed.id, "p1");
        assert_eq!(seed.symptoms, "headache");
        assert_eq!(seed.status, ConsultationStatus::InProgress);
    }
}
