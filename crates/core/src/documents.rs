//! The closed set of clinical document kinds that can be shared.
//!
//! Dispatch and display logic is driven by this enum plus its lookup
//! methods rather than by string comparisons scattered through the code.
//! The authoring tools that produce the documents are external; this core
//! only sees the URL fields they populate on the intake record.

use crate::error::CoordinationError;
use serde::{Deserialize, Serialize};

/// A kind of clinical document generated during a consultation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocKind {
    #[serde(rename = "prescription")]
    Prescription,
    #[serde(rename = "labRequest")]
    LabRequest,
    #[serde(rename = "sickNote")]
    SickNote,
    #[serde(rename = "referral")]
    Referral,
    #[serde(rename = "medicalReport")]
    MedicalReport,
}

impl DocKind {
    /// Every document kind, in the canonical iteration order used by the
    /// dispatch loop.
    pub const ALL: [DocKind; 5] = [
        DocKind::Prescription,
        DocKind::LabRequest,
        DocKind::SickNote,
        DocKind::Referral,
        DocKind::MedicalReport,
    ];

    /// Stable wire key for this kind.
    pub fn key(&self) -> &'static str {
        match self {
            DocKind::Prescription => "prescription",
            DocKind::LabRequest => "labRequest",
            DocKind::SickNote => "sickNote",
            DocKind::Referral => "referral",
            DocKind::MedicalReport => "medicalReport",
        }
    }

    /// Human-readable label used in summary messages.
    pub fn label(&self) -> &'static str {
        match self {
            DocKind::Prescription => "Prescription",
            DocKind::LabRequest => "Lab Request",
            DocKind::SickNote => "Sick Note",
            DocKind::Referral => "Referral",
            DocKind::MedicalReport => "Medical Report",
        }
    }

    /// Filename presented to the messaging gateway for this kind.
    pub fn filename(&self) -> &'static str {
        match self {
            DocKind::Prescription => "prescription.pdf",
            DocKind::LabRequest => "lab-request.pdf",
            DocKind::SickNote => "sick-note.pdf",
            DocKind::Referral => "referral.pdf",
            DocKind::MedicalReport => "medical-report.pdf",
        }
    }
}

impl std::fmt::Display for DocKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for DocKind {
    type Err = CoordinationError;

    /// Parses a kind from its wire key. Case-insensitive; hyphens and
    /// underscores are ignored so CLI input like `lab-request` works.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();

        match folded.as_str() {
            "prescription" => Ok(DocKind::Prescription),
            "labrequest" => Ok(DocKind::LabRequest),
            "sicknote" => Ok(DocKind::SickNote),
            "referral" => Ok(DocKind::Referral),
            "medicalreport" => Ok(DocKind::MedicalReport),
            _ => Err(CoordinationError::InvalidInput(format!(
                "unknown document kind: {s}"
            ))),
        }
    }
}

/// Per-kind URLs of generated documents, populated by the external
/// authoring tools. An absent URL means the document has not been
/// produced for this consultation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lab_request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sick_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_report: Option<String>,
}

impl DocumentUrls {
    /// Returns the stored URL for the given kind, if the document exists.
    pub fn url(&self, kind: DocKind) -> Option<&str> {
        let field = match kind {
            DocKind::Prescription => &self.prescription,
            DocKind::LabRequest => &self.lab_request,
            DocKind::SickNote => &self.sick_note,
            DocKind::Referral => &self.referral,
            DocKind::MedicalReport => &self.medical_report,
        };
        field.as_deref()
    }
}
