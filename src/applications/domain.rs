use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::templates::FormData;

/// Review status of one applicant, tracked independently per traveler.
/// Declaration order matches the admin dashboard's severity ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Unpaid,
    Submitted,
    InReview,
    NeedDocs,
    Approved,
    Rejected,
    ReadyToDownload,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Unpaid => "unpaid",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::InReview => "in_review",
            ApplicationStatus::NeedDocs => "need_docs",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::ReadyToDownload => "ready_to_download",
        }
    }

    /// Position in the admin severity ranking used for dashboard
    /// aggregation.
    pub const fn severity(self) -> u8 {
        self as u8
    }
}

/// Payment lifecycle of a whole application. Both `Paid` and `Expired`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
}

/// Append-only audit entry recorded on every applicant status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: ApplicationStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<String>,
}

/// Metadata for an uploaded file. The blob itself lives in an external
/// store; the core only carries the opaque key and display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantDocument {
    pub id: String,
    pub field_id: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub storage_key: String,
}

/// One traveler within a (possibly multi-traveler) application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: String,
    pub application_id: String,
    /// Exactly one applicant per application holds this flag while the
    /// applicant list is non-empty.
    pub is_main_applicant: bool,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub form_data: FormData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<ApplicantDocument>,
    pub status: ApplicationStatus,
    pub status_history: Vec<StatusHistoryEntry>,
    /// Issued exactly once, when the application transitions to paid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_documents: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_docs_requested: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A visa application for one (nationality, destination, visa type)
/// triple, holding its applicants and cached fee total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub nationality_code: String,
    pub destination_code: String,
    pub visa_type_id: String,
    pub template_id: String,
    pub applicants: Vec<Applicant>,
    /// Derived from the fee schedule; recomputed whenever the applicant
    /// count or the expedited flag changes.
    pub total_fee: u32,
    pub currency: String,
    pub expedited: bool,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_deadline: Option<DateTime<Utc>>,
    pub resume_token: String,
    pub user_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn main_applicant(&self) -> Option<&Applicant> {
        self.applicants.iter().find(|a| a.is_main_applicant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_severity_follows_declaration_order() {
        let ordered = [
            ApplicationStatus::Draft,
            ApplicationStatus::Unpaid,
            ApplicationStatus::Submitted,
            ApplicationStatus::InReview,
            ApplicationStatus::NeedDocs,
            ApplicationStatus::Approved,
            ApplicationStatus::Rejected,
            ApplicationStatus::ReadyToDownload,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].severity() < pair[1].severity());
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn status_labels_use_snake_case_wire_names() {
        assert_eq!(ApplicationStatus::NeedDocs.label(), "need_docs");
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::ReadyToDownload).expect("serialize"),
            "\"ready_to_download\""
        );
        let parsed: ApplicationStatus =
            serde_json::from_str("\"in_review\"").expect("parse status");
        assert_eq!(parsed, ApplicationStatus::InReview);
    }
}
