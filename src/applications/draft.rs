use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::templates::FormData;

use super::domain::ApplicantDocument;

/// One traveler's in-progress answers before submission. Documents are
/// keyed by the field id they were uploaded for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftApplicant {
    pub form_data: FormData,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub documents: BTreeMap<String, ApplicantDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// An application being assembled by the wizard, owned by the caller (one
/// per session or tab) rather than held as ambient global state. Submitted
/// into a persisted [`super::domain::Application`] in one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftApplication {
    pub nationality_code: String,
    pub destination_code: String,
    pub visa_type_id: String,
    pub template_id: String,
    pub expedited: bool,
    pub verified_email: String,
    pub applicants: Vec<DraftApplicant>,
}

impl DraftApplication {
    pub fn new(
        nationality_code: impl Into<String>,
        destination_code: impl Into<String>,
        visa_type_id: impl Into<String>,
        template_id: impl Into<String>,
        verified_email: impl Into<String>,
    ) -> Self {
        Self {
            nationality_code: nationality_code.into(),
            destination_code: destination_code.into(),
            visa_type_id: visa_type_id.into(),
            template_id: template_id.into(),
            expedited: false,
            verified_email: verified_email.into(),
            applicants: Vec::new(),
        }
    }

    /// Append an empty traveler, returning its index.
    pub fn add_applicant(&mut self) -> usize {
        self.applicants.push(DraftApplicant::default());
        self.applicants.len() - 1
    }

    pub fn remove_applicant(&mut self, index: usize) {
        if index < self.applicants.len() {
            self.applicants.remove(index);
        }
    }

    /// Mutable form-data views for every traveler, in order; feeds the
    /// template engine's autofill.
    pub fn forms_mut(&mut self) -> impl Iterator<Item = &mut FormData> {
        self.applicants.iter_mut().map(|a| &mut a.form_data)
    }
}
