use std::sync::Arc;

use serde_json::json;

use crate::applications::draft::{DraftApplicant, DraftApplication};
use crate::applications::workflow::{ApplicationWorkflow, NewApplicant, NewApplication};
use crate::catalog::{BindingDraft, BindingRepository, NationalityBinding};
use crate::config::PortalSettings;
use crate::storage::MemoryStore;
use crate::templates::FormData;

pub(super) fn az_fees() -> NationalityBinding {
    NationalityBinding {
        nationality_code: "AZ".to_string(),
        government_fee: 50,
        service_fee: 20,
        currency: "USD".to_string(),
        expedited_fee: Some(50),
        expedited_enabled: true,
    }
}

/// Store pre-seeded with the US tourism binding every test operates on.
pub(super) fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::default());
    let bindings = BindingRepository::new(store.clone());
    bindings
        .create(BindingDraft {
            destination_code: "US".to_string(),
            visa_type_id: "tourism-single".to_string(),
            template_id: "tpl-default".to_string(),
            nationalities: vec![az_fees()],
            is_active: true,
        })
        .expect("seed binding");
    store
}

pub(super) fn workflow() -> ApplicationWorkflow<MemoryStore> {
    ApplicationWorkflow::new(seeded_store(), PortalSettings::default())
}

pub(super) fn workflow_with_settings(
    settings: PortalSettings,
) -> ApplicationWorkflow<MemoryStore> {
    ApplicationWorkflow::new(seeded_store(), settings)
}

pub(super) fn us_tourism_application(expedited: bool) -> NewApplication {
    NewApplication {
        nationality_code: "AZ".to_string(),
        destination_code: "US".to_string(),
        visa_type_id: "tourism-single".to_string(),
        template_id: "tpl-default".to_string(),
        user_email: "traveler@example.com".to_string(),
        expedited,
    }
}

pub(super) fn applicant(email: &str) -> NewApplicant {
    NewApplicant {
        email: email.to_string(),
        phone: None,
        is_main_applicant: false,
        form_data: FormData::new(),
        documents: Vec::new(),
    }
}

pub(super) fn two_traveler_draft() -> DraftApplication {
    let mut form = FormData::new();
    form.insert("full_name".to_string(), json!("First Traveler"));

    let mut draft = DraftApplication::new(
        "AZ",
        "US",
        "tourism-single",
        "tpl-default",
        "traveler@example.com",
    );
    draft.applicants.push(DraftApplicant {
        form_data: form,
        documents: Default::default(),
        phone: Some("+994500000000".to_string()),
    });
    draft.applicants.push(DraftApplicant::default());
    draft
}
