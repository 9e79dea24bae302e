use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::applications::codes::new_entity_id;
use crate::storage::{self, keys, KeyValueStore, StorageError};

/// Fee schedule for one nationality within a binding. Fees are expressed in
/// whole units of `currency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationalityBinding {
    pub nationality_code: String,
    pub government_fee: u32,
    pub service_fee: u32,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expedited_fee: Option<u32>,
    pub expedited_enabled: bool,
}

/// Connects a destination and visa type to a form template and the
/// nationalities allowed to apply. The (destination, visa type) pair is
/// expected to be unique among active bindings; lookups take the first
/// match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateBinding {
    pub id: String,
    pub destination_code: String,
    pub visa_type_id: String,
    pub template_id: String,
    pub nationalities: Vec<NationalityBinding>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin input for creating a binding.
#[derive(Debug, Clone)]
pub struct BindingDraft {
    pub destination_code: String,
    pub visa_type_id: String,
    pub template_id: String,
    pub nationalities: Vec<NationalityBinding>,
    pub is_active: bool,
}

/// Single source of truth for "who can apply for what, and at what price".
///
/// Reads are pure; mutations persist the whole binding collection. Absence
/// is always a `None`/empty return — a missing binding means "not offered"
/// on the public site, never a fault.
pub struct BindingRepository<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
}

impl<S: KeyValueStore + ?Sized> BindingRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn all(&self) -> Vec<TemplateBinding> {
        storage::load_collection(self.store.as_ref(), keys::BINDINGS)
    }

    pub fn active(&self) -> Vec<TemplateBinding> {
        self.all().into_iter().filter(|b| b.is_active).collect()
    }

    pub fn by_id(&self, id: &str) -> Option<TemplateBinding> {
        self.all().into_iter().find(|b| b.id == id)
    }

    /// First active binding matching both codes exactly (case-sensitive
    /// ISO codes).
    pub fn binding_for(&self, destination_code: &str, visa_type_id: &str) -> Option<TemplateBinding> {
        self.active()
            .into_iter()
            .find(|b| b.destination_code == destination_code && b.visa_type_id == visa_type_id)
    }

    pub fn bindings_for_destination(&self, destination_code: &str) -> Vec<TemplateBinding> {
        self.active()
            .into_iter()
            .filter(|b| b.destination_code == destination_code)
            .collect()
    }

    /// Every destination that has at least one active binding, in first
    /// occurrence order.
    pub fn destinations_with_bindings(&self) -> Vec<String> {
        let mut destinations: Vec<String> = Vec::new();
        for binding in self.active() {
            if !destinations.contains(&binding.destination_code) {
                destinations.push(binding.destination_code);
            }
        }
        destinations
    }

    /// Unique visa types offered for a destination, regardless of
    /// nationality.
    pub fn visa_types_for_destination(&self, destination_code: &str) -> Vec<String> {
        let mut visa_types: Vec<String> = Vec::new();
        for binding in self.bindings_for_destination(destination_code) {
            if !visa_types.contains(&binding.visa_type_id) {
                visa_types.push(binding.visa_type_id);
            }
        }
        visa_types
    }

    /// Whether a nationality may apply for the given destination and visa
    /// type at all.
    pub fn can_apply(&self, nationality_code: &str, destination_code: &str, visa_type_id: &str) -> bool {
        self.binding_for(destination_code, visa_type_id)
            .map(|b| {
                b.nationalities
                    .iter()
                    .any(|n| n.nationality_code == nationality_code)
            })
            .unwrap_or(false)
    }

    /// Fee schedule for one (nationality, destination, visa type) triple.
    /// `None` when either the binding or the nationality entry is missing.
    pub fn fees_for(
        &self,
        nationality_code: &str,
        destination_code: &str,
        visa_type_id: &str,
    ) -> Option<NationalityBinding> {
        let binding = self.binding_for(destination_code, visa_type_id)?;
        binding
            .nationalities
            .into_iter()
            .find(|n| n.nationality_code == nationality_code)
    }

    /// Destinations a nationality may travel to, deduplicated in first
    /// occurrence order. Callers must not rely on any ordering beyond
    /// stability within one read.
    pub fn destinations_for(&self, nationality_code: &str) -> Vec<String> {
        let mut destinations: Vec<String> = Vec::new();
        for binding in self.active() {
            let eligible = binding
                .nationalities
                .iter()
                .any(|n| n.nationality_code == nationality_code);
            if eligible && !destinations.contains(&binding.destination_code) {
                destinations.push(binding.destination_code);
            }
        }
        destinations
    }

    /// Visa types a nationality may apply for at a destination. Not
    /// deduplicated: bindings are keyed uniquely per (destination, visa
    /// type), so duplicates only appear when the data itself is malformed.
    pub fn visa_types_for(&self, nationality_code: &str, destination_code: &str) -> Vec<String> {
        self.bindings_for_destination(destination_code)
            .into_iter()
            .filter(|b| {
                b.nationalities
                    .iter()
                    .any(|n| n.nationality_code == nationality_code)
            })
            .map(|b| b.visa_type_id)
            .collect()
    }

    pub fn create(&self, draft: BindingDraft) -> Result<TemplateBinding, StorageError> {
        let mut bindings = self.all();
        let now = Utc::now();

        let binding = TemplateBinding {
            id: new_entity_id(),
            destination_code: draft.destination_code,
            visa_type_id: draft.visa_type_id,
            template_id: draft.template_id,
            nationalities: draft.nationalities,
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        };

        bindings.push(binding.clone());
        storage::save_collection(self.store.as_ref(), keys::BINDINGS, &bindings)?;
        Ok(binding)
    }

    /// Apply an in-place edit, bumping `updated_at`. `None` when the id is
    /// unknown.
    pub fn update(
        &self,
        id: &str,
        apply: impl FnOnce(&mut TemplateBinding),
    ) -> Result<Option<TemplateBinding>, StorageError> {
        let mut bindings = self.all();
        let Some(binding) = bindings.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };

        apply(binding);
        binding.updated_at = Utc::now();
        let updated = binding.clone();

        storage::save_collection(self.store.as_ref(), keys::BINDINGS, &bindings)?;
        Ok(Some(updated))
    }

    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut bindings = self.all();
        let before = bindings.len();
        bindings.retain(|b| b.id != id);

        if bindings.len() == before {
            return Ok(false);
        }

        storage::save_collection(self.store.as_ref(), keys::BINDINGS, &bindings)?;
        Ok(true)
    }

    /// Upsert the fee schedule for one nationality within a binding:
    /// replaced when the nationality code is already present, appended
    /// otherwise.
    pub fn set_nationality_fees(
        &self,
        binding_id: &str,
        entry: NationalityBinding,
    ) -> Result<Option<TemplateBinding>, StorageError> {
        self.update(binding_id, |binding| {
            match binding
                .nationalities
                .iter_mut()
                .find(|n| n.nationality_code == entry.nationality_code)
            {
                Some(existing) => *existing = entry,
                None => binding.nationalities.push(entry),
            }
        })
    }

    pub fn remove_nationality_fees(
        &self,
        binding_id: &str,
        nationality_code: &str,
    ) -> Result<Option<TemplateBinding>, StorageError> {
        self.update(binding_id, |binding| {
            binding
                .nationalities
                .retain(|n| n.nationality_code != nationality_code);
        })
    }
}
