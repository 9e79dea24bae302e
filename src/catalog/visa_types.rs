use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::applications::codes::new_entity_id;
use crate::storage::{self, keys, KeyValueStore, StorageError};

/// Number of entries a visa grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryCount {
    Single,
    Double,
    Multiple,
}

impl EntryCount {
    pub const fn label(self) -> &'static str {
        match self {
            EntryCount::Single => "Single Entry",
            EntryCount::Double => "Double Entry",
            EntryCount::Multiple => "Multiple Entry",
        }
    }
}

/// A visa product offered by the portal. Soft-disabled via `is_active`
/// rather than deleted once bindings reference it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisaType {
    pub id: String,
    pub purpose: String,
    pub validity_days: u32,
    pub max_stay: u32,
    pub entries: EntryCount,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VisaType {
    /// Display string derived from the product attributes, e.g.
    /// `"Tourism - Single Entry - 30 days"`.
    pub fn display_label(&self) -> String {
        format!("{} - {} - {} days", self.purpose, self.entries.label(), self.max_stay)
    }
}

/// Admin input for creating a visa type.
#[derive(Debug, Clone)]
pub struct VisaTypeDraft {
    pub purpose: String,
    pub validity_days: u32,
    pub max_stay: u32,
    pub entries: EntryCount,
    pub label: String,
    pub description: Option<String>,
    pub is_active: bool,
}

/// Admin-managed catalog of visa products over the storage contract.
pub struct VisaTypeCatalog<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
}

impl<S: KeyValueStore + ?Sized> VisaTypeCatalog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn all(&self) -> Vec<VisaType> {
        storage::load_collection(self.store.as_ref(), keys::VISA_TYPES)
    }

    pub fn active(&self) -> Vec<VisaType> {
        self.all().into_iter().filter(|v| v.is_active).collect()
    }

    pub fn by_id(&self, id: &str) -> Option<VisaType> {
        self.all().into_iter().find(|v| v.id == id)
    }

    pub fn create(&self, draft: VisaTypeDraft) -> Result<VisaType, StorageError> {
        let mut visa_types = self.all();
        let now = Utc::now();

        let visa_type = VisaType {
            id: new_entity_id(),
            purpose: draft.purpose,
            validity_days: draft.validity_days,
            max_stay: draft.max_stay,
            entries: draft.entries,
            label: draft.label,
            description: draft.description,
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        };

        visa_types.push(visa_type.clone());
        storage::save_collection(self.store.as_ref(), keys::VISA_TYPES, &visa_types)?;
        Ok(visa_type)
    }

    /// Apply an in-place edit to a visa type, bumping its `updated_at`.
    /// Returns `None` when the id is unknown.
    pub fn update(
        &self,
        id: &str,
        apply: impl FnOnce(&mut VisaType),
    ) -> Result<Option<VisaType>, StorageError> {
        let mut visa_types = self.all();
        let Some(visa_type) = visa_types.iter_mut().find(|v| v.id == id) else {
            return Ok(None);
        };

        apply(visa_type);
        visa_type.updated_at = Utc::now();
        let updated = visa_type.clone();

        storage::save_collection(self.store.as_ref(), keys::VISA_TYPES, &visa_types)?;
        Ok(Some(updated))
    }

    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut visa_types = self.all();
        let before = visa_types.len();
        visa_types.retain(|v| v.id != id);

        if visa_types.len() == before {
            return Ok(false);
        }

        storage::save_collection(self.store.as_ref(), keys::VISA_TYPES, &visa_types)?;
        Ok(true)
    }
}
