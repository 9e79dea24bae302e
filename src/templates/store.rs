use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use super::schema::{ApplicationTemplate, FormField, FormSection};
use crate::applications::codes::new_entity_id;
use crate::storage::{self, keys, KeyValueStore, StorageError};

/// Errors raised while authoring templates. Lookup misses stay `None`;
/// only persistence failures and rejected rule graphs error.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("conditional visibility cycle involving field '{field_id}'")]
    VisibilityCycle { field_id: String },
}

/// Admin input for creating a template.
#[derive(Debug, Clone)]
pub struct TemplateDraft {
    pub name: String,
    pub description: Option<String>,
    pub sections: Vec<FormSection>,
    pub is_active: bool,
}

/// Field input without an id; the store assigns one.
#[derive(Debug, Clone)]
pub struct FieldDraft {
    pub field_type: super::schema::FieldType,
    pub label: String,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub options: Vec<super::schema::FieldOption>,
    pub validation: super::schema::ValidationRules,
    pub conditional_visibility: Option<super::schema::ConditionalVisibility>,
    pub semantic_role: Option<super::schema::SemanticRole>,
    pub order: i32,
}

/// Section input without an id.
#[derive(Debug, Clone)]
pub struct SectionDraft {
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<FormField>,
    pub order: i32,
}

/// Authoring store for application templates. Every save re-sorts sections
/// and fields by their numeric `order` and rejects cyclic visibility
/// graphs, so rendering never has to cope with either.
pub struct TemplateStore<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
}

impl<S: KeyValueStore + ?Sized> TemplateStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn all(&self) -> Vec<ApplicationTemplate> {
        storage::load_collection(self.store.as_ref(), keys::TEMPLATES)
    }

    pub fn active(&self) -> Vec<ApplicationTemplate> {
        self.all().into_iter().filter(|t| t.is_active).collect()
    }

    pub fn by_id(&self, id: &str) -> Option<ApplicationTemplate> {
        self.all().into_iter().find(|t| t.id == id)
    }

    pub fn create(&self, draft: TemplateDraft) -> Result<ApplicationTemplate, TemplateError> {
        let now = Utc::now();
        let mut template = ApplicationTemplate {
            id: new_entity_id(),
            name: draft.name,
            description: draft.description,
            sections: draft.sections,
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        };
        normalize(&mut template);
        validate_visibility_graph(&template)?;

        let mut templates = self.all();
        templates.push(template.clone());
        storage::save_collection(self.store.as_ref(), keys::TEMPLATES, &templates)?;
        Ok(template)
    }

    /// Apply an in-place edit, re-sorting and re-validating before the
    /// collection is persisted. `None` when the id is unknown.
    pub fn update(
        &self,
        id: &str,
        apply: impl FnOnce(&mut ApplicationTemplate),
    ) -> Result<Option<ApplicationTemplate>, TemplateError> {
        let mut templates = self.all();
        let Some(template) = templates.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };

        apply(template);
        normalize(template);
        template.updated_at = Utc::now();
        validate_visibility_graph(template)?;
        let updated = template.clone();

        storage::save_collection(self.store.as_ref(), keys::TEMPLATES, &templates)?;
        Ok(Some(updated))
    }

    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut templates = self.all();
        let before = templates.len();
        templates.retain(|t| t.id != id);

        if templates.len() == before {
            return Ok(false);
        }

        storage::save_collection(self.store.as_ref(), keys::TEMPLATES, &templates)?;
        Ok(true)
    }

    pub fn add_section(
        &self,
        template_id: &str,
        draft: SectionDraft,
    ) -> Result<Option<ApplicationTemplate>, TemplateError> {
        self.update(template_id, |template| {
            template.sections.push(FormSection {
                id: new_entity_id(),
                title: draft.title,
                description: draft.description,
                fields: draft.fields,
                order: draft.order,
            });
        })
    }

    pub fn update_section(
        &self,
        template_id: &str,
        section_id: &str,
        apply: impl FnOnce(&mut FormSection),
    ) -> Result<Option<ApplicationTemplate>, TemplateError> {
        let mut found = false;
        let updated = self.update(template_id, |template| {
            if let Some(section) = template.sections.iter_mut().find(|s| s.id == section_id) {
                apply(section);
                found = true;
            }
        })?;
        Ok(updated.filter(|_| found))
    }

    pub fn delete_section(
        &self,
        template_id: &str,
        section_id: &str,
    ) -> Result<Option<ApplicationTemplate>, TemplateError> {
        self.update(template_id, |template| {
            template.sections.retain(|s| s.id != section_id);
        })
    }

    pub fn add_field(
        &self,
        template_id: &str,
        section_id: &str,
        draft: FieldDraft,
    ) -> Result<Option<ApplicationTemplate>, TemplateError> {
        self.update_section(template_id, section_id, |section| {
            section.fields.push(FormField {
                id: new_entity_id(),
                field_type: draft.field_type,
                label: draft.label,
                placeholder: draft.placeholder,
                help_text: draft.help_text,
                options: draft.options,
                validation: draft.validation,
                conditional_visibility: draft.conditional_visibility,
                semantic_role: draft.semantic_role,
                order: draft.order,
            });
        })
    }

    pub fn update_field(
        &self,
        template_id: &str,
        section_id: &str,
        field_id: &str,
        apply: impl FnOnce(&mut FormField),
    ) -> Result<Option<ApplicationTemplate>, TemplateError> {
        let mut found = false;
        let updated = self.update_section(template_id, section_id, |section| {
            if let Some(field) = section.fields.iter_mut().find(|f| f.id == field_id) {
                apply(field);
                found = true;
            }
        })?;
        Ok(updated.filter(|_| found))
    }

    pub fn delete_field(
        &self,
        template_id: &str,
        section_id: &str,
        field_id: &str,
    ) -> Result<Option<ApplicationTemplate>, TemplateError> {
        self.update_section(template_id, section_id, |section| {
            section.fields.retain(|f| f.id != field_id);
        })
    }

    /// Copy a template under a `"(Copy)"` name with fresh section and
    /// field ids, inactive until the admin enables it.
    pub fn duplicate(&self, id: &str) -> Result<Option<ApplicationTemplate>, TemplateError> {
        let Some(source) = self.by_id(id) else {
            return Ok(None);
        };

        // Visibility rules reference field ids, so remap them alongside.
        let mut id_map: BTreeMap<String, String> = BTreeMap::new();
        for section in &source.sections {
            for field in &section.fields {
                id_map.insert(field.id.clone(), new_entity_id());
            }
        }

        let sections = source
            .sections
            .iter()
            .map(|section| FormSection {
                id: new_entity_id(),
                title: section.title.clone(),
                description: section.description.clone(),
                fields: section
                    .fields
                    .iter()
                    .map(|field| {
                        let mut copied = field.clone();
                        copied.id = id_map[&field.id].clone();
                        if let Some(rule) = &mut copied.conditional_visibility {
                            if let Some(mapped) = id_map.get(&rule.field_id) {
                                rule.field_id = mapped.clone();
                            }
                        }
                        copied
                    })
                    .collect(),
                order: section.order,
            })
            .collect();

        let copy = self.create(TemplateDraft {
            name: format!("{} (Copy)", source.name),
            description: source.description.clone(),
            sections,
            is_active: false,
        })?;
        Ok(Some(copy))
    }
}

fn normalize(template: &mut ApplicationTemplate) {
    template.sections.sort_by_key(|s| s.order);
    for section in &mut template.sections {
        section.fields.sort_by_key(|f| f.order);
    }
}

/// Reject visibility graphs with cycles (including self-references) at
/// authoring time, so rendering can evaluate rules naively. References to
/// unknown field ids are allowed: they compare against the empty string at
/// render time and cannot close a cycle.
fn validate_visibility_graph(template: &ApplicationTemplate) -> Result<(), TemplateError> {
    let mut edges: BTreeMap<&str, &str> = BTreeMap::new();
    for section in &template.sections {
        for field in &section.fields {
            if let Some(rule) = &field.conditional_visibility {
                edges.insert(field.id.as_str(), rule.field_id.as_str());
            }
        }
    }

    // Each node has at most one outgoing edge, so walking the chain with a
    // visited set per start node is enough.
    for start in edges.keys() {
        let mut seen = vec![*start];
        let mut current = *start;
        while let Some(next) = edges.get(current) {
            if seen.contains(next) {
                return Err(TemplateError::VisibilityCycle {
                    field_id: (*start).to_string(),
                });
            }
            seen.push(*next);
            current = *next;
        }
    }

    Ok(())
}
