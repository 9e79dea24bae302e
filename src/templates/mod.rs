//! Admin-authored application form templates and their interpreter.
//!
//! A template is opaque schema data, not code: ordered sections of ordered
//! fields with validation rules, conditional visibility, and optional
//! semantic role tags. The engine decides field visibility and validity
//! against one applicant's form-data snapshot; the store owns authoring
//! CRUD and rejects cyclic visibility graphs at save time.

pub mod engine;
pub mod schema;
pub mod store;

pub use engine::{DateCrossCheck, FieldViolation, FormData};
pub use schema::{
    ApplicationTemplate, ConditionalVisibility, FieldOption, FieldType, FormField, FormSection,
    SemanticRole, ValidationRules, VisibilityOperator,
};
pub use store::{FieldDraft, SectionDraft, TemplateDraft, TemplateError, TemplateStore};
