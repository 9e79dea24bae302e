//! Visa product catalog: the visa types an administrator offers and the
//! bindings that connect a destination and visa type to a template and a
//! per-nationality fee schedule.

pub mod bindings;
pub mod visa_types;

pub use bindings::{BindingDraft, BindingRepository, NationalityBinding, TemplateBinding};
pub use visa_types::{EntryCount, VisaType, VisaTypeCatalog, VisaTypeDraft};
