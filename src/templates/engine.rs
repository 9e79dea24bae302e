//! Interprets a template against one applicant's form-data snapshot.
//!
//! Nothing here returns an error: outputs are booleans, violation lists,
//! or a tri-state date check, so the calling UI decides what is fatal and
//! a broken rule degrades to "show the field" rather than a crash.

use std::collections::BTreeMap;

use chrono::{Months, NaiveDate};
use serde_json::Value;

use super::schema::{
    ApplicationTemplate, FieldType, FormField, SemanticRole, VisibilityOperator,
};

/// One applicant's answers keyed by field id. Values are JSON because the
/// admin decides field types at runtime.
pub type FormData = BTreeMap<String, Value>;

/// A required field that is missing or empty, named for display together
/// with the one-based applicant index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field_id: String,
    pub label: String,
    pub applicant_index: usize,
}

impl FieldViolation {
    pub fn message(&self) -> String {
        format!("{} - Applicant #{}", self.label, self.applicant_index)
    }
}

/// Outcome of the departure/passport-expiry cross check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateCrossCheck {
    Ok,
    /// Advisory only: the passport expires less than six calendar months
    /// after the departure date. Never blocks submission.
    Warning { departure: NaiveDate, expiry: NaiveDate },
    /// Departure on or after the passport expiry date; blocks submission.
    Blocking { departure: NaiveDate, expiry: NaiveDate },
}

impl DateCrossCheck {
    pub fn is_blocking(&self) -> bool {
        matches!(self, DateCrossCheck::Blocking { .. })
    }

    pub fn message(&self) -> Option<String> {
        match self {
            DateCrossCheck::Ok => None,
            DateCrossCheck::Warning { .. } => Some(
                "Passport should remain valid for at least 6 months after the departure date"
                    .to_string(),
            ),
            DateCrossCheck::Blocking { .. } => {
                Some("Departure date must fall before the passport expiry date".to_string())
            }
        }
    }
}

/// String view of a form value: missing and null read as the empty string,
/// scalars as their display form.
pub fn value_as_string(form_data: &FormData, field_id: &str) -> String {
    match form_data.get(field_id) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty() && s != "false",
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(_) => true,
    }
}

/// Whether a field should currently be shown. A field without a rule is
/// always visible; an unknown operator falls back to visible rather than
/// erroring.
pub fn is_field_visible(field: &FormField, form_data: &FormData) -> bool {
    let Some(rule) = &field.conditional_visibility else {
        return true;
    };

    let current = value_as_string(form_data, &rule.field_id);
    match rule.operator {
        VisibilityOperator::Equals => current == rule.value,
        VisibilityOperator::NotEquals => current != rule.value,
        VisibilityOperator::Contains => current.contains(&rule.value),
    }
}

/// Collect every required-field violation for one applicant, in
/// section-then-field order. Hidden fields are never required. File fields
/// check the uploaded-documents map, checkboxes check truthiness, every
/// other type checks for a non-empty value. The full list is returned so
/// the caller can surface them together or stop at the first.
pub fn validate_applicant<D>(
    template: &ApplicationTemplate,
    form_data: &FormData,
    documents: &BTreeMap<String, D>,
    applicant_index: usize,
) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    for field in template.ordered_fields() {
        if !is_field_visible(field, form_data) {
            continue;
        }
        if !field.validation.required {
            continue;
        }

        let satisfied = match field.field_type {
            FieldType::File => documents.contains_key(&field.id),
            FieldType::Checkbox => is_truthy(form_data.get(&field.id)),
            _ => !value_as_string(form_data, &field.id).is_empty(),
        };

        if !satisfied {
            violations.push(FieldViolation {
                field_id: field.id.clone(),
                label: field.label.clone(),
                applicant_index,
            });
        }
    }

    violations
}

fn visible_date_value(
    template: &ApplicationTemplate,
    form_data: &FormData,
    role: SemanticRole,
) -> Option<NaiveDate> {
    template
        .ordered_fields()
        .into_iter()
        .filter(|f| f.field_type == FieldType::Date && is_field_visible(f, form_data))
        .find(|f| f.role() == Some(role))
        .and_then(|f| {
            let raw = value_as_string(form_data, &f.id);
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok()
        })
}

/// Cross-validate the departure date against the passport expiry date.
/// Evaluated both interactively on field change and again at submission;
/// only the blocking case stops progression. When either date is missing
/// or unparsable the check passes.
pub fn cross_validate_dates(template: &ApplicationTemplate, form_data: &FormData) -> DateCrossCheck {
    let Some(departure) = visible_date_value(template, form_data, SemanticRole::DepartureDate)
    else {
        return DateCrossCheck::Ok;
    };
    let Some(expiry) = visible_date_value(template, form_data, SemanticRole::PassportExpiry) else {
        return DateCrossCheck::Ok;
    };

    if departure >= expiry {
        return DateCrossCheck::Blocking { departure, expiry };
    }

    let six_months_out = departure + Months::new(6);
    if expiry < six_months_out {
        return DateCrossCheck::Warning { departure, expiry };
    }

    DateCrossCheck::Ok
}

/// Pre-populate every issuing-country field with the traveler's
/// nationality code, for every applicant form that does not already hold a
/// value there. Idempotent: existing non-empty values are never touched.
pub fn autofill_issuing_country<'a>(
    template: &ApplicationTemplate,
    nationality_code: &str,
    forms: impl IntoIterator<Item = &'a mut FormData>,
) {
    let issuing_fields: Vec<&FormField> = template
        .ordered_fields()
        .into_iter()
        .filter(|f| f.role() == Some(SemanticRole::IssuingCountry))
        .collect();

    if issuing_fields.is_empty() {
        return;
    }

    for form in forms {
        for field in &issuing_fields {
            if value_as_string(form, &field.id).is_empty() {
                form.insert(field.id.clone(), Value::String(nationality_code.to_string()));
            }
        }
    }
}
