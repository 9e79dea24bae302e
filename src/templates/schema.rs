use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input widget kinds a template field may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Date,
    File,
    Email,
    Phone,
    Number,
}

/// Choice entry for select and radio fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityOperator {
    Equals,
    NotEquals,
    Contains,
}

/// Show/hide rule referencing another field of the same applicant. The
/// referenced value is compared as a string; a missing value compares as
/// the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalVisibility {
    pub field_id: String,
    pub operator: VisibilityOperator,
    pub value: String,
}

/// Per-field validation rules authored by the admin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_error: Option<String>,
}

/// Well-known meaning of a field, set by the template author so autofill
/// and cross-validation never have to scan display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticRole {
    IssuingCountry,
    DepartureDate,
    PassportExpiry,
}

impl SemanticRole {
    /// Legacy templates carry no role tags; fall back to the label keyword
    /// heuristics the portal has always shipped (English and Azerbaijani).
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        if label.contains("issuing") && (label.contains("country") || label.contains("ölkə")) {
            return Some(Self::IssuingCountry);
        }
        if label.contains("passport")
            && (label.contains("expiry")
                || label.contains("expire")
                || label.contains("bitmə")
                || label.contains("etibarlılıq"))
        {
            return Some(Self::PassportExpiry);
        }
        if label.contains("departure")
            || label.contains("travel")
            || label.contains("səfər")
            || label.contains("gediş")
        {
            return Some(Self::DepartureDate);
        }
        None
    }
}

/// One input in a form section. Field ids are unique within a template;
/// they key both the applicant form data and condition targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub validation: ValidationRules,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_visibility: Option<ConditionalVisibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_role: Option<SemanticRole>,
    pub order: i32,
}

impl FormField {
    /// Effective role: the explicit tag wins, otherwise the label
    /// heuristics so untagged templates keep their historical behavior.
    pub fn role(&self) -> Option<SemanticRole> {
        self.semantic_role.or_else(|| SemanticRole::from_label(&self.label))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSection {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FormField>,
    pub order: i32,
}

impl FormSection {
    /// Fields sorted by their numeric `order`, not insertion order.
    pub fn ordered_fields(&self) -> Vec<&FormField> {
        let mut fields: Vec<&FormField> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.order);
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationTemplate {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sections: Vec<FormSection>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationTemplate {
    /// Sections sorted by their numeric `order`.
    pub fn ordered_sections(&self) -> Vec<&FormSection> {
        let mut sections: Vec<&FormSection> = self.sections.iter().collect();
        sections.sort_by_key(|s| s.order);
        sections
    }

    /// Every field in section-then-field order.
    pub fn ordered_fields(&self) -> Vec<&FormField> {
        self.ordered_sections()
            .into_iter()
            .flat_map(|s| s.ordered_fields())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_role_tag_wins_over_label_text() {
        let field = FormField {
            id: "f1".to_string(),
            field_type: FieldType::Date,
            label: "Some unrelated label".to_string(),
            placeholder: None,
            help_text: None,
            options: Vec::new(),
            validation: ValidationRules::default(),
            conditional_visibility: None,
            semantic_role: Some(SemanticRole::PassportExpiry),
            order: 0,
        };
        assert_eq!(field.role(), Some(SemanticRole::PassportExpiry));
    }

    #[test]
    fn label_heuristics_cover_both_languages() {
        assert_eq!(
            SemanticRole::from_label("Passport Expiry Date"),
            Some(SemanticRole::PassportExpiry)
        );
        assert_eq!(
            SemanticRole::from_label("Pasportun etibarlılıq müddəti (passport)"),
            Some(SemanticRole::PassportExpiry)
        );
        assert_eq!(
            SemanticRole::from_label("Departure Date"),
            Some(SemanticRole::DepartureDate)
        );
        assert_eq!(
            SemanticRole::from_label("Gediş tarixi"),
            Some(SemanticRole::DepartureDate)
        );
        assert_eq!(
            SemanticRole::from_label("Issuing Country"),
            Some(SemanticRole::IssuingCountry)
        );
        assert_eq!(SemanticRole::from_label("Given name"), None);
    }

    #[test]
    fn ordering_follows_the_numeric_order_field() {
        let field = |id: &str, order: i32| FormField {
            id: id.to_string(),
            field_type: FieldType::Text,
            label: id.to_string(),
            placeholder: None,
            help_text: None,
            options: Vec::new(),
            validation: ValidationRules::default(),
            conditional_visibility: None,
            semantic_role: None,
            order,
        };

        let template = ApplicationTemplate {
            id: "tpl".to_string(),
            name: "Test".to_string(),
            description: None,
            sections: vec![
                FormSection {
                    id: "s2".to_string(),
                    title: "Second".to_string(),
                    description: None,
                    fields: vec![field("c", 1), field("b", 0)],
                    order: 2,
                },
                FormSection {
                    id: "s1".to_string(),
                    title: "First".to_string(),
                    description: None,
                    fields: vec![field("a", 0)],
                    order: 1,
                },
            ],
            is_active: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let ids: Vec<&str> = template.ordered_fields().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
