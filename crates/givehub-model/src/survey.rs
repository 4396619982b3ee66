// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DomainError, ValidationError};
use crate::ids::{SubmissionId, UserId};
use crate::user::{normalize_name, normalize_phone};

const SLUG_MIN_LEN: usize = 3;
const SLUG_MAX_LEN: usize = 48;
const KEY_MAX_LEN: usize = 64;
const TEXT_HARD_LIMIT: usize = 4_000;
const MAX_FIELDS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum FieldKind {
    Text { max_len: usize },
    Number { min: i64, max: i64 },
    Phone,
    Boolean,
    Choice { options: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurveyField {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyForm {
    pub slug: String,
    pub title: String,
    pub fields: Vec<SurveyField>,
    pub active: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewSurveyForm {
    pub slug: String,
    pub title: String,
    pub fields: Vec<SurveyField>,
}

impl NewSurveyForm {
    pub fn validate(self) -> Result<Self, DomainError> {
        let mut errors = Vec::new();

        let slug = self.slug.trim().to_string();
        let slug_ok = (SLUG_MIN_LEN..=SLUG_MAX_LEN).contains(&slug.len())
            && slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !slug.starts_with('-')
            && !slug.ends_with('-');
        if !slug_ok {
            errors.push(ValidationError::new(
                "slug",
                format!("must be {SLUG_MIN_LEN}..={SLUG_MAX_LEN} characters of [a-z0-9-]"),
            ));
        }
        let title = normalize_name("title", &self.title)
            .map_err(|e| errors.push(e))
            .ok();

        if self.fields.is_empty() || self.fields.len() > MAX_FIELDS {
            errors.push(ValidationError::new(
                "fields",
                format!("must declare 1..={MAX_FIELDS} fields"),
            ));
        }
        let mut keys = BTreeSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for (idx, field) in self.fields.into_iter().enumerate() {
            let at = |name: &str| format!("fields[{idx}].{name}");
            let key = field.key.trim().to_string();
            if key.is_empty()
                || key.len() > KEY_MAX_LEN
                || !key
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            {
                errors.push(ValidationError::new(at("key"), "must match [a-z0-9_]+"));
            } else if !keys.insert(key.clone()) {
                errors.push(ValidationError::new(
                    at("key"),
                    format!("duplicate key `{key}`"),
                ));
            }
            let label = match normalize_name(&at("label"), &field.label) {
                Ok(label) => label,
                Err(e) => {
                    errors.push(e);
                    String::new()
                }
            };
            match &field.kind {
                FieldKind::Text { max_len } if *max_len == 0 || *max_len > TEXT_HARD_LIMIT => {
                    errors.push(ValidationError::new(
                        at("kind.max_len"),
                        format!("must be 1..={TEXT_HARD_LIMIT}"),
                    ));
                }
                FieldKind::Number { min, max } if min > max => {
                    errors.push(ValidationError::new(at("kind"), "min must not exceed max"));
                }
                FieldKind::Choice { options } if options.iter().all(|o| o.trim().is_empty()) => {
                    errors.push(ValidationError::new(
                        at("kind.options"),
                        "at least one option is required",
                    ));
                }
                _ => {}
            }
            fields.push(SurveyField {
                key,
                label,
                kind: field.kind,
                required: field.required,
            });
        }

        match title {
            Some(title) if errors.is_empty() => Ok(Self {
                slug,
                title,
                fields,
            }),
            _ => Err(DomainError::Validation(errors)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveySubmission {
    pub id: SubmissionId,
    pub form_slug: String,
    pub answers: Value,
    pub referrer_id: Option<UserId>,
    pub submitted_at: i64,
}

/// Checks `answers` against `form`, returning the normalized answer object.
/// Every field problem is reported, not just the first.
pub fn validate_answers(form: &SurveyForm, answers: &Value) -> Result<Map<String, Value>, DomainError> {
    let Some(object) = answers.as_object() else {
        return Err(DomainError::invalid("answers", "must be a JSON object"));
    };

    let mut errors = Vec::new();
    for key in object.keys() {
        if !form.fields.iter().any(|f| &f.key == key) {
            errors.push(ValidationError::new(
                format!("answers.{key}"),
                "is not a field of this survey",
            ));
        }
    }

    let mut normalized = Map::new();
    for field in &form.fields {
        let at = format!("answers.{}", field.key);
        let value = object.get(&field.key).filter(|v| !v.is_null());
        let Some(value) = value else {
            if field.required {
                errors.push(ValidationError::new(at, "is required"));
            }
            continue;
        };
        match check_value(&field.kind, &at, value) {
            Ok(Some(v)) => {
                normalized.insert(field.key.clone(), v);
            }
            Ok(None) if field.required => errors.push(ValidationError::new(at, "is required")),
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(normalized)
    } else {
        Err(DomainError::Validation(errors))
    }
}

fn check_value(kind: &FieldKind, at: &str, value: &Value) -> Result<Option<Value>, ValidationError> {
    match kind {
        FieldKind::Text { max_len } => {
            let text = value
                .as_str()
                .ok_or_else(|| ValidationError::new(at, "must be a string"))?
                .trim();
            if text.is_empty() {
                return Ok(None);
            }
            if text.chars().count() > *max_len {
                return Err(ValidationError::new(
                    at,
                    format!("must be at most {max_len} characters"),
                ));
            }
            Ok(Some(Value::String(text.to_string())))
        }
        FieldKind::Number { min, max } => {
            let n = value
                .as_i64()
                .ok_or_else(|| ValidationError::new(at, "must be an integer"))?;
            if n < *min || n > *max {
                return Err(ValidationError::new(
                    at,
                    format!("must be between {min} and {max}"),
                ));
            }
            Ok(Some(Value::from(n)))
        }
        FieldKind::Phone => {
            let raw = value
                .as_str()
                .ok_or_else(|| ValidationError::new(at, "must be a string"))?;
            if raw.trim().is_empty() {
                return Ok(None);
            }
            normalize_phone(at, raw).map(|p| Some(Value::String(p)))
        }
        FieldKind::Boolean => value
            .as_bool()
            .map(|b| Some(Value::Bool(b)))
            .ok_or_else(|| ValidationError::new(at, "must be true or false")),
        FieldKind::Choice { options } => {
            let raw = value
                .as_str()
                .ok_or_else(|| ValidationError::new(at, "must be a string"))?
                .trim();
            if raw.is_empty() {
                return Ok(None);
            }
            options
                .iter()
                .find(|o| o.trim() == raw)
                .map(|o| Some(Value::String(o.trim().to_string())))
                .ok_or_else(|| ValidationError::new(at, "is not one of the allowed options"))
        }
    }
}
