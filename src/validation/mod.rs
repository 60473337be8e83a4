//! Request-body validation rules, keyed by module and action.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::types::Role;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// String with a character count in `min..=max`
    Text { min: usize, max: usize },
    Email,
    Number,
    /// Array of non-empty strings
    TextList,
    Id,
    Date,
    OneOf(&'static [&'static str]),
    Object,
}

/// A named field shape shared across validators
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldModel {
    pub path: &'static str,
    pub kind: FieldKind,
}

impl FieldModel {
    pub const fn new(path: &'static str, kind: FieldKind) -> Self {
        Self { path, kind }
    }

    /// Error for a present value, if any
    fn check(&self, value: &Value) -> Option<String> {
        let path = self.path;
        match self.kind {
            FieldKind::Text { min, max } => match value.as_str() {
                Some(s) if (min..=max).contains(&s.chars().count()) => None,
                Some(_) => Some(format!("{} length must be between {} and {}", path, min, max)),
                None => Some(format!("{} must be a string", path)),
            },
            FieldKind::Email => match value.as_str() {
                Some(s) if is_email(s) => None,
                _ => Some(format!("{} must be a valid email", path)),
            },
            FieldKind::Number => match value.is_number() {
                true => None,
                false => Some(format!("{} must be a number", path)),
            },
            FieldKind::TextList => match value.as_array() {
                Some(items) if items.iter().all(|i| i.as_str().is_some_and(|s| !s.is_empty())) => None,
                _ => Some(format!("{} must be an array of non-empty strings", path)),
            },
            FieldKind::Id => match value.as_str().map(Uuid::parse_str) {
                Some(Ok(_)) => None,
                _ => Some(format!("{} is of invalid type", path)),
            },
            FieldKind::Date => match value.as_str().and_then(parse_date) {
                Some(_) => None,
                None => Some(format!("{} is an invalid date", path)),
            },
            FieldKind::OneOf(allowed) => match value.as_str() {
                Some(s) if allowed.contains(&s) => None,
                _ => Some(format!("{} must be one of: {}", path, allowed.join(", "))),
            },
            FieldKind::Object => match value.is_object() {
                true => None,
                false => Some(format!("{} must be an object", path)),
            },
        }
    }
}

/// The shared field table
pub mod models {
    use super::{FieldKind, FieldModel, Role};

    pub const NAME: FieldModel = FieldModel::new("name", FieldKind::Text { min: 3, max: 50 });
    pub const FIRST_NAME: FieldModel = FieldModel::new("firstName", FieldKind::Text { min: 3, max: 20 });
    pub const LAST_NAME: FieldModel = FieldModel::new("lastName", FieldKind::Text { min: 3, max: 20 });
    pub const PASSWORD: FieldModel = FieldModel::new("password", FieldKind::Text { min: 8, max: 100 });
    /// Login accepts any non-empty password; length rules apply on creation only
    pub const LOGIN_PASSWORD: FieldModel = FieldModel::new("password", FieldKind::Text { min: 1, max: 100 });
    pub const EMAIL: FieldModel = FieldModel::new("email", FieldKind::Email);
    pub const CONTACT_EMAIL: FieldModel = FieldModel::new("contactEmail", FieldKind::Email);
    pub const PHONE: FieldModel = FieldModel::new("phone", FieldKind::Text { min: 10, max: 15 });
    pub const ADDRESS: FieldModel = FieldModel::new("address", FieldKind::Text { min: 10, max: 250 });
    pub const CAPACITY: FieldModel = FieldModel::new("capacity", FieldKind::Number);
    pub const RESOURCES: FieldModel = FieldModel::new("resources", FieldKind::TextList);
    pub const ENROLLMENT_DATE: FieldModel = FieldModel::new("enrollmentDate", FieldKind::Date);
    pub const ROLE: FieldModel = FieldModel::new("role", FieldKind::OneOf(Role::ALL));
    pub const SCHOOL_ID: FieldModel = FieldModel::new("schoolId", FieldKind::Id);
    pub const CLASSROOM_ID: FieldModel = FieldModel::new("classroomId", FieldKind::Id);
    pub const STUDENT_ID: FieldModel = FieldModel::new("studentId", FieldKind::Id);
    pub const FILTERS: FieldModel = FieldModel::new("filters", FieldKind::Object);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRule {
    pub model: FieldModel,
    pub required: bool,
}

pub const fn required(model: FieldModel) -> FieldRule {
    FieldRule { model, required: true }
}

pub const fn optional(model: FieldModel) -> FieldRule {
    FieldRule { model, required: false }
}

/// Ordered rules for one action. Unknown fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: Vec<FieldRule>,
}

impl Validator {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    /// One message per failed rule, in rule order
    pub fn validate(&self, body: &Value) -> Vec<String> {
        self.rules
            .iter()
            .filter_map(|rule| match body.get(rule.model.path) {
                None | Some(Value::Null) if rule.required => Some(format!("{} is required", rule.model.path)),
                None | Some(Value::Null) => None,
                Some(value) => rule.model.check(value),
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct ValidatorRegistry {
    modules: HashMap<String, HashMap<String, Validator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: &str, action: &str, rules: Vec<FieldRule>) -> &mut Self {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(action.to_string(), Validator::new(rules));
        self
    }

    pub fn get(&self, module: &str, action: &str) -> Option<&Validator> {
        self.modules.get(module)?.get(action)
    }

    /// Rules for every body-carrying action the service exposes
    pub fn standard() -> Self {
        use models::*;

        let mut registry = Self::new();
        registry
            .register("auth", "login", vec![required(EMAIL), required(LOGIN_PASSWORD)])
            .register(
                "school",
                "create",
                vec![required(NAME), required(ADDRESS), required(CONTACT_EMAIL), required(PHONE)],
            )
            .register(
                "school",
                "update",
                vec![optional(NAME), optional(ADDRESS), optional(CONTACT_EMAIL), optional(PHONE)],
            )
            .register(
                "user",
                "create",
                vec![
                    required(FIRST_NAME),
                    required(LAST_NAME),
                    required(EMAIL),
                    required(PASSWORD),
                    required(ROLE),
                    optional(SCHOOL_ID),
                ],
            )
            .register(
                "classroom",
                "create",
                vec![required(NAME), required(CAPACITY), required(RESOURCES)],
            )
            .register(
                "classroom",
                "update",
                vec![optional(NAME), optional(CAPACITY), optional(RESOURCES)],
            )
            .register(
                "student",
                "create",
                vec![
                    required(CLASSROOM_ID),
                    required(FIRST_NAME),
                    required(LAST_NAME),
                    required(EMAIL),
                    optional(ENROLLMENT_DATE),
                ],
            )
            .register(
                "student",
                "update",
                vec![
                    optional(FIRST_NAME),
                    optional(LAST_NAME),
                    optional(EMAIL),
                    optional(ENROLLMENT_DATE),
                ],
            )
            .register("student", "transfer", vec![required(CLASSROOM_ID), required(STUDENT_ID)]);
        registry
    }
}

/// RFC 3339 timestamps or plain `YYYY-MM-DD` dates
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.chars().any(|c| c.is_whitespace() || "<>()[]\\,;:@\"".contains(c)) {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let tld = labels.last().copied().unwrap_or_default();
    labels.len() >= 2
        && labels
            .iter()
            .all(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}
