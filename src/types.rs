/// Shared types used across the codebase

use std::fmt;

use axum::http::Method;
use serde::{Deserialize, Serialize};

/// HTTP verbs an exposure list may declare.
/// Parsed from the lower-cased method name (`get`, `post`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "get" => Some(Verb::Get),
            "post" => Some(Verb::Post),
            "put" => Some(Verb::Put),
            "patch" => Some(Verb::Patch),
            "delete" => Some(Verb::Delete),
            _ => None,
        }
    }

    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Verb::Get),
            Method::POST => Some(Verb::Post),
            Method::PUT => Some(Verb::Put),
            Method::PATCH => Some(Verb::Patch),
            Method::DELETE => Some(Verb::Delete),
            _ => None,
        }
    }

    /// Verbs whose requests carry a body get the body-validation step appended
    pub fn has_body(&self) -> bool {
        matches!(self, Verb::Post | Verb::Put | Verb::Patch)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Post => "post",
            Verb::Put => "put",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account roles. Stored and transmitted in snake_case (`super_admin`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    SchoolAdmin,
}

impl Role {
    pub const ALL: &'static [&'static str] = &["super_admin", "school_admin"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::SchoolAdmin => "school_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_parse_is_case_insensitive() {
        assert_eq!(Verb::parse("GET"), Some(Verb::Get));
        assert_eq!(Verb::parse(" delete "), Some(Verb::Delete));
        assert_eq!(Verb::parse("options"), None);
    }

    #[test]
    fn only_body_verbs_have_body() {
        assert!(Verb::Post.has_body());
        assert!(Verb::Put.has_body());
        assert!(Verb::Patch.has_body());
        assert!(!Verb::Get.has_body());
        assert!(!Verb::Delete.has_body());
    }

    #[test]
    fn verb_from_method() {
        assert_eq!(Verb::from_method(&Method::PATCH), Some(Verb::Patch));
        assert_eq!(Verb::from_method(&Method::HEAD), None);
    }
}
