use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;

/// Context keys produced by the standard middleware units.
///
/// Every key is the name of the unit that contributes it. `PARAMS` and
/// `QUERY` are also seeded by the dispatcher before the chain runs.
pub mod keys {
    pub const DEVICE: &str = "__device";
    pub const AUTH: &str = "__auth";
    pub const IS_SUPER_ADMIN: &str = "__isSuperAdmin";
    pub const IS_SCHOOL_ADMIN: &str = "__isSchoolAdmin";
    pub const PARAMS: &str = "__params";
    pub const QUERY: &str = "__query";
    pub const BODY: &str = "__body";
}

/// The authenticated principal contributed by `__auth`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    pub user: AuthUser,
}

/// Client fingerprint contributed by `__device`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Device {
    pub ip: Option<String>,
    pub agent: Option<String>,
}

/// Path segments of `/api/:module/:action[/:id]`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteParams {
    pub module_name: String,
    pub fn_name: String,
    pub id: Option<String>,
}

impl RouteParams {
    pub fn new(module_name: impl Into<String>, fn_name: impl Into<String>, id: Option<String>) -> Self {
        Self {
            module_name: module_name.into(),
            fn_name: fn_name.into(),
            id,
        }
    }

    /// The `id` segment parsed as a record id
    pub fn record_id(&self) -> Result<Uuid, ApiError> {
        let id = self
            .id
            .as_deref()
            .ok_or_else(|| ApiError::bad_request("Missing 'id' parameter"))?;
        Uuid::parse_str(id).map_err(|_| ApiError::bad_request("Invalid 'id' parameter format"))
    }
}

/// Decoded query-string pairs; the last occurrence of a key wins
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self(pairs.into_iter().collect())
    }

    /// Parse a raw `a=1&b=2` query string
    pub fn parse(raw: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(raw.as_bytes()).into_owned())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A value a middleware unit hands forward when it continues the chain
#[derive(Debug, Clone, PartialEq)]
pub enum Contribution {
    Principal(Principal),
    Flag(bool),
    Device(Device),
    Params(RouteParams),
    Query(QueryParams),
    Body(Value),
}

/// Per-request accumulator: unit name → contribution.
///
/// Built fresh for every request, merged additively while the chain advances,
/// then moved into the action as its sole argument.
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    entries: BTreeMap<String, Contribution>,
}

impl ExecContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Contribution) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Contribution> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn principal(&self) -> Result<&Principal, ApiError> {
        match self.get(keys::AUTH) {
            Some(Contribution::Principal(principal)) => Ok(principal),
            _ => Err(ApiError::unauthorized("Authentication required")),
        }
    }

    pub fn user(&self) -> Result<&AuthUser, ApiError> {
        self.principal().map(|p| &p.user)
    }

    pub fn params(&self) -> Result<&RouteParams, ApiError> {
        match self.get(keys::PARAMS) {
            Some(Contribution::Params(params)) => Ok(params),
            _ => Err(ApiError::internal_server_error("Route parameters are unavailable")),
        }
    }

    /// Query pairs; empty when none were seeded
    pub fn query(&self) -> QueryParams {
        match self.get(keys::QUERY) {
            Some(Contribution::Query(query)) => query.clone(),
            _ => QueryParams::default(),
        }
    }

    pub fn body(&self) -> Result<&Value, ApiError> {
        match self.get(keys::BODY) {
            Some(Contribution::Body(body)) => Ok(body),
            _ => Err(ApiError::internal_server_error("Request body was not validated")),
        }
    }

    /// Deserialize the validated body into an action-specific input type
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body = self.body()?;
        serde_json::from_value(body.clone()).map_err(ApiError::from)
    }

    pub fn device(&self) -> Option<&Device> {
        match self.get(keys::DEVICE) {
            Some(Contribution::Device(device)) => Some(device),
            _ => None,
        }
    }

    /// A boolean role-check key; absent keys read as `false`
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Contribution::Flag(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_getters_check_presence() {
        let mut ctx = ExecContext::new();
        assert!(ctx.principal().is_err());
        assert!(ctx.body().is_err());
        assert!(!ctx.flag(keys::IS_SUPER_ADMIN));
        assert!(ctx.query().is_empty());

        ctx.insert(keys::IS_SUPER_ADMIN, Contribution::Flag(true));
        ctx.insert(keys::BODY, Contribution::Body(json!({ "name": "Oakwood" })));
        assert!(ctx.flag(keys::IS_SUPER_ADMIN));
        assert_eq!(ctx.body().unwrap()["name"], "Oakwood");
        assert_eq!(ctx.keys().collect::<Vec<_>>(), vec!["__body", "__isSuperAdmin"]);
    }

    #[test]
    fn mismatched_contribution_is_not_returned() {
        let mut ctx = ExecContext::new();
        ctx.insert(keys::AUTH, Contribution::Flag(true));
        assert!(ctx.principal().is_err());
    }

    #[test]
    fn record_id_validates_segment() {
        let missing = RouteParams::new("school", "get", None);
        assert_eq!(missing.record_id().unwrap_err().status_code(), 400);

        let bad = RouteParams::new("school", "get", Some("42".to_string()));
        assert_eq!(bad.record_id().unwrap_err().message(), "Invalid 'id' parameter format");

        let id = Uuid::new_v4();
        let good = RouteParams::new("school", "get", Some(id.to_string()));
        assert_eq!(good.record_id().unwrap(), id);
    }

    #[test]
    fn query_string_is_decoded() {
        let query = QueryParams::parse("page=2&filters%5Bname%5D=oak%20wood");
        assert_eq!(query.get("page"), Some("2"));
        assert_eq!(query.get("filters[name]"), Some("oak wood"));
    }
}
