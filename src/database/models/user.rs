use serde::Serialize;
use uuid::Uuid;

use super::Audit;
use crate::database::Document;
use crate::types::Role;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Salted digest, never serialized
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub school_id: Option<Uuid>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Document for User {
    fn id(&self) -> Uuid {
        self.id
    }
}
