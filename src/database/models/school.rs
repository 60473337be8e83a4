use serde::Serialize;
use uuid::Uuid;

use super::Audit;
use crate::database::Document;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct School {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Document for School {
    fn id(&self) -> Uuid {
        self.id
    }
}
