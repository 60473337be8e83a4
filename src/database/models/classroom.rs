use serde::Serialize;
use uuid::Uuid;

use super::Audit;
use crate::database::Document;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub school_id: Uuid,
    pub name: String,
    pub capacity: u32,
    pub resources: Vec<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Document for Classroom {
    fn id(&self) -> Uuid {
        self.id
    }
}
