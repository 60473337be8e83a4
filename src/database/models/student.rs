use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::Audit;
use crate::database::Document;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub school_id: Uuid,
    pub classroom_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub enrollment_date: DateTime<Utc>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Document for Student {
    fn id(&self) -> Uuid {
        self.id
    }
}
