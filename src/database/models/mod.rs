pub mod classroom;
pub mod school;
pub mod student;
pub mod user;

pub use classroom::Classroom;
pub use school::School;
pub use student::Student;
pub use user::User;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Audit columns shared by every collection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Audit {
    pub fn new(by: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            created_by: by,
            updated_by: by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, by: Uuid) {
        self.updated_by = Some(by);
        self.updated_at = Utc::now();
    }
}
