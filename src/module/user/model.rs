use super::schema::DocumentType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub document_number: String,
    pub document_type: DocumentType,
    pub phone: String,
    pub password_hash: String,
    pub city_id: Option<i64>,
    pub state_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}
