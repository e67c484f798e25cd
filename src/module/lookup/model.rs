use super::schema::{LookupKind, LookupView};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupRecord {
    pub id: i64,
    pub kind: LookupKind,
    pub name: String,
    pub code: Option<String>,
    pub parent_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl LookupRecord {
    pub fn to_view(&self) -> LookupView {
        LookupView {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            code: self.code.clone(),
            parent_id: self.parent_id,
        }
    }
}
