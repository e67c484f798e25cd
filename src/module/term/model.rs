use super::schema::TermKind;
use crate::module::user::schema::DocumentType;
use serde::{Deserialize, Serialize};

/// Pet attributes as they were when the term was signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetSnapshot {
    pub name: String,
    pub species: Option<String>,
    pub breed: Option<String>,
    pub age: u32,
    pub sex: Option<String>,
    pub donation_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySnapshot {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub document_number: String,
    pub document_type: DocumentType,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermRecord {
    pub id: i64,
    pub kind: TermKind,
    pub pet_id: Option<i64>,
    pub donor_id: i64,
    pub adopter_id: Option<i64>,
    pub pet: Option<PetSnapshot>,
    pub donor: PartySnapshot,
    pub adopter: Option<PartySnapshot>,
    pub digital_signature: String,
    /// Unix milliseconds.
    pub signed_at: i64,
    pub observations: Option<String>,
    pub integrity_hash: String,
    pub snapshot_digest: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TermRecord {
    pub fn involves(&self, user_id: i64) -> bool {
        self.donor_id == user_id || self.adopter_id == Some(user_id)
    }
}
