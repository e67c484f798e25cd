use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetRecord {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub species_id: i64,
    pub breed_id: i64,
    pub age: u32,
    pub age_bracket_id: i64,
    pub sex_id: i64,
    pub status_id: i64,
    pub city_id: i64,
    pub state_id: i64,
    pub description: Option<String>,
    pub donation_reason: Option<String>,
    #[serde(default)]
    pub disease_ids: Vec<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}
