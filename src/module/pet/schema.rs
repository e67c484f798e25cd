use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePetRequest {
    pub name: String,
    #[serde(alias = "speciesId")]
    pub species_id: i64,
    #[serde(alias = "breedId")]
    pub breed_id: i64,
    pub age: u32,
    #[serde(alias = "ageBracketId")]
    pub age_bracket_id: i64,
    #[serde(alias = "sexId")]
    pub sex_id: i64,
    #[serde(alias = "statusId")]
    pub status_id: i64,
    #[serde(alias = "cityId")]
    pub city_id: i64,
    #[serde(alias = "stateId")]
    pub state_id: i64,
    pub description: Option<String>,
    #[serde(alias = "donationReason")]
    pub donation_reason: Option<String>,
    #[serde(default, alias = "diseaseIds")]
    pub disease_ids: Vec<i64>,
}

/// Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePetRequest {
    pub name: Option<String>,
    #[serde(alias = "speciesId")]
    pub species_id: Option<i64>,
    #[serde(alias = "breedId")]
    pub breed_id: Option<i64>,
    pub age: Option<u32>,
    #[serde(alias = "ageBracketId")]
    pub age_bracket_id: Option<i64>,
    #[serde(alias = "sexId")]
    pub sex_id: Option<i64>,
    #[serde(alias = "statusId")]
    pub status_id: Option<i64>,
    #[serde(alias = "cityId")]
    pub city_id: Option<i64>,
    #[serde(alias = "stateId")]
    pub state_id: Option<i64>,
    pub description: Option<String>,
    #[serde(alias = "donationReason")]
    pub donation_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PetListQuery {
    pub owner_id: Option<i64>,
    pub status_id: Option<i64>,
    pub breed_id: Option<i64>,
    pub species_id: Option<i64>,
    pub state_id: Option<i64>,
    pub city_id: Option<i64>,
    pub age_bracket_id: Option<i64>,
    pub sex_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseView {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetView {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub species_id: i64,
    pub species: Option<String>,
    pub breed_id: i64,
    pub breed: Option<String>,
    pub age: u32,
    pub age_bracket_id: i64,
    pub age_bracket: Option<String>,
    pub sex_id: i64,
    pub sex: Option<String>,
    pub status_id: i64,
    pub status: Option<String>,
    pub city_id: i64,
    pub city: Option<String>,
    pub state_id: i64,
    pub state: Option<String>,
    pub description: Option<String>,
    pub donation_reason: Option<String>,
    pub diseases: Vec<DiseaseView>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetListResponse {
    pub pets: Vec<PetView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddDiseaseRequest {
    #[serde(alias = "diseaseId")]
    pub disease_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetDiseasesResponse {
    pub pet_id: i64,
    pub diseases: Vec<DiseaseView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePetResponse {
    pub deleted: bool,
    pub pet_id: i64,
    pub terms_removed: usize,
}
