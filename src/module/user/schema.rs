use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    #[default]
    Cpf,
    Cnpj,
}

impl DocumentType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cpf => "CPF",
            Self::Cnpj => "CNPJ",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(alias = "documentNumber", alias = "cpf")]
    pub document_number: String,
    #[serde(default, alias = "documentType")]
    pub document_type: DocumentType,
    pub phone: String,
    #[serde(alias = "cityId")]
    pub city_id: Option<i64>,
    #[serde(alias = "stateId")]
    pub state_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "cityId")]
    pub city_id: Option<i64>,
    #[serde(alias = "stateId")]
    pub state_id: Option<i64>,
}

/// Private contact fields are only present when the caller views itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub city_id: Option<i64>,
    pub city_name: Option<String>,
    pub state_id: Option<i64>,
    pub state_name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserView>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub email: Option<String>,
    pub document_number: Option<String>,
    pub phone: Option<String>,
}

/// `None` means the field was not asked about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub email_available: Option<bool>,
    pub document_available: Option<bool>,
    pub phone_available: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    pub deleted: bool,
    pub user_id: i64,
    pub pets_removed: usize,
    pub terms_removed: usize,
}
