use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    Species,
    Breed,
    State,
    City,
    AgeBracket,
    Status,
    Sex,
    Disease,
}

impl LookupKind {
    pub const ALL: [LookupKind; 8] = [
        Self::Species,
        Self::Breed,
        Self::State,
        Self::City,
        Self::AgeBracket,
        Self::Status,
        Self::Sex,
        Self::Disease,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Species => "species",
            Self::Breed => "breed",
            Self::State => "state",
            Self::City => "city",
            Self::AgeBracket => "age_bracket",
            Self::Status => "status",
            Self::Sex => "sex",
            Self::Disease => "disease",
        }
    }

    /// Plural path segment used under `/v1/lookups`.
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "species" => Some(Self::Species),
            "breeds" => Some(Self::Breed),
            "states" => Some(Self::State),
            "cities" => Some(Self::City),
            "age-brackets" => Some(Self::AgeBracket),
            "statuses" => Some(Self::Status),
            "sexes" => Some(Self::Sex),
            "diseases" => Some(Self::Disease),
            _ => None,
        }
    }

    pub fn parent_kind(&self) -> Option<LookupKind> {
        match self {
            Self::Breed => Some(Self::Species),
            Self::City => Some(Self::State),
            _ => None,
        }
    }

    pub fn not_found_code(&self) -> &'static str {
        match self {
            Self::Species => "SPECIES_NOT_FOUND",
            Self::Breed => "BREED_NOT_FOUND",
            Self::State => "STATE_NOT_FOUND",
            Self::City => "CITY_NOT_FOUND",
            Self::AgeBracket => "AGE_BRACKET_NOT_FOUND",
            Self::Status => "STATUS_NOT_FOUND",
            Self::Sex => "SEX_NOT_FOUND",
            Self::Disease => "DISEASE_NOT_FOUND",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertLookupRequest {
    pub name: String,
    pub code: Option<String>,
    #[serde(alias = "parentId")]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupListQuery {
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupView {
    pub id: i64,
    pub kind: LookupKind,
    pub name: String,
    pub code: Option<String>,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupListResponse {
    pub kind: LookupKind,
    pub items: Vec<LookupView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteLookupResponse {
    pub deleted: bool,
    pub kind: LookupKind,
    pub id: i64,
}
