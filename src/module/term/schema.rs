use super::model::{PartySnapshot, PetSnapshot};
use crate::infra::{ADOPTION_TERMS_COLLECTION, COMPROMISE_TERMS_COLLECTION, DONATION_TERMS_COLLECTION};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    Adoption,
    Donation,
    Compromise,
}

impl TermKind {
    pub const ALL: [TermKind; 3] = [Self::Adoption, Self::Donation, Self::Compromise];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adoption => "adoption",
            Self::Donation => "donation",
            Self::Compromise => "compromise",
        }
    }

    pub fn parse(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == segment)
    }

    pub fn collection(&self) -> &'static str {
        match self {
            Self::Adoption => ADOPTION_TERMS_COLLECTION,
            Self::Donation => DONATION_TERMS_COLLECTION,
            Self::Compromise => COMPROMISE_TERMS_COLLECTION,
        }
    }

    /// Adoption and compromise terms bind a pet to an adopter.
    pub fn has_adopter(&self) -> bool {
        !matches!(self, Self::Donation)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Adoption => "TERMO DE ADOCAO RESPONSAVEL",
            Self::Donation => "TERMO DE DOACAO",
            Self::Compromise => "TERMO DE COMPROMISSO",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTermRequest {
    #[serde(default, alias = "petId")]
    pub pet_id: Option<i64>,
    #[serde(default, alias = "donorId")]
    pub donor_id: Option<i64>,
    #[serde(default, alias = "adopterId")]
    pub adopter_id: Option<i64>,
    #[serde(alias = "signatureText")]
    pub signature_text: String,
    #[serde(default)]
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResyncTermRequest {
    #[serde(alias = "adopterId")]
    pub adopter_id: i64,
    #[serde(alias = "signatureText")]
    pub signature_text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermListQuery {
    pub pet_id: Option<i64>,
    pub donor_id: Option<i64>,
    pub adopter_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermView {
    pub id: i64,
    pub kind: TermKind,
    pub pet_id: Option<i64>,
    pub donor_id: i64,
    pub adopter_id: Option<i64>,
    pub pet: Option<PetSnapshot>,
    pub donor: PartySnapshot,
    pub adopter: Option<PartySnapshot>,
    pub digital_signature: String,
    pub signed_at: i64,
    pub observations: Option<String>,
    pub integrity_hash: String,
    pub snapshot_digest: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Outcome of mailing the parties after a write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationView {
    pub sent: bool,
    pub recipients: Vec<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermWriteResponse {
    pub term: TermView,
    pub notification: NotificationView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermListResponse {
    pub kind: TermKind,
    pub terms: Vec<TermView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateTermResponse {
    pub term_id: i64,
    pub kind: TermKind,
    pub valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermDocumentResponse {
    pub term_id: i64,
    pub kind: TermKind,
    pub file_name: String,
    pub content_type: String,
    pub page_count: usize,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendTermResponse {
    pub term_id: i64,
    pub kind: TermKind,
    pub recipients: Vec<String>,
}
