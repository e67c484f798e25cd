use crate::module::term::model::{PartySnapshot, PetSnapshot, TermRecord};
use crate::service::canonical_json_service::canonical_string;
use crate::service::hash_service::{fast_digest_hex, sha256_hex};
use serde::Serialize;

/// `digest(pet_name + donor_name + adopter_name + signature + signed_at)`.
/// Absent parties contribute an empty string.
pub fn compute_integrity_hash(
    pet_name: &str,
    donor_name: &str,
    adopter_name: &str,
    signature: &str,
    signed_at: i64,
) -> String {
    fast_digest_hex(&format!(
        "{pet_name}{donor_name}{adopter_name}{signature}{signed_at}"
    ))
}

pub fn compute_snapshot_digest(term: &TermRecord) -> Result<String, String> {
    let input = CanonicalSnapshotInput {
        kind: term.kind.as_str(),
        pet_id: term.pet_id,
        donor_id: term.donor_id,
        adopter_id: term.adopter_id,
        pet: term.pet.as_ref(),
        donor: &term.donor,
        adopter: term.adopter.as_ref(),
        digital_signature: &term.digital_signature,
        signed_at: term.signed_at,
        observations: term.observations.as_deref(),
    };
    Ok(sha256_hex(&canonical_string(&input)?))
}

/// Recomputes both hash fields from the current snapshot.
pub fn compute_hash(term: &mut TermRecord) -> Result<(), String> {
    term.integrity_hash = formula_hash(term);
    term.snapshot_digest = compute_snapshot_digest(term)?;
    Ok(())
}

pub fn verify_integrity(term: &TermRecord) -> Result<bool, String> {
    Ok(term.integrity_hash == formula_hash(term)
        && term.snapshot_digest == compute_snapshot_digest(term)?)
}

fn formula_hash(term: &TermRecord) -> String {
    compute_integrity_hash(
        term.pet.as_ref().map_or("", |p| p.name.as_str()),
        &term.donor.name,
        term.adopter.as_ref().map_or("", |a| a.name.as_str()),
        &term.digital_signature,
        term.signed_at,
    )
}

#[derive(Serialize)]
struct CanonicalSnapshotInput<'a> {
    kind: &'a str,
    pet_id: Option<i64>,
    donor_id: i64,
    adopter_id: Option<i64>,
    pet: Option<&'a PetSnapshot>,
    donor: &'a PartySnapshot,
    adopter: Option<&'a PartySnapshot>,
    digital_signature: &'a str,
    signed_at: i64,
    observations: Option<&'a str>,
}
