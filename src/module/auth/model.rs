use serde::{Deserialize, Serialize};

/// A pending password recovery code. Only the digest of the code is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryCodeRecord {
    pub user_id: i64,
    pub code_hash: String,
    pub expires_at: i64,
    pub attempts: u32,
}

impl RecoveryCodeRecord {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}
