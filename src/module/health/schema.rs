use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthMetricsView {
    pub users_registered: u64,
    pub terms_created: u64,
    pub terms_resynced: u64,
    pub integrity_failures: u64,
    pub mails_sent: u64,
    pub mails_failed: u64,
    pub last_error_ts: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub env: String,
    pub mongo_available: bool,
    pub redis_available: bool,
    pub mail_transport: String,
    pub metrics: HealthMetricsView,
}
