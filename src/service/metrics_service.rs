use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

static USERS_REGISTERED: AtomicU64 = AtomicU64::new(0);
static TERMS_CREATED: AtomicU64 = AtomicU64::new(0);
static TERMS_RESYNCED: AtomicU64 = AtomicU64::new(0);
static INTEGRITY_FAILURES: AtomicU64 = AtomicU64::new(0);

static MAILS_SENT: AtomicU64 = AtomicU64::new(0);
static MAILS_FAILED: AtomicU64 = AtomicU64::new(0);

static LAST_ERROR_TS: AtomicI64 = AtomicI64::new(0);

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub users_registered: u64,
    pub terms_created: u64,
    pub terms_resynced: u64,
    pub integrity_failures: u64,
    pub mails_sent: u64,
    pub mails_failed: u64,
    pub last_error_ts: i64,
}

pub fn inc_users_registered() {
    USERS_REGISTERED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_terms_created() {
    TERMS_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_terms_resynced() {
    TERMS_RESYNCED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_integrity_failures() {
    INTEGRITY_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_mails_sent() {
    MAILS_SENT.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_mails_failed() {
    MAILS_FAILED.fetch_add(1, Ordering::Relaxed);
}

pub fn set_last_error_ts(ts: i64) {
    LAST_ERROR_TS.store(ts, Ordering::Relaxed);
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        users_registered: USERS_REGISTERED.load(Ordering::Relaxed),
        terms_created: TERMS_CREATED.load(Ordering::Relaxed),
        terms_resynced: TERMS_RESYNCED.load(Ordering::Relaxed),
        integrity_failures: INTEGRITY_FAILURES.load(Ordering::Relaxed),
        mails_sent: MAILS_SENT.load(Ordering::Relaxed),
        mails_failed: MAILS_FAILED.load(Ordering::Relaxed),
        last_error_ts: LAST_ERROR_TS.load(Ordering::Relaxed),
    }
}
