pub mod canonical_json_service;
pub mod document_service;
pub mod hash_service;
pub mod integrity_service;
pub mod mail_service;
pub mod metrics_service;
pub mod password_service;
pub mod token_service;
pub mod validation_service;
