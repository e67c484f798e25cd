use std::env;

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from_address: String,
    pub relay_url: Option<String>,
    pub relay_api_key: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rust_env: String,
    pub api_host: String,
    pub api_port: u16,
    pub mongodb_url: Option<String>,
    pub mongodb_database: Option<String>,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_ttl_seconds: i64,
    pub recovery_code_ttl_seconds: i64,
    pub seed_reference_data: bool,
    pub cors_allowed_origins: Vec<String>,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        load_dotenv_layers();
        let jwt_ttl_seconds = read_optional_i64("JWT_TTL_SECONDS", 3600)?;
        if jwt_ttl_seconds <= 0 {
            return Err("JWT_TTL_SECONDS must be positive".to_string());
        }
        let recovery_code_ttl_seconds = read_optional_i64("RECOVERY_CODE_TTL_SECONDS", 900)?;
        if recovery_code_ttl_seconds <= 0 {
            return Err("RECOVERY_CODE_TTL_SECONDS must be positive".to_string());
        }
        Ok(Self {
            rust_env: read_var("RUST_ENV")?,
            api_host: read_var("API_HOST")?,
            api_port: read_var("API_PORT")?
                .parse::<u16>()
                .map_err(|e| format!("invalid API_PORT: {e}"))?,
            mongodb_url: read_non_empty("MONGODB_URL"),
            mongodb_database: read_non_empty("MONGODB_DATABASE"),
            redis_url: read_non_empty("REDIS_URL"),
            jwt_secret: read_var("JWT_SECRET")?,
            jwt_ttl_seconds,
            recovery_code_ttl_seconds,
            seed_reference_data: read_optional_bool("SEED_REFERENCE_DATA", true),
            cors_allowed_origins: read_optional_string(
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:3000",
            )
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
            mail: MailConfig {
                from_address: read_optional_string("MAIL_FROM", "nao-responda@adocao.local"),
                relay_url: read_non_empty("MAIL_RELAY_URL"),
                relay_api_key: read_non_empty("MAIL_RELAY_API_KEY"),
                timeout_seconds: read_optional_u64("MAIL_TIMEOUT_SECONDS", 10)?,
            },
        })
    }
}

fn read_var(key: &str) -> Result<String, String> {
    env::var(key).map_err(|_| format!("missing required env var: {key}"))
}

fn read_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_optional_i64(key: &str, default: i64) -> Result<i64, String> {
    match env::var(key) {
        Ok(v) => v.parse::<i64>().map_err(|e| format!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}

fn read_optional_u64(key: &str, default: u64) -> Result<u64, String> {
    match env::var(key) {
        Ok(v) => v.parse::<u64>().map_err(|e| format!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}

fn read_optional_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"),
        Err(_) => default,
    }
}

fn read_optional_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn load_dotenv_layers() {
    for path in [".env", "../.env"] {
        let _ = dotenvy::from_path_override(path);
    }
}
