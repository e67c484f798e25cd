use super::environment::AppConfig;

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub url: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

impl MongoConfig {
    pub fn from_app(app: &AppConfig) -> Option<Self> {
        let url = app.mongodb_url.clone()?;
        Some(Self {
            url,
            database: app
                .mongodb_database
                .clone()
                .unwrap_or_else(|| "pet_adoption".to_string()),
        })
    }
}

impl RedisConfig {
    pub fn from_app(app: &AppConfig) -> Option<Self> {
        app.redis_url.clone().map(|url| Self { url })
    }
}
