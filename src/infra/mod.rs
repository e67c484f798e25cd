use crate::config::db::{MongoConfig, RedisConfig};
use crate::config::environment::AppConfig;
use crate::module::error::AppError;
use mongodb::bson::{Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client as MongoClient, Collection, Database, IndexModel};
use redis::Client as RedisClient;
use redis::cmd;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub const USERS_COLLECTION: &str = "users";
pub const PETS_COLLECTION: &str = "pets";
pub const LOOKUPS_COLLECTION: &str = "lookups";
pub const ADOPTION_TERMS_COLLECTION: &str = "adoption_terms";
pub const DONATION_TERMS_COLLECTION: &str = "donation_terms";
pub const COMPROMISE_TERMS_COLLECTION: &str = "compromise_terms";

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Clone)]
pub struct InfraClients {
    pub mongo_db: Database,
    pub redis: Option<RedisClient>,
}

pub async fn init_infra(config: &AppConfig) -> Result<Option<InfraClients>, String> {
    let Some(mongo) = MongoConfig::from_app(config) else {
        return Ok(None);
    };

    let mongo_client = MongoClient::with_uri_str(&mongo.url)
        .await
        .map_err(|e| format!("mongodb client init failed: {e}"))?;
    let mongo_db = mongo_client.database(&mongo.database);
    ensure_indexes(&mongo_db).await?;

    let redis = match RedisConfig::from_app(config) {
        Some(redis) => Some(connect_redis(&redis).await?),
        None => None,
    };

    Ok(Some(InfraClients { mongo_db, redis }))
}

async fn connect_redis(redis: &RedisConfig) -> Result<RedisClient, String> {
    let client =
        RedisClient::open(redis.url.clone()).map_err(|e| format!("redis client init failed: {e}"))?;
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| format!("redis connection failed: {e}"))?;
    let pong: String = cmd("PING")
        .query_async(&mut conn)
        .await
        .map_err(|e| format!("redis ping failed: {e}"))?;
    if pong != "PONG" {
        return Err("redis ping returned unexpected response".to_string());
    }
    Ok(client)
}

async fn ensure_indexes(db: &Database) -> Result<(), String> {
    let unique = IndexOptions::builder().unique(true).build();
    let unique_on = |field: &str| {
        IndexModel::builder()
            .keys(doc! { field: 1 })
            .options(unique.clone())
            .build()
    };

    let plan: [(&str, Vec<IndexModel>); 6] = [
        (
            USERS_COLLECTION,
            vec![
                unique_on("id"),
                unique_on("email"),
                unique_on("document_number"),
                unique_on("phone"),
            ],
        ),
        (
            PETS_COLLECTION,
            vec![
                unique_on("id"),
                IndexModel::builder().keys(doc! { "owner_id": 1 }).build(),
            ],
        ),
        (
            LOOKUPS_COLLECTION,
            vec![IndexModel::builder()
                .keys(doc! { "kind": 1, "id": 1 })
                .options(unique.clone())
                .build()],
        ),
        (
            ADOPTION_TERMS_COLLECTION,
            vec![unique_on("id"), unique_on("pet_id")],
        ),
        (
            COMPROMISE_TERMS_COLLECTION,
            vec![unique_on("id"), unique_on("pet_id")],
        ),
        (
            DONATION_TERMS_COLLECTION,
            vec![unique_on("id"), unique_on("donor_id")],
        ),
    ];

    for (name, indexes) in plan {
        db.collection::<Document>(name)
            .create_indexes(indexes)
            .await
            .map_err(|e| format!("mongodb index creation failed for {name}: {e}"))?;
    }
    Ok(())
}

pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY_CODE
    )
}

/// Write-through upsert keyed by the record's numeric id.
pub async fn upsert_record<T>(
    infra: &InfraClients,
    collection: &str,
    filter: Document,
    record: &T,
) -> Result<(), AppError>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    let coll: Collection<T> = infra.mongo_db.collection(collection);
    coll.replace_one(filter, record)
        .upsert(true)
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::conflict("UNIQUE_CONSTRAINT", format!("{collection}: duplicate key"))
            } else {
                AppError::internal(
                    "PERSISTENCE_ERROR",
                    format!("{collection} upsert failed: {e}"),
                )
            }
        })?;
    Ok(())
}

pub async fn delete_records(
    infra: &InfraClients,
    collection: &str,
    filter: Document,
) -> Result<(), AppError> {
    infra
        .mongo_db
        .collection::<Document>(collection)
        .delete_many(filter)
        .await
        .map_err(|e| {
            AppError::internal("PERSISTENCE_ERROR", format!("{collection} delete failed: {e}"))
        })?;
    Ok(())
}

pub async fn load_all<T>(infra: &InfraClients, collection: &str) -> Result<Vec<T>, String>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    let coll: Collection<T> = infra.mongo_db.collection(collection);
    let mut cursor = coll
        .find(doc! {})
        .sort(doc! { "id": 1 })
        .await
        .map_err(|e| format!("{collection} load failed: {e}"))?;
    let mut out = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| format!("{collection} cursor failed: {e}"))?
    {
        out.push(
            cursor
                .deserialize_current()
                .map_err(|e| format!("{collection} decode failed: {e}"))?,
        );
    }
    Ok(out)
}

pub async fn ping_mongo(infra: &InfraClients) -> bool {
    infra
        .mongo_db
        .run_command(doc! { "ping": 1 })
        .await
        .is_ok()
}

pub async fn ping_redis(infra: &InfraClients) -> bool {
    let Some(redis) = &infra.redis else {
        return false;
    };
    let Ok(mut conn) = redis.get_multiplexed_async_connection().await else {
        return false;
    };
    let pong: Result<String, _> = cmd("PING").query_async(&mut conn).await;
    pong.is_ok_and(|p| p == "PONG")
}
