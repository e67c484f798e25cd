#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use http::{Request, StatusCode};
use pet_adoption_api::app::{AppState, bootstrap, build_router};
use pet_adoption_api::config::environment::{AppConfig, MailConfig};
use pet_adoption_api::service::mail_service::{Mailer, OutgoingMail};
use serde_json::{Value, json};
use tower::util::ServiceExt;

pub const PASSWORD: &str = "senha-segura-123";

pub fn test_config() -> AppConfig {
    AppConfig {
        rust_env: "test".to_string(),
        api_host: "127.0.0.1".to_string(),
        api_port: 0,
        mongodb_url: None,
        mongodb_database: None,
        redis_url: None,
        jwt_secret: "test-jwt-secret".to_string(),
        jwt_ttl_seconds: 3600,
        recovery_code_ttl_seconds: 900,
        seed_reference_data: true,
        cors_allowed_origins: vec!["http://localhost:3000".to_string()],
        mail: MailConfig {
            from_address: "nao-responda@adocao.local".to_string(),
            relay_url: None,
            relay_api_key: None,
            timeout_seconds: 2,
        },
    }
}

#[derive(Clone)]
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_state(AppState::new(test_config(), None)).await
    }

    /// Mail goes to a relay nobody listens on, so every delivery fails.
    pub async fn with_unreachable_relay() -> Self {
        let config = test_config();
        let mailer = Mailer::relay(
            &config.mail.from_address,
            "http://127.0.0.1:9/relay",
            None,
            2,
        )
        .expect("relay mailer");
        Self::with_state(AppState::with_mailer(config, None, mailer)).await
    }

    async fn with_state(state: AppState) -> Self {
        bootstrap(&state).await.expect("bootstrap");
        let router = build_router(state.clone());
        Self { state, router }
    }

    pub async fn call(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("serialize")))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let payload = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse body")
        };
        (status, payload)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call("GET", path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call("POST", path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call("PUT", path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call("DELETE", path, token, None).await
    }

    pub fn outbox(&self) -> Vec<OutgoingMail> {
        self.state.mailer.outbox_messages()
    }

    /// Registers user number `n` with unique contact data; returns its id.
    pub async fn register(&self, n: u32, name: &str) -> i64 {
        let (status, body) = self.post("/v1/users", None, registration(n, name)).await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        body["id"].as_i64().expect("user id")
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/v1/auth/login",
                None,
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().expect("token").to_string()
    }

    /// Registers user `n` and logs it in.
    pub async fn user(&self, n: u32, name: &str) -> (i64, String) {
        let id = self.register(n, name).await;
        let token = self.login(&email(n), PASSWORD).await;
        (id, token)
    }

    /// Creates a breed under the seeded dog species and a city under SP.
    pub async fn pet_refs(&self, token: &str) -> PetRefs {
        let species_id = self.lookup_id("species", "Cachorro").await;
        let (_, breed) = self
            .post(
                "/v1/lookups/breeds",
                Some(token),
                json!({ "name": "Vira-lata", "parent_id": species_id }),
            )
            .await;
        let (_, states) = self.get("/v1/lookups/states", None).await;
        let state_id = states["items"]
            .as_array()
            .expect("states")
            .iter()
            .find(|s| s["code"] == "SP")
            .and_then(|s| s["id"].as_i64())
            .expect("SP seeded");
        let (_, city) = self
            .post(
                "/v1/lookups/cities",
                Some(token),
                json!({ "name": "Campinas", "parent_id": state_id }),
            )
            .await;
        PetRefs {
            species_id,
            breed_id: breed["id"].as_i64().expect("breed id"),
            age_bracket_id: self.lookup_id("age-brackets", "Jovem").await,
            sex_id: self.lookup_id("sexes", "Macho").await,
            status_id: self.lookup_id("statuses", "Disponivel").await,
            city_id: city["id"].as_i64().expect("city id"),
            state_id,
        }
    }

    pub async fn lookup_id(&self, kind: &str, name: &str) -> i64 {
        let (status, body) = self.get(&format!("/v1/lookups/{kind}"), None).await;
        assert_eq!(status, StatusCode::OK);
        body["items"]
            .as_array()
            .expect("items")
            .iter()
            .find(|i| i["name"] == name)
            .and_then(|i| i["id"].as_i64())
            .unwrap_or_else(|| panic!("{kind} '{name}' not seeded"))
    }

    pub async fn create_pet(&self, token: &str, refs: &PetRefs, name: &str) -> i64 {
        let (status, body) = self
            .post("/v1/pets", Some(token), refs.pet_body(name))
            .await;
        assert_eq!(status, StatusCode::OK, "pet create failed: {body}");
        body["id"].as_i64().expect("pet id")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PetRefs {
    pub species_id: i64,
    pub breed_id: i64,
    pub age_bracket_id: i64,
    pub sex_id: i64,
    pub status_id: i64,
    pub city_id: i64,
    pub state_id: i64,
}

impl PetRefs {
    pub fn pet_body(&self, name: &str) -> Value {
        json!({
            "name": name,
            "species_id": self.species_id,
            "breed_id": self.breed_id,
            "age": 3,
            "age_bracket_id": self.age_bracket_id,
            "sex_id": self.sex_id,
            "status_id": self.status_id,
            "city_id": self.city_id,
            "state_id": self.state_id,
            "description": "Muito docil",
            "donation_reason": "Mudanca de cidade"
        })
    }
}

pub fn email(n: u32) -> String {
    format!("pessoa{n}@example.com")
}

pub fn phone(n: u32) -> String {
    format!("119{:08}", 10_000_000 + n)
}

/// A valid CPF derived from `n`.
pub fn cpf(n: u32) -> String {
    let base = format!("{:09}", 123_456_000 + n);
    let mut digits = base
        .chars()
        .map(|c| c.to_digit(10).expect("digit"))
        .collect::<Vec<_>>();
    for len in [9usize, 10] {
        let sum: u32 = digits
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        let r = (sum * 10) % 11;
        digits.push(if r == 10 { 0 } else { r });
    }
    digits.iter().map(|d| d.to_string()).collect()
}

pub fn registration(n: u32, name: &str) -> Value {
    json!({
        "name": name,
        "email": email(n),
        "password": PASSWORD,
        "document_number": cpf(n),
        "phone": phone(n),
    })
}
