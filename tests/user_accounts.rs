mod common;

use common::{PASSWORD, TestApp, cpf, email, phone, registration};
use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn register_login_and_profile() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post("/v1/users", None, registration(1, "Ana Souza"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], email(1));
    assert_eq!(body["document_type"], "cpf");
    assert!(body.get("password_hash").is_none());

    let token = app.login(&email(1), PASSWORD).await;
    let (status, me) = app.get("/v1/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], body["id"]);
    assert_eq!(me["phone"], phone(1));
}

#[tokio::test]
async fn formatted_documents_and_phones_are_normalized() {
    let app = TestApp::new().await;
    let raw = cpf(1);
    let formatted = format!("{}.{}.{}-{}", &raw[..3], &raw[3..6], &raw[6..9], &raw[9..]);
    let mut body = registration(1, "Ana Souza");
    body["document_number"] = json!(formatted);
    body["phone"] = json!("(11) 91000-0001");
    body["email"] = json!("  Ana.Souza@Example.COM ");

    let (status, user) = app.post("/v1/users", None, body).await;
    assert_eq!(status, StatusCode::OK, "{user}");
    assert_eq!(user["document_number"], raw);
    assert_eq!(user["phone"], "11910000001");
    assert_eq!(user["email"], "ana.souza@example.com");
}

#[tokio::test]
async fn duplicate_fields_conflict() {
    let app = TestApp::new().await;
    app.register(1, "Ana Souza").await;

    let mut same_email = registration(2, "Bia Lima");
    same_email["email"] = json!(email(1));
    let (status, body) = app.post("/v1/users", None, same_email).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "EMAIL_TAKEN");

    let mut same_document = registration(2, "Bia Lima");
    same_document["document_number"] = json!(cpf(1));
    let (status, body) = app.post("/v1/users", None, same_document).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "DOCUMENT_TAKEN");

    let mut same_phone = registration(2, "Bia Lima");
    same_phone["phone"] = json!(phone(1));
    let (status, body) = app.post("/v1/users", None, same_phone).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "PHONE_TAKEN");
}

#[tokio::test]
async fn invalid_registrations_are_rejected() {
    let app = TestApp::new().await;

    let mut bad_cpf = registration(1, "Ana Souza");
    bad_cpf["document_number"] = json!("11111111111");
    let (status, body) = app.post("/v1/users", None, bad_cpf).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_CPF");

    let mut cnpj = registration(1, "Pet Shop Ltda");
    cnpj["document_number"] = json!("11.222.333/0001-81");
    cnpj["document_type"] = json!("cnpj");
    let (status, body) = app.post("/v1/users", None, cnpj).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["document_number"], "11222333000181");

    let mut short_password = registration(2, "Bia Lima");
    short_password["password"] = json!("curta");
    let (status, body) = app.post("/v1/users", None, short_password).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_PASSWORD");
}

#[tokio::test]
async fn availability_reports_each_field() {
    let app = TestApp::new().await;
    app.register(1, "Ana Souza").await;

    let (status, body) = app
        .get(
            &format!(
                "/v1/users/availability?email={}&document_number={}",
                email(1),
                cpf(2)
            ),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email_available"], false);
    assert_eq!(body["document_available"], true);
    assert!(body["phone_available"].is_null());
}

#[tokio::test]
async fn wrong_credentials_share_one_error() {
    let app = TestApp::new().await;
    app.register(1, "Ana Souza").await;

    for (mail, password) in [(email(1), "senha-errada-1"), (email(9), PASSWORD)] {
        let (status, body) = app
            .post(
                "/v1/auth/login",
                None,
                json!({ "email": mail, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "INVALID_CREDENTIALS");
    }
}

#[tokio::test]
async fn contact_fields_are_private_to_the_owner() {
    let app = TestApp::new().await;
    let (ana, ana_token) = app.user(1, "Ana Souza").await;
    let (bia, _) = app.user(2, "Bia Lima").await;

    let (status, other) = app.get(&format!("/v1/users/{bia}"), Some(&ana_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(other["name"], "Bia Lima");
    assert!(other.get("email").is_none());
    assert!(other.get("phone").is_none());

    let (_, own) = app.get(&format!("/v1/users/{ana}"), Some(&ana_token)).await;
    assert_eq!(own["email"], email(1));

    let (_, listed) = app.get("/v1/users", Some(&ana_token)).await;
    assert_eq!(listed["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn users_only_update_themselves() {
    let app = TestApp::new().await;
    let (ana, ana_token) = app.user(1, "Ana Souza").await;
    let (bia, bia_token) = app.user(2, "Bia Lima").await;

    let (status, body) = app
        .put(&format!("/v1/users/{bia}"), Some(&ana_token), json!({ "name": "Hacker" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "NOT_ACCOUNT_OWNER");

    let (status, body) = app
        .put(
            &format!("/v1/users/{bia}"),
            Some(&bia_token),
            json!({ "phone": phone(1) }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "PHONE_TAKEN");

    let (status, body) = app
        .put(
            &format!("/v1/users/{ana}"),
            Some(&ana_token),
            json!({ "name": "Ana S. Souza", "email": email(1), "password": "nova-senha-456" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Ana S. Souza");
    app.login(&email(1), "nova-senha-456").await;
}

#[tokio::test]
async fn city_must_belong_to_state() {
    let app = TestApp::new().await;
    let (ana, token) = app.user(1, "Ana Souza").await;
    let refs = app.pet_refs(&token).await;

    let (_, states) = app.get("/v1/lookups/states", None).await;
    let rj = states["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["code"] == "RJ")
        .and_then(|s| s["id"].as_i64())
        .unwrap();

    let (status, body) = app
        .put(
            &format!("/v1/users/{ana}"),
            Some(&token),
            json!({ "city_id": refs.city_id, "state_id": rj }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "CITY_STATE_MISMATCH");

    let (status, body) = app
        .put(
            &format!("/v1/users/{ana}"),
            Some(&token),
            json!({ "city_id": refs.city_id, "state_id": refs.state_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city_name"], "Campinas");
    assert_eq!(body["state_name"], "Sao Paulo");
}

#[tokio::test]
async fn deleting_an_account_removes_its_pets_and_token_access() {
    let app = TestApp::new().await;
    let (ana, token) = app.user(1, "Ana Souza").await;
    let refs = app.pet_refs(&token).await;
    let pet_id = app.create_pet(&token, &refs, "Rex").await;

    let (status, body) = app.delete(&format!("/v1/users/{ana}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pets_removed"], 1);

    let (status, _) = app.get(&format!("/v1/pets/{pet_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/v1/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "UNKNOWN_USER");
}

#[tokio::test]
async fn incomplete_registration_is_a_json_error() {
    let app = TestApp::new().await;
    let (status, body) = app.post("/v1/users", None, json!({ "name": "A" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_BODY");

    let (_, token) = app.user(1, "Ana Souza").await;
    let (status, body) = app.get("/v1/users/abc", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_PATH");
}
