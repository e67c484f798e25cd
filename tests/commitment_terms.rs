mod common;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::{TestApp, email, phone};
use http::StatusCode;
use serde_json::{Value, json};

struct Adoption {
    donor: i64,
    donor_token: String,
    adopter: i64,
    adopter_token: String,
    pet_id: i64,
}

async fn adoption_setup(app: &TestApp) -> Adoption {
    let (donor, donor_token) = app.user(1, "Joao Doador").await;
    let (adopter, adopter_token) = app.user(2, "Maria Silva").await;
    let refs = app.pet_refs(&donor_token).await;
    let pet_id = app.create_pet(&donor_token, &refs, "Rex").await;
    Adoption {
        donor,
        donor_token,
        adopter,
        adopter_token,
        pet_id,
    }
}

async fn sign(app: &TestApp, kind: &str, token: &str, body: Value) -> (StatusCode, Value) {
    app.post(&format!("/v1/terms/{kind}"), Some(token), body).await
}

fn blake3_hex(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

#[tokio::test]
async fn adoption_term_snapshots_parties_and_validates() {
    let app = TestApp::new().await;
    let s = adoption_setup(&app).await;

    let (status, body) = sign(
        &app,
        "adoption",
        &s.adopter_token,
        json!({
            "petId": s.pet_id,
            "adopterId": s.adopter,
            "signatureText": "Maria Silva",
            "observations": "Entrega no sabado"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let term = &body["term"];
    assert_eq!(term["kind"], "adoption");
    assert_eq!(term["pet_id"], s.pet_id);
    assert_eq!(term["donor_id"], s.donor);
    assert_eq!(term["adopter_id"], s.adopter);
    assert_eq!(term["pet"]["name"], "Rex");
    assert_eq!(term["pet"]["species"], "Cachorro");
    assert_eq!(term["pet"]["breed"], "Vira-lata");
    assert_eq!(term["pet"]["sex"], "Macho");
    assert_eq!(term["donor"]["email"], email(1));
    assert_eq!(term["adopter"]["phone"], phone(2));
    assert_eq!(term["observations"], "Entrega no sabado");
    assert_eq!(body["notification"]["sent"], true);

    let (status, check) = app
        .get(
            &format!("/v1/terms/adoption/{}/validate", term["id"]),
            Some(&s.donor_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["valid"], true);
}

#[tokio::test]
async fn integrity_hash_follows_the_fixed_formula() {
    let app = TestApp::new().await;
    for n in 1..=9 {
        let name = match n {
            3 => "João Donor",
            9 => "Maria Silva",
            _ => "Pessoa Teste",
        };
        app.register(n, name).await;
    }
    let donor_token = app.login(&email(3), common::PASSWORD).await;
    let adopter_token = app.login(&email(9), common::PASSWORD).await;
    let refs = app.pet_refs(&donor_token).await;
    for n in 1..=6 {
        app.create_pet(&donor_token, &refs, &format!("Filhote {n}")).await;
    }
    let pet_id = app.create_pet(&donor_token, &refs, "Rex").await;
    assert_eq!(pet_id, 7);

    let (status, body) = sign(
        &app,
        "adoption",
        &adopter_token,
        json!({ "pet_id": 7, "adopter_id": 9, "signature_text": "Maria Silva" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let term = &body["term"];
    assert_eq!(term["pet_id"], 7);
    assert_eq!(term["donor_id"], 3);
    assert_eq!(term["adopter_id"], 9);
    assert_eq!(term["digital_signature"], "Maria Silva");

    let signed_at = term["signed_at"].as_i64().unwrap();
    let expected = blake3_hex(&format!("RexJoão DonorMaria SilvaMaria Silva{signed_at}"));
    assert_eq!(term["integrity_hash"], expected);
}

#[tokio::test]
async fn second_term_for_the_same_pet_conflicts() {
    let app = TestApp::new().await;
    let s = adoption_setup(&app).await;
    let body = json!({ "pet_id": s.pet_id, "adopter_id": s.adopter, "signature_text": "Maria Silva" });

    let (status, _) = sign(&app, "adoption", &s.adopter_token, body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, err) = sign(&app, "adoption", &s.adopter_token, body.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error_code"], "TERM_ALREADY_EXISTS");

    // uniqueness is per variant
    let (status, _) = sign(&app, "compromise", &s.adopter_token, body).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn second_donation_by_the_same_donor_conflicts() {
    let app = TestApp::new().await;
    let s = adoption_setup(&app).await;
    let body = json!({ "donor_id": s.donor, "pet_id": s.pet_id, "signature_text": "Joao Doador" });

    let (status, first) = sign(&app, "donation", &s.donor_token, body.clone()).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert!(first["term"]["adopter"].is_null());
    assert_eq!(first["term"]["pet"]["donation_reason"], "Mudanca de cidade");

    let (status, err) = sign(&app, "donation", &s.donor_token, body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error_code"], "TERM_ALREADY_EXISTS");
}

#[tokio::test]
async fn create_rejects_invalid_requests() {
    let app = TestApp::new().await;
    let s = adoption_setup(&app).await;

    let (status, err) = sign(
        &app,
        "adoption",
        &s.adopter_token,
        json!({ "pet_id": s.pet_id, "adopter_id": s.adopter, "signature_text": "   " }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error_code"], "INVALID_SIGNATURE");

    let (status, err) = sign(
        &app,
        "adoption",
        &s.adopter_token,
        json!({ "pet_id": s.pet_id, "adopter_id": s.adopter, "signature_text": "x".repeat(201) }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error_code"], "INVALID_SIGNATURE");

    let (status, err) = sign(
        &app,
        "adoption",
        &s.donor_token,
        json!({ "pet_id": s.pet_id, "adopter_id": s.donor, "signature_text": "Joao" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error_code"], "SELF_ADOPTION");

    let (status, err) = sign(
        &app,
        "donation",
        &s.donor_token,
        json!({ "donor_id": s.donor, "adopter_id": s.adopter, "signature_text": "Joao" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error_code"], "FIELD_NOT_APPLICABLE");

    let (status, err) = sign(
        &app,
        "adoption",
        &s.adopter_token,
        json!({ "pet_id": 999, "adopter_id": s.adopter, "signature_text": "Maria" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error_code"], "PET_NOT_FOUND");

    let (status, err) = sign(
        &app,
        "adoption",
        &s.adopter_token,
        json!({ "pet_id": s.pet_id, "adopter_id": 999, "signature_text": "Maria" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error_code"], "ADOPTER_NOT_FOUND");

    let (status, err) = sign(
        &app,
        "adoption",
        &s.donor_token,
        json!({ "pet_id": s.pet_id, "adopter_id": s.adopter, "signature_text": "Maria" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["error_code"], "NOT_SIGNING_PARTY");

    let (status, err) = sign(&app, "transfer", &s.adopter_token, json!({ "signature_text": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error_code"], "UNKNOWN_TERM_KIND");
}

#[tokio::test]
async fn donation_pet_must_belong_to_the_donor() {
    let app = TestApp::new().await;
    let s = adoption_setup(&app).await;
    let (status, err) = sign(
        &app,
        "donation",
        &s.adopter_token,
        json!({ "donor_id": s.adopter, "pet_id": s.pet_id, "signature_text": "Maria" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["error_code"], "PET_NOT_OWNED");
}

#[tokio::test]
async fn resync_by_another_adopter_is_forbidden_and_changes_nothing() {
    let app = TestApp::new().await;
    let s = adoption_setup(&app).await;
    let (intruder, intruder_token) = app.user(3, "Carla Intrusa").await;

    let (_, created) = sign(
        &app,
        "adoption",
        &s.adopter_token,
        json!({ "pet_id": s.pet_id, "adopter_id": s.adopter, "signature_text": "Maria Silva" }),
    )
    .await;
    let term_id = created["term"]["id"].as_i64().unwrap();

    let (status, err) = app
        .post(
            &format!("/v1/terms/adoption/{term_id}/resync"),
            Some(&intruder_token),
            json!({ "adopter_id": intruder, "signature_text": "Carla" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["error_code"], "NOT_TERM_ADOPTER");

    // naming the real adopter with someone else's token
    let (status, err) = app
        .post(
            &format!("/v1/terms/adoption/{term_id}/resync"),
            Some(&intruder_token),
            json!({ "adopter_id": s.adopter, "signature_text": "Carla" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["error_code"], "NOT_SIGNING_PARTY");

    let (_, after) = app
        .get(&format!("/v1/terms/adoption/{term_id}"), Some(&s.adopter_token))
        .await;
    assert_eq!(after, created["term"]);
}

#[tokio::test]
async fn resync_refreshes_only_adopter_fields() {
    let app = TestApp::new().await;
    let s = adoption_setup(&app).await;
    let (_, created) = sign(
        &app,
        "compromise",
        &s.adopter_token,
        json!({ "pet_id": s.pet_id, "adopter_id": s.adopter, "signature_text": "Maria Silva" }),
    )
    .await;
    let before = created["term"].clone();
    let term_id = before["id"].as_i64().unwrap();

    // live data changes on every side
    let (status, _) = app
        .put(
            &format!("/v1/users/{}", s.adopter),
            Some(&s.adopter_token),
            json!({ "name": "Maria Silva Santos", "phone": "11987654321" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    app.put(
        &format!("/v1/users/{}", s.donor),
        Some(&s.donor_token),
        json!({ "name": "Joao Renomeado" }),
    )
    .await;
    app.put(
        &format!("/v1/pets/{}", s.pet_id),
        Some(&s.donor_token),
        json!({ "name": "Rex II" }),
    )
    .await;

    let (status, body) = app
        .post(
            &format!("/v1/terms/compromise/{term_id}/resync"),
            Some(&s.adopter_token),
            json!({ "adopterId": s.adopter, "signatureText": "Maria Silva Santos" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let after = &body["term"];

    assert_eq!(after["pet"], before["pet"]);
    assert_eq!(after["donor"], before["donor"]);
    assert_eq!(after["pet_id"], before["pet_id"]);
    assert_eq!(after["created_at"], before["created_at"]);
    assert_eq!(after["adopter"]["name"], "Maria Silva Santos");
    assert_eq!(after["adopter"]["phone"], "11987654321");
    assert_eq!(after["digital_signature"], "Maria Silva Santos");
    assert_ne!(after["integrity_hash"], before["integrity_hash"]);

    let (_, check) = app
        .get(
            &format!("/v1/terms/compromise/{term_id}/validate"),
            Some(&s.adopter_token),
        )
        .await;
    assert_eq!(check["valid"], true);
}

#[tokio::test]
async fn donation_terms_cannot_be_resynced() {
    let app = TestApp::new().await;
    let s = adoption_setup(&app).await;
    let (_, created) = sign(
        &app,
        "donation",
        &s.donor_token,
        json!({ "donor_id": s.donor, "signature_text": "Joao Doador" }),
    )
    .await;
    let (status, err) = app
        .post(
            &format!("/v1/terms/donation/{}/resync", created["term"]["id"]),
            Some(&s.donor_token),
            json!({ "adopter_id": s.donor, "signature_text": "Joao" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error_code"], "RESYNC_NOT_SUPPORTED");
}

#[tokio::test]
async fn parties_receive_role_specific_mail_with_the_document() {
    let app = TestApp::new().await;
    let s = adoption_setup(&app).await;
    let (_, created) = sign(
        &app,
        "adoption",
        &s.adopter_token,
        json!({ "pet_id": s.pet_id, "adopter_id": s.adopter, "signature_text": "Maria Silva" }),
    )
    .await;
    let term_id = created["term"]["id"].as_i64().unwrap();
    let hash = created["term"]["integrity_hash"].as_str().unwrap().to_string();

    let mails = app.outbox();
    let donor_mail = mails.iter().find(|m| m.to == email(1)).expect("donor mail");
    let adopter_mail = mails.iter().find(|m| m.to == email(2)).expect("adopter mail");
    assert!(donor_mail.text.contains(&phone(2)));
    assert!(adopter_mail.text.contains(&phone(1)));

    let attachment = &donor_mail.attachments[0];
    assert_eq!(attachment.filename, format!("termo-adoption-{term_id}.txt"));
    let decoded = String::from_utf8(STANDARD.decode(&attachment.content_base64).unwrap()).unwrap();
    assert!(decoded.contains("Pagina 1 de 1"));
    assert!(decoded.contains(&hash));

    let (status, doc) = app
        .get(
            &format!("/v1/terms/adoption/{term_id}/document"),
            Some(&s.donor_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["content"], decoded);
    assert_eq!(doc["page_count"], 1);

    let (status, sent) = app
        .post(
            &format!("/v1/terms/adoption/{term_id}/send"),
            Some(&s.donor_token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["recipients"].as_array().unwrap().len(), 2);
    assert_eq!(app.outbox().len(), mails.len() + 2);
}

#[tokio::test]
async fn only_parties_can_read_a_term() {
    let app = TestApp::new().await;
    let s = adoption_setup(&app).await;
    let (_, outsider_token) = app.user(3, "Carla Alheia").await;
    let (_, created) = sign(
        &app,
        "adoption",
        &s.adopter_token,
        json!({ "pet_id": s.pet_id, "adopter_id": s.adopter, "signature_text": "Maria Silva" }),
    )
    .await;
    let term_id = created["term"]["id"].as_i64().unwrap();

    for path in [
        format!("/v1/terms/adoption/{term_id}"),
        format!("/v1/terms/adoption/{term_id}/document"),
    ] {
        let (status, err) = app.get(&path, Some(&outsider_token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(err["error_code"], "NOT_TERM_PARTY");
    }

    let (_, listed) = app.get("/v1/terms/adoption", Some(&outsider_token)).await;
    assert!(listed["terms"].as_array().unwrap().is_empty());
    let (_, listed) = app
        .get(
            &format!("/v1/terms/adoption?pet_id={}", s.pet_id),
            Some(&s.donor_token),
        )
        .await;
    assert_eq!(listed["terms"].as_array().unwrap().len(), 1);

    let (status, _) = app.get(&format!("/v1/terms/adoption/{term_id}"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn mail_failure_keeps_the_term() {
    let app = TestApp::with_unreachable_relay().await;
    let s = adoption_setup(&app).await;

    let (status, body) = sign(
        &app,
        "adoption",
        &s.adopter_token,
        json!({ "pet_id": s.pet_id, "adopter_id": s.adopter, "signature_text": "Maria Silva" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["notification"]["sent"], false);
    assert!(body["notification"]["reason"].is_string());
    let term_id = body["term"]["id"].as_i64().unwrap();

    let (status, _) = app
        .get(&format!("/v1/terms/adoption/{term_id}"), Some(&s.adopter_token))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, err) = app
        .post(
            &format!("/v1/terms/adoption/{term_id}/send"),
            Some(&s.adopter_token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err["error_code"], "MAIL_DELIVERY_FAILED");
}

#[tokio::test]
async fn malformed_requests_use_the_error_envelope() {
    let app = TestApp::new().await;
    let s = adoption_setup(&app).await;

    let (status, err) = sign(
        &app,
        "adoption",
        &s.adopter_token,
        json!({ "pet_id": s.pet_id, "adopter_id": s.adopter }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error_code"], "INVALID_BODY");
    assert!(err["reason"].as_str().unwrap().contains("signature_text"));

    let (status, err) = sign(
        &app,
        "adoption",
        &s.adopter_token,
        json!({ "pet_id": "x", "adopter_id": s.adopter, "signature_text": "Maria" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error_code"], "INVALID_BODY");

    let (status, err) = app
        .get("/v1/terms/adoption/abc", Some(&s.adopter_token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error_code"], "INVALID_PATH");

    let (status, err) = app
        .get("/v1/terms/adoption?pet_id=abc", Some(&s.adopter_token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error_code"], "INVALID_QUERY");
}

async fn sign_concurrently(
    app: &TestApp,
    kind: &'static str,
    token: &str,
    body: Value,
    attempts: usize,
) -> Vec<(StatusCode, Value)> {
    let handles = (0..attempts)
        .map(|_| {
            let app = app.clone();
            let token = token.to_string();
            let body = body.clone();
            tokio::spawn(async move { sign(&app, kind, &token, body).await })
        })
        .collect::<Vec<_>>();
    let mut results = Vec::with_capacity(attempts);
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results
}

fn assert_single_winner(results: &[(StatusCode, Value)]) {
    let accepted = results.iter().filter(|(s, _)| *s == StatusCode::OK).count();
    assert_eq!(accepted, 1, "{results:?}");
    for (status, body) in results.iter().filter(|(s, _)| *s != StatusCode::OK) {
        assert_eq!(*status, StatusCode::CONFLICT);
        assert_eq!(body["error_code"], "TERM_ALREADY_EXISTS");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adoptions_of_one_pet_yield_one_term() {
    let app = TestApp::new().await;
    let s = adoption_setup(&app).await;
    let body = json!({ "pet_id": s.pet_id, "adopter_id": s.adopter, "signature_text": "Maria Silva" });

    let results = sign_concurrently(&app, "adoption", &s.adopter_token, body, 8).await;
    assert_single_winner(&results);

    let (_, listed) = app.get("/v1/terms/adoption", Some(&s.adopter_token)).await;
    assert_eq!(listed["terms"].as_array().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_donations_by_one_donor_yield_one_term() {
    let app = TestApp::new().await;
    let s = adoption_setup(&app).await;
    let body = json!({ "donor_id": s.donor, "signature_text": "Joao Doador" });

    let results = sign_concurrently(&app, "donation", &s.donor_token, body, 8).await;
    assert_single_winner(&results);

    let (_, listed) = app.get("/v1/terms/donation", Some(&s.donor_token)).await;
    assert_eq!(listed["terms"].as_array().unwrap().len(), 1);
}
