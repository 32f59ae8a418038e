//! Tests for the address book administration API.

use salvo::http::StatusCode;
use serde_json::json;

use super::helpers::*;

#[test_log::test(tokio::test)]
async fn healthcheck_answers_ok() {
    let env = TestEnv::new();

    env.send(TestRequest::get("/api/app/healthcheck"))
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("OK");
}

#[test_log::test(tokio::test)]
async fn create_returns_the_soap_url() {
    let env = TestEnv::new();

    let created = env
        .send(TestRequest::post("/api/addressbook").json_body(&json!({"title": "Lobby"})))
        .await
        .assert_status(StatusCode::CREATED)
        .json();

    let secret = created["secret_key"].as_str().unwrap_or_default();
    assert_eq!(secret.len(), 32);
    assert_eq!(created["title"], "Lobby");
    assert_eq!(
        created["soap_url"],
        format!("https://phonebook.example.com/tms/soap/{secret}/")
    );
}

#[test_log::test(tokio::test)]
async fn create_without_title_is_bad_request() {
    let env = TestEnv::new();

    env.send(TestRequest::post("/api/addressbook").json_body(&json!({"kind": "local"})))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[test_log::test(tokio::test)]
async fn sync_reports_the_book() {
    let env = TestEnv::new();
    let book = env.seed_book("Lobby").await;

    let report = env
        .send(TestRequest::post(&format!("/api/addressbook/{}/sync", book.id)))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(report["address_book_id"], book.id);
    assert!(report["sources"].as_array().is_some_and(Vec::is_empty));
}

#[test_log::test(tokio::test)]
async fn sync_of_unknown_book_is_not_found() {
    let env = TestEnv::new();

    env.send(TestRequest::post("/api/addressbook/4242/sync"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn non_numeric_id_is_bad_request() {
    let env = TestEnv::new();

    env.send(TestRequest::post("/api/addressbook/lobby/sync"))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[test_log::test(tokio::test)]
async fn snapshot_copy_carries_manual_entries() {
    let env = TestEnv::new();
    let book = env.seed_book("Lobby").await;
    env.seed_items(&book, &[("Floor 1", "Reception", "reception@example.com")])
        .await;

    let copy = env
        .send(
            TestRequest::post(&format!("/api/addressbook/{}/copy", book.id)).json_body(&json!({
                "new_title": "Lobby snapshot",
                "copy_editable_items": true
            })),
        )
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    assert_eq!(copy["title"], "Lobby snapshot");

    let secret = copy["secret_key"].as_str().unwrap_or_default();
    let hits = env
        .send(TestRequest::get(&format!("/json/search/{secret}/?q=reception")))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(titles(&hits["items"]), ["Reception"]);
}

#[test_log::test(tokio::test)]
async fn linked_copy_follows_the_original_after_sync() {
    let env = TestEnv::new();
    let book = env.seed_book("Lobby").await;
    env.seed_items(&book, &[("", "Reception", "reception@example.com")])
        .await;

    let copy = env
        .send(TestRequest::post(&format!("/api/addressbook/{}/copy", book.id)))
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    let copy_id = copy["id"].as_i64().unwrap_or_default();
    let secret = copy["secret_key"].as_str().unwrap_or_default().to_string();
    assert!(copy["title"].as_str().is_some_and(|t| t.starts_with("Lobby - Copy ")));

    let search = format!("/json/search/{secret}/?q=reception");
    let before = env.send(TestRequest::get(&search)).await.json();
    assert_eq!(before["item_count"], 0);

    let report = env
        .send(TestRequest::post(&format!("/api/addressbook/{copy_id}/sync")))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(report["sources"][0]["kind"], "manual_link");
    assert!(report["sources"][0]["error"].is_null());

    let after = env.send(TestRequest::get(&search)).await.json();
    assert_eq!(titles(&after["items"]), ["Reception"]);
}
