//! Tests for the endpoint-facing SOAP phonebook.

use salvo::http::StatusCode;

use phonebook_test::component::constants::PHONEBOOK_SEARCH_ACTION;
use phonebook_test::soap::soap::{Protocol, parse_search_response};

use super::helpers::*;

/// A book holding group "test" and item "Item3" at its root.
async fn lobby(env: &TestEnv) -> phonebook_test::component::model::AddressBook {
    let book = env.seed_book("Lobby").await;
    env.seed_group(&book, "test").await;
    env.seed_items(&book, &[("", "Item3", "item3@example.com")]).await;
    book
}

#[test_log::test(tokio::test)]
async fn browse_root_lists_catalogs_and_entries() {
    let env = TestEnv::new();
    let book = lobby(&env).await;

    let response = env
        .send(TestRequest::soap_search(&soap_path(&book), &search_envelope("", "")))
        .await
        .assert_status(StatusCode::OK)
        .assert_header_contains("Content-Type", "text/xml")
        .assert_body_contains("<IsFirst>true</IsFirst>")
        .assert_body_contains("<NoOfEntries>2</NoOfEntries>");

    let page = parse_search_response(&response.body).expect("Response should parse");
    assert_eq!(page.catalogs.len(), 1);
    assert_eq!(page.catalogs[0].name, "test");
    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].name, "Item3");
    assert_eq!(
        page.entries[0].dial_string(Protocol::Sip),
        Some("item3@example.com")
    );
}

#[test_log::test(tokio::test)]
async fn search_string_filters_entries() {
    let env = TestEnv::new();
    let book = env.seed_book("Lobby").await;
    env.seed_items(
        &book,
        &[
            ("", "alice", "alice@example.com"),
            ("", "bob", "bob@example.com"),
        ],
    )
    .await;

    env.send(TestRequest::soap_search(&soap_path(&book), &search_envelope("ali", "")))
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("alice@example.com")
        .assert_body_not_contains("bob@example.com")
        .assert_body_contains("<NoOfEntries>1</NoOfEntries>");
}

#[test_log::test(tokio::test)]
async fn unquoted_soap_action_is_accepted() {
    let env = TestEnv::new();
    let book = lobby(&env).await;

    env.send(
        TestRequest::post(&soap_path(&book))
            .header("SOAPAction", PHONEBOOK_SEARCH_ACTION)
            .xml_body(&search_envelope("", "")),
    )
    .await
    .assert_status(StatusCode::OK);
}

#[test_log::test(tokio::test)]
async fn get_is_not_supported() {
    let env = TestEnv::new();
    let book = lobby(&env).await;

    env.send(TestRequest::get(&soap_path(&book)))
        .await
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_body_contains("Method GET not supported.");
}

#[test_log::test(tokio::test)]
async fn foreign_soap_action_is_not_found() {
    let env = TestEnv::new();
    let book = lobby(&env).await;

    env.send(
        TestRequest::post(&soap_path(&book))
            .header("SOAPAction", "http://example.com/Other")
            .xml_body(&search_envelope("", "")),
    )
    .await
    .assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn unknown_key_is_not_found() {
    let env = TestEnv::new();
    lobby(&env).await;

    env.send(TestRequest::soap_search(
        "/tms/soap/0123456789abcdef0123456789abcdef/",
        &search_envelope("", ""),
    ))
    .await
    .assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn envelope_without_search_is_bad_request() {
    let env = TestEnv::new();
    let book = lobby(&env).await;
    let envelope = r#"<env:Envelope xmlns:env="http://schemas.xmlsoap.org/soap/envelope/"><env:Body/></env:Envelope>"#;

    env.send(TestRequest::soap_search(&soap_path(&book), envelope))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[test_log::test(tokio::test)]
async fn unknown_scope_is_an_empty_page() {
    let env = TestEnv::new();
    let book = lobby(&env).await;

    env.send(TestRequest::soap_search(
        &soap_path(&book),
        &search_envelope("", "<SearchPath>g-999999</SearchPath>"),
    ))
    .await
    .assert_status(StatusCode::OK)
    .assert_body_contains("<NoOfEntries>0</NoOfEntries>");
}
