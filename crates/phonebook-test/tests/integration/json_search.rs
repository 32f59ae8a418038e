//! Tests for the JSON search endpoint.

use salvo::http::StatusCode;

use super::helpers::*;

#[test_log::test(tokio::test)]
async fn alice_and_bob() {
    let env = TestEnv::new();
    let book = env.seed_book("Office").await;
    env.seed_items(
        &book,
        &[
            ("", "alice", "alice@example.com"),
            ("", "bob", "bob@example.com"),
        ],
    )
    .await;

    let all = env
        .send(TestRequest::get(&json_search_path(&book, "")))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(all["item_count"], 2);
    assert_eq!(titles(&all["items"]), ["alice", "bob"]);

    let alice = env
        .send(TestRequest::get(&json_search_path(&book, "q=ALI")))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(titles(&alice["items"]), ["alice"]);
    assert_eq!(alice["items"][0]["sip"], "alice@example.com");
    assert!(alice["items"][0]["id"].as_str().is_some_and(|id| id.starts_with("i-")));
}

#[test_log::test(tokio::test)]
async fn group_scope_limits_results() {
    let env = TestEnv::new();
    let book = env.seed_book("Office").await;
    env.seed_items(
        &book,
        &[
            ("Sales", "Oslo", "oslo@example.com"),
            ("Support", "Bergen", "bergen@example.com"),
        ],
    )
    .await;

    let root = env
        .send(TestRequest::get(&json_search_path(&book, "")))
        .await
        .json();
    assert_eq!(titles(&root["groups"]), ["Sales", "Support"]);
    assert_eq!(root["item_count"], 0);

    let sales = root["groups"][0]["id"].as_str().unwrap_or_default().to_string();
    let scoped = env
        .send(TestRequest::get(&json_search_path(&book, &format!("group={sales}"))))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(titles(&scoped["items"]), ["Oslo"]);
    assert!(titles(&scoped["groups"]).is_empty());
}

#[test_log::test(tokio::test)]
async fn offset_and_limit_slice_each_list() {
    let env = TestEnv::new();
    let book = env.seed_book("Office").await;
    env.seed_items(
        &book,
        &[
            ("", "a", "a@example.com"),
            ("", "b", "b@example.com"),
            ("", "c", "c@example.com"),
        ],
    )
    .await;

    let page = env
        .send(TestRequest::get(&json_search_path(&book, "offset=1&limit=1")))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(page["item_count"], 3);
    assert_eq!(titles(&page["items"]), ["b"]);
}

#[test_log::test(tokio::test)]
async fn books_do_not_leak_into_each_other() {
    let env = TestEnv::new();
    let office = env.seed_book("Office").await;
    let lab = env.seed_book("Lab").await;
    env.seed_items(&office, &[("", "alice", "alice@example.com")]).await;
    env.seed_items(&lab, &[("", "bob", "bob@example.com")]).await;

    let hits = env
        .send(TestRequest::get(&json_search_path(&lab, "q=example")))
        .await
        .json();
    assert_eq!(titles(&hits["items"]), ["bob"]);
}

#[test_log::test(tokio::test)]
async fn unknown_key_is_not_found() {
    let env = TestEnv::new();
    env.seed_book("Office").await;

    env.send(TestRequest::get("/json/search/nope/?q=a"))
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_body_contains("Address book not found");
}
