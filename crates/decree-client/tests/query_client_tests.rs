//! Integration tests for the query execution client, against a mocked
//! GraphQL endpoint.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use decree_client::{
    FetchPolicy, MutationCachePolicy, QueryClient, QueryError, QueryOptions, QueryState,
    TransportError,
};
use decree_schema::operations::{
    CreateRule, CreateRuleVariables, ListRules, ListRulesVariables,
};

fn empty_page_info() -> serde_json::Value {
    json!({"hasNextPage": false, "hasPreviousPage": false})
}

fn rule(id: &str, summary: &str, author: &str, liker_ids: &[&str]) -> serde_json::Value {
    json!({
        "id": id,
        "summary": summary,
        "user": {"name": author},
        "likes": {
            "pageInfo": empty_page_info(),
            "users": liker_ids.iter().map(|id| json!({"id": id})).collect::<Vec<_>>(),
        },
    })
}

fn window(rules: Vec<serde_json::Value>, end_cursor: Option<&str>, has_next: bool) -> serde_json::Value {
    let mut page_info = json!({"hasNextPage": has_next, "hasPreviousPage": false});
    if let Some(cursor) = end_cursor {
        page_info["endCursor"] = json!(cursor);
    }
    json!({"data": {"rules": {"pageInfo": page_info, "rules": rules}}})
}

async fn client_for(server: &MockServer) -> QueryClient {
    QueryClient::new(format!("{}/query", server.uri())).unwrap()
}

#[tokio::test]
async fn list_rules_settles_ready_under_bounded_latency() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(50))
                .set_body_json(window(vec![rule("r1", "No shoes indoors", "Alice", &[])], None, false)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut handle = client.execute::<ListRules>(ListRulesVariables::new(20));
    assert!(handle.state().is_pending());

    let state = tokio::time::timeout(Duration::from_secs(5), handle.settled())
        .await
        .expect("the execution must settle, never stall");

    let QueryState::Ready(data) = state else {
        panic!("expected Ready, got {state:?}");
    };
    assert_eq!(data.rules.rules.len(), 1);
    assert_eq!(data.rules.rules[0].summary, "No shoes indoors");
}

#[tokio::test]
async fn concurrent_identical_executes_share_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(100))
                .set_body_json(window(vec![rule("r1", "s", "Alice", &[])], None, false)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut first = client.execute::<ListRules>(ListRulesVariables::new(20));
    let mut second = client.execute::<ListRules>(ListRulesVariables::new(20));

    let QueryState::Ready(a) = first.settled().await else {
        panic!("first observer did not resolve");
    };
    let QueryState::Ready(b) = second.settled().await else {
        panic!("second observer did not resolve");
    };

    // Both observers resolve to the very same decoded payload.
    assert!(Arc::ptr_eq(&a, &b));
}

#[tokio::test]
async fn distinct_variables_do_not_coalesce() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(window(vec![], None, false)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut first = client.execute::<ListRules>(ListRulesVariables::new(10));
    let mut second = client.execute::<ListRules>(ListRulesVariables::new(20));
    assert!(first.settled().await.is_ready());
    assert!(second.settled().await.is_ready());
}

#[tokio::test]
async fn pagination_windows_are_disjoint() {
    let server = MockServer::start().await;

    // Window 2, matched by its cursor. Mounted first: wiremock picks the
    // first matching mock.
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"variables": {"after": "r2"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(window(
            vec![rule("r3", "third", "Cara", &[])],
            Some("r3"),
            false,
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(window(
            vec![rule("r1", "first", "Alice", &[]), rule("r2", "second", "Bob", &[])],
            Some("r2"),
            true,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let first_vars = ListRulesVariables::new(2);
    let mut first = client.execute::<ListRules>(first_vars.clone());
    let QueryState::Ready(window_one) = first.settled().await else {
        panic!("window 1 did not resolve");
    };

    let next_vars = first_vars
        .next_page(&window_one.rules.page_info)
        .expect("window 1 reports a next page");
    let mut second = client.execute::<ListRules>(next_vars.clone());
    let QueryState::Ready(window_two) = second.settled().await else {
        panic!("window 2 did not resolve");
    };

    let ids_one: Vec<&str> = window_one.rules.rules.iter().map(|r| r.id.as_str()).collect();
    let ids_two: Vec<&str> = window_two.rules.rules.iter().map(|r| r.id.as_str()).collect();
    assert!(ids_one.iter().all(|id| !ids_two.contains(id)));

    // The last window reports no next page, so pagination stops here.
    assert!(next_vars.next_page(&window_two.rules.page_info).is_none());
}

#[tokio::test]
async fn missing_required_field_fails_with_schema_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"rules": {"pageInfo": empty_page_info(), "rules": [
                // No `id` on the rule.
                {"summary": "s", "user": {"name": "Alice"},
                 "likes": {"pageInfo": empty_page_info(), "users": []}},
            ]}},
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut handle = client.execute::<ListRules>(ListRulesVariables::new(20));
    let state = handle.settled().await;

    let QueryState::Failed(QueryError::SchemaMismatch(err)) = state else {
        panic!("expected a schema mismatch, got {state:?}");
    };
    assert_eq!(err.operation, "RulesList");
    assert!(!QueryError::SchemaMismatch(err).is_retriable());
}

#[tokio::test]
async fn data_null_without_errors_is_a_schema_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut handle = client.execute::<ListRules>(ListRulesVariables::new(20));
    assert!(matches!(
        handle.settled().await,
        QueryState::Failed(QueryError::SchemaMismatch(_))
    ));
}

#[tokio::test]
async fn server_errors_fail_with_execution_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"message": "unauthorized"}],
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut handle = client.execute::<ListRules>(ListRulesVariables::new(20));
    let state = handle.settled().await;

    let QueryState::Failed(QueryError::Execution(err)) = state else {
        panic!("expected an execution failure, got {state:?}");
    };
    assert_eq!(err.errors[0].message, "unauthorized");
    assert!(!QueryError::Execution(err).is_retriable());
}

#[tokio::test]
async fn partial_data_is_preserved_alongside_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"rules": null},
            "errors": [{"message": "likes unavailable", "path": ["rules", "rules"]}],
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut handle = client.execute::<ListRules>(ListRulesVariables::new(20));

    let QueryState::Failed(QueryError::Execution(err)) = handle.settled().await else {
        panic!("expected an execution failure");
    };
    assert_eq!(err.partial_data, Some(json!({"rules": null})));
}

#[tokio::test]
async fn http_error_status_fails_with_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut handle = client.execute::<ListRules>(ListRulesVariables::new(20));
    let state = handle.settled().await;

    let QueryState::Failed(err) = state else {
        panic!("expected a failure, got {state:?}");
    };
    assert!(err.is_retriable());
    let QueryError::Transport(TransportError::Status { status, message }) = err else {
        panic!("expected an HTTP status failure, got {err:?}");
    };
    assert_eq!(status, 503);
    assert_eq!(message.as_deref(), Some("maintenance"));
}

#[tokio::test]
async fn connection_failure_fails_with_transport_error() {
    // Nothing listens on port 1.
    let client = QueryClient::new("http://127.0.0.1:1/query").unwrap();
    let mut handle = client.execute::<ListRules>(ListRulesVariables::new(20));

    let QueryState::Failed(err) = handle.settled().await else {
        panic!("expected a failure");
    };
    assert!(err.is_retriable());
}

#[tokio::test]
async fn cache_first_serves_memoized_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(window(vec![rule("r1", "s", "Alice", &[])], None, false)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut first = client.execute::<ListRules>(ListRulesVariables::new(20));
    assert!(first.settled().await.is_ready());

    let mut second = client.execute::<ListRules>(ListRulesVariables::new(20));
    assert!(second.settled().await.is_ready());
}

#[tokio::test]
async fn skip_cache_bypasses_memoization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(window(vec![], None, false)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut first = client.execute::<ListRules>(ListRulesVariables::new(20));
    assert!(first.settled().await.is_ready());

    let mut second = client
        .execute_with::<ListRules>(ListRulesVariables::new(20), QueryOptions::new().skip_cache());
    assert!(second.settled().await.is_ready());
}

#[tokio::test]
async fn network_only_always_refetches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(window(vec![], None, false)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let options = QueryOptions::new().fetch_policy(FetchPolicy::NetworkOnly);
    let mut first = client.execute_with::<ListRules>(ListRulesVariables::new(20), options.clone());
    assert!(first.settled().await.is_ready());
    let mut second = client.execute_with::<ListRules>(ListRulesVariables::new(20), options);
    assert!(second.settled().await.is_ready());
}

#[tokio::test]
async fn cache_and_network_shows_cached_data_then_refreshes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(window(vec![rule("r1", "stale", "Alice", &[])], None, false)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(150))
                .set_body_json(window(vec![rule("r1", "fresh", "Alice", &[])], None, false)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut warmup = client.execute::<ListRules>(ListRulesVariables::new(20));
    assert!(warmup.settled().await.is_ready());

    let mut handle = client.execute_with::<ListRules>(
        ListRulesVariables::new(20),
        QueryOptions::new().fetch_policy(FetchPolicy::CacheAndNetwork),
    );

    // The memoized window is visible while the refresh is on the wire.
    let QueryState::Ready(cached) = handle.settled().await else {
        panic!("expected the cached window");
    };
    assert_eq!(cached.rules.rules[0].summary, "stale");

    tokio::time::sleep(Duration::from_millis(400)).await;
    let QueryState::Ready(fresh) = handle.state() else {
        panic!("expected the refreshed window");
    };
    assert_eq!(fresh.rules.rules[0].summary, "fresh");
}

#[tokio::test]
async fn dropped_observer_still_populates_the_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(100))
                .set_body_json(window(vec![rule("r1", "s", "Alice", &[])], None, false)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let handle = client.execute::<ListRules>(ListRulesVariables::new(20));
    drop(handle);

    // The request completes without anyone listening...
    tokio::time::sleep(Duration::from_millis(400)).await;

    // ...and a later identical execution resolves from the cache.
    let mut second = client.execute::<ListRules>(ListRulesVariables::new(20));
    assert!(second.settled().await.is_ready());
}

#[tokio::test]
async fn refetch_reissues_over_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(window(vec![], None, false)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut handle = client.execute::<ListRules>(ListRulesVariables::new(20));
    assert!(handle.settled().await.is_ready());

    handle.refetch();
    // Pending again, then settled again.
    let state = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match handle.changed().await {
                Some(state) if state.is_settled() => break state,
                Some(_) => continue,
                None => panic!("channel closed mid-refetch"),
            }
        }
    })
    .await
    .expect("refetch must settle");
    assert!(state.is_ready());
}

#[tokio::test]
async fn polling_reissues_on_a_timer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(window(vec![], None, false)),
        )
        .expect(2..)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let handle = client.execute_with::<ListRules>(
        ListRulesVariables::new(20),
        QueryOptions::new()
            .fetch_policy(FetchPolicy::NetworkOnly)
            .poll_interval(Duration::from_millis(50)),
    );

    tokio::time::sleep(Duration::from_millis(220)).await;
    drop(handle);
}

#[tokio::test]
async fn prepared_query_fetches_only_when_invoked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(window(vec![], None, false)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let prepared = client.prepare::<ListRules>();

    // Nothing is on the wire until the prepared query is invoked.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut handle = prepared.execute(ListRulesVariables::new(20));
    assert!(handle.settled().await.is_ready());
}

#[tokio::test]
async fn mutation_returns_typed_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"operationName": "RuleCreate"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"createRule": {
                "id": "r9",
                "summary": "No loud music after ten",
                "detail": null,
                "created": "2024-06-01T10:00:00Z",
            }},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let data = client
        .mutate::<CreateRule>(CreateRuleVariables::new("No loud music after ten"))
        .await
        .unwrap();
    assert_eq!(data.create_rule.id, "r9");
    assert_eq!(data.create_rule.detail, None);
}

#[tokio::test]
async fn evict_all_clears_memoized_queries_after_a_mutation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"operationName": "RuleCreate"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"createRule": {"id": "r9", "summary": "s", "created": "now"}},
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"operationName": "RulesList"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(window(vec![], None, false)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = QueryClient::builder(format!("{}/query", server.uri()))
        .mutation_cache_policy(MutationCachePolicy::EvictAll)
        .build()
        .unwrap();

    let mut first = client.execute::<ListRules>(ListRulesVariables::new(20));
    assert!(first.settled().await.is_ready());

    client
        .mutate::<CreateRule>(CreateRuleVariables::new("s"))
        .await
        .unwrap();

    // The memoized window was evicted, so this goes to the network again.
    let mut second = client.execute::<ListRules>(ListRulesVariables::new(20));
    assert!(second.settled().await.is_ready());
}

#[tokio::test]
async fn normalized_cache_accumulates_identified_entities() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"rules": {"pageInfo": empty_page_info(), "rules": [{
                "__typename": "Rule",
                "id": "r1",
                "summary": "No shoes indoors",
                "user": {"name": "Alice"},
                "likes": {"pageInfo": empty_page_info(), "users": []},
            }]}},
        })))
        .mount(&server)
        .await;

    let cache = decree_client::NormalizedCache::new();
    let client = QueryClient::builder(format!("{}/query", server.uri()))
        .normalized_cache(cache.clone())
        .build()
        .unwrap();

    let mut handle = client.execute::<ListRules>(ListRulesVariables::new(20));
    assert!(handle.settled().await.is_ready());

    // The entity is now resolvable by identity, without a round trip.
    assert_eq!(
        cache.field("Rule", "r1", "summary"),
        Some(json!("No shoes indoors"))
    );
}
