//! HTTP source tests against a mock xkcd server

mod common;

use comics_elt::extract::Discovery;
use comics_elt::source::{ComicSource, FetchOutcome, SourceError, XkcdClient};
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn client(server: &MockServer) -> XkcdClient {
    XkcdClient::new(server.uri(), Duration::from_secs(5)).expect("Client should build")
}

#[tokio::test]
async fn test_fetch_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/614/info.0.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::comic_body(614, "Woodpecker")))
        .mount(&server)
        .await;

    match client(&server).fetch(614).await.expect("Fetch should succeed") {
        FetchOutcome::Found(record) => {
            assert_eq!(record.num(), 614);
            assert_eq!(record.title(), Some("Woodpecker"));
        },
        other => panic!("Expected a record, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/9999/info.0.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let outcome = client(&server).fetch(9999).await.expect("404 is not an error");
    assert_eq!(outcome, FetchOutcome::NotFound { status: 404 });
}

#[tokio::test]
async fn test_fetch_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/5/info.0.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server).fetch(5).await.unwrap_err();
    assert!(matches!(err, SourceError::Decode { num: 5, .. }));
}

#[tokio::test]
async fn test_fetch_missing_required_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/6/info.0.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"num": 6})))
        .mount(&server)
        .await;

    assert!(matches!(
        client(&server).fetch(6).await,
        Err(SourceError::Decode { num: 6, .. })
    ));
}

#[tokio::test]
async fn test_fetch_timeout_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::comic_body(1, "Slow"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = XkcdClient::new(server.uri(), Duration::from_millis(200)).expect("Client should build");
    assert!(matches!(
        client.fetch(1).await,
        Err(SourceError::Transport { num: 1, .. })
    ));
}

#[tokio::test]
async fn test_discovery_over_http_stops_at_first_404() {
    let server = MockServer::start().await;
    for num in 1..=2 {
        Mock::given(method("GET"))
            .and(path(format!("/{}/info.0.json", num)))
            .respond_with(ResponseTemplate::new(200).set_body_json(common::comic_body(num, "Test")))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/3/info.0.json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let records = Discovery::new(&client, 1, 404).collect_all().await;

    assert_eq!(records.iter().map(|r| r.num()).collect::<Vec<_>>(), vec![1, 2]);
}
