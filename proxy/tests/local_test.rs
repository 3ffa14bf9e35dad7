use botproxy::{ErrorKind, LocalApiProxy, ProxyConfig, ProxyError};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn proxy_for(server: &MockServer) -> LocalApiProxy {
    LocalApiProxy::new(server.uri()).unwrap()
}

#[tokio::test]
async fn get_forwards_query_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("active", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let proxy = proxy_for(&server);
    let query = vec![("active".to_string(), "true".to_string())];
    let users = proxy.get("users", &query).await.unwrap();

    assert_eq!(users, json!([{"id": 1}]));
}

#[tokio::test]
async fn get_without_query_has_no_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let proxy = proxy_for(&server);
    proxy.get("/health", &[]).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].url.query().is_none());
}

#[tokio::test]
async fn post_and_put_send_json_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(body_json(json!({"name": "ada"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 2})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/users/2"))
        .and(body_json(json!({"name": "ada l."})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2, "name": "ada l."})))
        .expect(1)
        .mount(&server)
        .await;

    let proxy = proxy_for(&server);
    let created = proxy.post("users", Some(&json!({"name": "ada"}))).await.unwrap();
    assert_eq!(created, json!({"id": 2}));

    let updated = proxy.put("users/2", Some(&json!({"name": "ada l."}))).await.unwrap();
    assert_eq!(updated["name"], "ada l.");
}

#[tokio::test]
async fn post_and_put_without_payload_send_no_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs/refresh"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"queued": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/jobs/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"touched": true})))
        .expect(1)
        .mount(&server)
        .await;

    let proxy = proxy_for(&server);
    assert_eq!(
        proxy.post("jobs/refresh", None).await.unwrap(),
        json!({"queued": true})
    );
    assert_eq!(
        proxy.put("jobs/refresh", None).await.unwrap(),
        json!({"touched": true})
    );

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
    for request in &received {
        assert!(request.body.is_empty());
        assert!(request.headers.get("content-type").is_none());
    }
}

#[tokio::test]
async fn delete_returns_decoded_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/users/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let proxy = proxy_for(&server);
    assert_eq!(proxy.delete("users/2").await.unwrap(), json!({"deleted": 2}));
}

#[tokio::test]
async fn error_status_is_an_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "nope"})))
        .mount(&server)
        .await;

    let proxy = proxy_for(&server);
    let err = proxy.get("missing", &[]).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Upstream);
    match err {
        ProxyError::Upstream {
            status, endpoint, ..
        } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(endpoint, "missing");
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn proxy_is_reusable_after_an_error_and_closes_cleanly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let proxy = proxy_for(&server);
    assert!(proxy.get("flaky", &[]).await.is_err());
    assert_eq!(proxy.get("ok", &[]).await.unwrap(), json!({"ok": true}));
    proxy.close();
}

#[tokio::test]
async fn from_config_uses_local_api_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("pong")))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let config = ProxyConfig::from_lookup(|name| match name {
        "LOCAL_API_URL" => Some(uri.clone()),
        _ => None,
    })
    .unwrap();

    let proxy = LocalApiProxy::from_config(&config).unwrap();
    assert_eq!(proxy.get("ping", &[]).await.unwrap(), json!("pong"));
}
