use lendbase_api::{ApiConfig, ApiError, CallContext, RestConnector, Transport};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: server.uri(),
        api_key: "test_key".to_string(),
        max_attempts: 3,
        retry_backoff_ms: 1,
        ..Default::default()
    }
}

// ── Success paths ───────────────────────────────────────────────

#[tokio::test]
async fn get_parses_the_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients/abc"))
        .and(header("apikey", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"encodedKey": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let connector = RestConnector::new(mock_config(&server));
    let body = connector
        .get("clients/abc", &[], &CallContext::new())
        .await
        .unwrap();
    assert_eq!(body, json!({"encodedKey": "abc"}));
}

#[tokio::test]
async fn query_parameters_are_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients"))
        .and(query_param("detailsLevel", "FULL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let connector = RestConnector::new(mock_config(&server));
    let query = vec![("detailsLevel".to_string(), "FULL".to_string())];
    let body = connector
        .get("clients", &query, &CallContext::new())
        .await
        .unwrap();
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn post_sends_the_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/clients"))
        .and(body_json(json!({"firstName": "Ada"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"encodedKey": "new"})))
        .expect(1)
        .mount(&server)
        .await;

    let connector = RestConnector::new(mock_config(&server));
    let body = connector
        .post("clients", &[], &json!({"firstName": "Ada"}), &CallContext::new())
        .await
        .unwrap();
    assert_eq!(body["encodedKey"], "new");
}

#[tokio::test]
async fn empty_success_bodies_become_null() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/clients/abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let connector = RestConnector::new(mock_config(&server));
    connector
        .delete("clients/abc", &CallContext::new())
        .await
        .unwrap();
}

// ── Transient failures ──────────────────────────────────────────

#[tokio::test]
async fn persistent_unavailability_exhausts_exactly_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients/abc"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let connector = RestConnector::new(mock_config(&server));
    let err = connector
        .get("clients/abc", &[], &CallContext::new())
        .await
        .unwrap_err();

    match err {
        ApiError::Communication { attempts, reason } => {
            assert_eq!(attempts, 3);
            assert!(reason.contains("503"));
        }
        other => panic!("expected a communication failure, got {other}"),
    }
}

#[tokio::test]
async fn persistent_unavailability_bounds_mutating_verbs_too() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/clients"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/clients/abc"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let connector = RestConnector::new(mock_config(&server));
    let err = connector
        .post("clients", &[], &json!({"firstName": "Ada"}), &CallContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Communication { attempts: 3, .. }));

    let err = connector
        .patch("clients/abc", &json!([]), &CallContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Communication { attempts: 3, .. }));
}

#[tokio::test]
async fn a_transient_failure_followed_by_success_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients/abc"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clients/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let connector = RestConnector::new(mock_config(&server));
    let body = connector
        .get("clients/abc", &[], &CallContext::new())
        .await
        .unwrap();
    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn an_expired_deadline_prevents_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let connector = RestConnector::new(mock_config(&server));
    let ctx = CallContext::with_deadline(Duration::ZERO);
    let err = connector.get("clients/abc", &[], &ctx).await.unwrap_err();
    assert!(matches!(err, ApiError::DeadlineExceeded));
}

// ── Non-transient failures are never retried ────────────────────

#[tokio::test]
async fn malformed_success_bodies_fail_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json {"))
        .expect(1)
        .mount(&server)
        .await;

    let connector = RestConnector::new(mock_config(&server));
    let err = connector
        .get("clients/abc", &[], &CallContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::MalformedResponse(_)));
}

#[tokio::test]
async fn structured_error_bodies_become_business_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/clients"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"errorCode": 301, "errorReason": "INVALID_STATE_TRANSITION"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = RestConnector::new(mock_config(&server));
    let err = connector
        .post("clients", &[], &Value::Null, &CallContext::new())
        .await
        .unwrap_err();

    match err {
        ApiError::Business { code, reason } => {
            assert_eq!(code, "301");
            assert_eq!(reason, "INVALID_STATE_TRANSITION");
        }
        other => panic!("expected a business error, got {other}"),
    }
}

#[tokio::test]
async fn unstructured_error_bodies_keep_the_status_and_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients/abc"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let connector = RestConnector::new(mock_config(&server));
    let err = connector
        .get("clients/abc", &[], &CallContext::new())
        .await
        .unwrap_err();

    match err {
        ApiError::Business { code, reason } => {
            assert_eq!(code, "500");
            assert_eq!(reason, "boom");
        }
        other => panic!("expected a business error, got {other}"),
    }
}

#[tokio::test]
async fn missing_resources_map_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let connector = RestConnector::new(mock_config(&server));
    let err = connector
        .get("clients/ghost", &[], &CallContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(p) if p == "clients/ghost"));
}
