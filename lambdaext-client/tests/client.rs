//! Integration tests for the Extensions API client
//!
//! These tests run the client against the in-process mock Extensions API.

use lambdaext_client::{ApiConfig, ExtensionsApi, ExtensionsApiClient};
use lambdaext_core::api::{EXIT_ERROR_PATH, INIT_ERROR_PATH, REGISTER_PATH};
use lambdaext_core::{
    ErrorType, EventType, ExtensionError, ExtensionId, Operation, ProtocolError,
};
use lambdaext_test::MockServer;

const EVENTS: [EventType; 2] = [EventType::Invoke, EventType::Shutdown];

fn client_for(server: &MockServer) -> ExtensionsApiClient {
    ExtensionsApiClient::new(&ApiConfig::new(server.runtime_api())).unwrap()
}

#[tokio::test]
async fn test_register_returns_identifier_from_header() {
    let server = MockServer::builder()
        .extension_id("0d2bd13d-1b66-4c1e-8f8b-4c44a0f7d1b3")
        .start()
        .await
        .unwrap();
    let client = client_for(&server);

    let registration = client.register("my-extension", &EVENTS).await.unwrap();

    assert_eq!(
        registration.id.as_str(),
        "0d2bd13d-1b66-4c1e-8f8b-4c44a0f7d1b3"
    );
    assert_eq!(registration.function.function_name, "mock-function");
    assert_eq!(registration.function.function_version, "$LATEST");

    let requests = server.requests_to(REGISTER_PATH).await;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.header("Lambda-Extension-Name"), Some("my-extension"));
    assert_eq!(request.header("Content-Type"), Some("application/json"));

    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body, serde_json::json!({"events": ["INVOKE", "SHUTDOWN"]}));
}

#[tokio::test]
async fn test_register_without_identifier_is_an_error() {
    let server = MockServer::builder().without_identifier().start().await.unwrap();
    let client = client_for(&server);

    let err = client.register("my-extension", &EVENTS).await.unwrap_err();
    assert!(matches!(
        err,
        ExtensionError::Protocol(ProtocolError::MissingIdentifier)
    ));
}

#[tokio::test]
async fn test_register_rejected_reports_status() {
    let server = MockServer::builder()
        .reject_registration(403)
        .start()
        .await
        .unwrap();
    let client = client_for(&server);

    let err = client.register("my-extension", &EVENTS).await.unwrap_err();
    match err {
        ExtensionError::Protocol(ProtocolError::UnexpectedStatus {
            operation, status, ..
        }) => {
            assert_eq!(operation, Operation::Register);
            assert_eq!(status, 403);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_register_against_closed_port_is_transport_error() {
    // Grab a free port, then let it go so nothing is listening there.
    let addr = {
        let server = MockServer::builder().start().await.unwrap();
        server.runtime_api()
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = ExtensionsApiClient::new(&ApiConfig::new(addr)).unwrap();
    let err = client.register("my-extension", &EVENTS).await.unwrap_err();
    assert!(matches!(
        err,
        ExtensionError::Transport {
            operation: Operation::Register,
            ..
        }
    ));
}

#[tokio::test]
async fn test_next_event_returns_body_and_sends_identifier() {
    let server = MockServer::builder()
        .extension_id("ext-1")
        .event(r#"{"eventType":"INVOKE","foo":1}"#)
        .start()
        .await
        .unwrap();
    let client = client_for(&server);
    let id = ExtensionId::new("ext-1").unwrap();

    let body = client.next_event(&id).await.unwrap();
    assert_eq!(&body[..], br#"{"eventType":"INVOKE","foo":1}"#);

    let requests = server.requests_to("/event/next").await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].header("Lambda-Extension-Identifier"), Some("ext-1"));
}

#[tokio::test]
async fn test_next_event_non_200_is_protocol_error() {
    let server = MockServer::builder()
        .response(500, "internal")
        .start()
        .await
        .unwrap();
    let client = client_for(&server);
    let id = ExtensionId::new("ext-1").unwrap();

    match client.next_event(&id).await.unwrap_err() {
        ExtensionError::Protocol(ProtocolError::UnexpectedStatus {
            operation,
            status,
            body,
        }) => {
            assert_eq!(operation, Operation::NextEvent);
            assert_eq!(status, 500);
            assert_eq!(body, "internal");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_next_event_is_not_cached() {
    let server = MockServer::builder()
        .event(r#"{"eventType":"INVOKE","requestId":"a"}"#)
        .event(r#"{"eventType":"INVOKE","requestId":"b"}"#)
        .start()
        .await
        .unwrap();
    let client = client_for(&server);
    let id = ExtensionId::new("ext-1").unwrap();

    let first = client.next_event(&id).await.unwrap();
    let second = client.next_event(&id).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(server.next_event_calls().await, 2);
}

#[tokio::test]
async fn test_report_init_error_sends_headers() {
    let server = MockServer::builder().start().await.unwrap();
    let client = client_for(&server);
    let id = ExtensionId::new("ext-1").unwrap();

    let status = client
        .report_init_error(&id, &ErrorType::InitFailed)
        .await
        .unwrap();
    assert_eq!(status.status, "OK");

    let requests = server.requests_to(INIT_ERROR_PATH).await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert!(requests[0].body.is_empty());
    assert_eq!(requests[0].header("Lambda-Extension-Identifier"), Some("ext-1"));
    assert_eq!(
        requests[0].header("Lambda-Extension-Function-Error-Type"),
        Some("Extension.InitFailed")
    );
}

#[tokio::test]
async fn test_report_exit_error_rejected() {
    let server = MockServer::builder().error_status(400).start().await.unwrap();
    let client = client_for(&server);
    let id = ExtensionId::new("ext-1").unwrap();

    let err = client
        .report_exit_error(&id, &ErrorType::from("Extension.Crashed"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExtensionError::Protocol(ProtocolError::UnexpectedStatus {
            operation: Operation::ExitError,
            status: 400,
            ..
        })
    ));

    let requests = server.requests_to(EXIT_ERROR_PATH).await;
    assert_eq!(
        requests[0].header("Lambda-Extension-Function-Error-Type"),
        Some("Extension.Crashed")
    );
}
