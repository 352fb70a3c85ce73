use super::*;
use assert_matches::assert_matches;
use mockito::Matcher;
use sidecar_models::RpcErrorKind;

fn client_with_timeout(timeout: Duration) -> RpcClient {
    RpcClient::new(RpcConfig {
        port: DEFAULT_RPC_PORT,
        timeout,
    })
    .unwrap()
}

#[tokio::test]
async fn test_validated_ledger_top_level_fields() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::Json(json!({
            "method": "ledger",
            "params": [{ "ledger_index": "validated" }]
        })))
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"result": {"ledger_index": 1234, "ledger_hash": "ABCD", "validated": true, "status": "success"}}"#,
        )
        .create_async()
        .await;

    let client = client_with_timeout(Duration::from_secs(2));
    let node = NodeId::new(server.url());
    let ledger = client.validated_ledger(&node).await.unwrap();
    assert_eq!(ledger.ledger_index, 1234);
    assert_eq!(ledger.ledger_hash, "ABCD");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_validated_ledger_nested_string_index() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_body(
            r#"{"result": {"ledger": {"ledger_index": "77", "ledger_hash": "EF01"}, "status": "success"}}"#,
        )
        .create_async()
        .await;

    let client = client_with_timeout(Duration::from_secs(2));
    let ledger = client
        .validated_ledger(&NodeId::new(server.url()))
        .await
        .unwrap();
    assert_eq!(
        ledger,
        LedgerInfo {
            ledger_index: 77,
            ledger_hash: "EF01".to_string()
        }
    );
}

#[tokio::test]
async fn test_server_info() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .match_body(Matcher::Json(json!({ "method": "server_info" })))
        .with_body(
            r#"{"result": {"info": {"server_state": "proposing", "complete_ledgers": "2-99"}, "status": "success"}}"#,
        )
        .create_async()
        .await;

    let client = client_with_timeout(Duration::from_secs(2));
    let info = client
        .server_info(&NodeId::new(server.url()))
        .await
        .unwrap();
    assert_eq!(info.server_state, ServerState::Proposing);
    assert_eq!(info.complete_ledgers, "2-99");
    assert!(info.is_synced());
}

#[tokio::test]
async fn test_node_error_is_protocol_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_body(
            r#"{"result": {"error": "lgrNotFound", "error_message": "ledgerNotFound", "status": "error"}}"#,
        )
        .create_async()
        .await;

    let client = client_with_timeout(Duration::from_secs(2));
    let err = client
        .validated_ledger(&NodeId::new(server.url()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, RpcErrorKind::ProtocolError);
    assert!(err.message.contains("lgrNotFound"));
}

#[tokio::test]
async fn test_bad_body_and_status_are_protocol_errors() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_body("this is not json")
        .create_async()
        .await;
    let client = client_with_timeout(Duration::from_secs(2));
    let node = NodeId::new(server.url());
    assert_matches!(
        client.validated_ledger(&node).await,
        Err(RpcError {
            kind: RpcErrorKind::ProtocolError,
            ..
        })
    );

    server.reset_async().await;
    server
        .mock("POST", "/")
        .with_status(503)
        .create_async()
        .await;
    assert_matches!(
        client.server_info(&node).await,
        Err(RpcError {
            kind: RpcErrorKind::ProtocolError,
            ..
        })
    );
}

#[tokio::test]
async fn test_refused_connection_is_unreachable() {
    // grab a free port and release it so nothing listens there
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = client_with_timeout(Duration::from_secs(2));
    let err = client
        .validated_ledger(&NodeId::new(format!("127.0.0.1:{}", port)))
        .await
        .unwrap_err();
    assert_eq!(err.kind, RpcErrorKind::Unreachable);
}

#[tokio::test]
async fn test_silent_node_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let holder = tokio::spawn(async move {
        // accept and never answer
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let client = client_with_timeout(Duration::from_millis(200));
    let err = client
        .validated_ledger(&NodeId::new(addr.to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, RpcErrorKind::Timeout);
    holder.abort();
}

#[test]
fn test_parse_validated_ledger_missing_hash() {
    let err = parse_validated_ledger(&json!({ "ledger_index": 5 })).unwrap_err();
    assert_eq!(err.kind, RpcErrorKind::ProtocolError);
}
