use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use mangashot::browser::{debug_endpoint, debug_ws_url};

struct DebugEndpointStub {
    port: u16,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl DebugEndpointStub {
    fn spawn(status: u16, body: &'static str) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start debug endpoint stub");
        let addr = server.server_addr().to_string();
        let port = addr
            .rsplit(':')
            .next()
            .and_then(|port| port.parse().ok())
            .expect("stub listens on a tcp port");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                if request.url() != "/json/version" {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let _ = request.respond(
                    tiny_http::Response::from_string(body)
                        .with_status_code(status)
                        .with_header(header),
                );
            }
        });

        Self {
            port,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for DebugEndpointStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

#[test]
fn endpoint_points_at_json_version() {
    assert_eq!(
        debug_endpoint("192.168.1.20", 9222),
        "http://192.168.1.20:9222/json/version"
    );
}

#[tokio::test]
async fn websocket_url_is_read_from_json_version() -> anyhow::Result<()> {
    let stub = DebugEndpointStub::spawn(
        200,
        r#"{
  "Browser": "Chrome/126.0.6478.127",
  "Protocol-Version": "1.3",
  "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/1c4b7b7b-7b7b-4b7b-7b7b-7b7b7b7b7b7b"
}"#,
    );

    let ws_url = debug_ws_url("127.0.0.1", stub.port).await?;
    assert_eq!(
        ws_url,
        "ws://127.0.0.1:9222/devtools/browser/1c4b7b7b-7b7b-4b7b-7b7b-7b7b7b7b7b7b"
    );

    Ok(())
}

#[tokio::test]
async fn error_status_mentions_remote_debugging() {
    let stub = DebugEndpointStub::spawn(500, "{}");

    let err = debug_ws_url("127.0.0.1", stub.port)
        .await
        .unwrap_err()
        .to_string();
    assert!(err.contains("500"));
    assert!(err.contains("--remote-debugging-port"));
}

#[tokio::test]
async fn missing_websocket_field_is_a_parse_error() {
    let stub = DebugEndpointStub::spawn(200, r#"{"Browser": "Chrome/126"}"#);

    let err = debug_ws_url("127.0.0.1", stub.port).await.unwrap_err();
    assert!(format!("{err:#}").contains("parse http://127.0.0.1:"));
}

#[tokio::test]
async fn unreachable_endpoint_mentions_remote_debugging() {
    let port = closed_port();

    let err = debug_ws_url("127.0.0.1", port).await.unwrap_err().to_string();
    assert!(err.contains(&format!("--remote-debugging-port={port}")));
}
