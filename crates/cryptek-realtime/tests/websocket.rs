//! End-to-end tests against a local WebSocket server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cryptek_realtime::{events, ConnectionManager, ManagerConfig};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const WAIT: Duration = Duration::from_secs(5);

struct Accepted {
    query: String,
    ws: WebSocketStream<TcpStream>,
}

/// Accept WebSocket connections forever, handing each to the test.
async fn spawn_server() -> (String, mpsc::UnboundedReceiver<Accepted>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let query = Arc::new(Mutex::new(String::new()));
            let captured = Arc::clone(&query);
            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                *captured.lock().unwrap() = req.uri().query().unwrap_or_default().to_string();
                Ok(resp)
            };
            if let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await {
                let query = query.lock().unwrap().clone();
                if tx.send(Accepted { query, ws }).is_err() {
                    break;
                }
            }
        }
    });

    (url, rx)
}

fn manager(url: &str) -> ConnectionManager {
    ConnectionManager::new(ManagerConfig {
        reconnect_delay: Duration::from_millis(50),
        ..ManagerConfig::with_url(url)
    })
}

async fn wait_until(cond: impl Fn() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> Value {
    loop {
        let frame = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("frame in time")
            .expect("stream open")
            .expect("valid frame");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn exchanges_events_with_server() {
    let (url, mut accepted) = spawn_server().await;
    let manager = manager(&url);

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    manager.on(events::NEW_MESSAGE, move |p| sink.lock().unwrap().push(p.clone()));

    manager.connect("0xabc");
    let mut conn = tokio::time::timeout(WAIT, accepted.recv()).await.unwrap().unwrap();
    assert_eq!(conn.query, "address=0xabc");
    wait_until(|| manager.is_connected()).await;

    let inbound = json!({"type": "new_message", "payload": {"id": "m1", "chatId": "c1"}});
    conn.ws
        .send(Message::Text(inbound.to_string().into()))
        .await
        .unwrap();
    conn.ws.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();
    let log = Arc::clone(&received);
    wait_until(|| !log.lock().unwrap().is_empty()).await;
    assert_eq!(received.lock().unwrap()[0]["id"], json!("m1"));

    assert!(manager.send(events::JOIN_CHAT, json!({"chatId": "c1"})));
    assert_eq!(
        next_text(&mut conn.ws).await,
        json!({"type": "join_chat", "payload": {"chatId": "c1"}})
    );

    manager.disconnect();
    assert!(!manager.is_connected());
}

#[tokio::test]
async fn server_close_triggers_reconnect() {
    let (url, mut accepted) = spawn_server().await;
    let manager = manager(&url);

    let disconnected = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&disconnected);
    manager.on(events::DISCONNECTED, move |p| sink.lock().unwrap().push(p.clone()));

    manager.connect("0xabc");
    let mut first = tokio::time::timeout(WAIT, accepted.recv()).await.unwrap().unwrap();
    wait_until(|| manager.is_connected()).await;

    first.ws.close(None).await.unwrap();

    let second = tokio::time::timeout(WAIT, accepted.recv()).await.unwrap().unwrap();
    assert_eq!(second.query, "address=0xabc");
    wait_until(|| manager.is_connected()).await;

    let events = disconnected.lock().unwrap().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["willReconnect"], json!(true));
    assert_eq!(events[0]["attempt"], json!(1));
    assert_eq!(manager.reconnect_attempts(), 0);
}

#[tokio::test]
async fn server_initiated_close_is_acknowledged() {
    let (url, mut accepted) = spawn_server().await;
    let manager = manager(&url);

    manager.connect("0xabc");
    let mut conn = tokio::time::timeout(WAIT, accepted.recv()).await.unwrap().unwrap();
    wait_until(|| manager.is_connected()).await;

    conn.ws.close(None).await.unwrap();

    // The client answers with its own close frame before dropping the socket.
    let reply = tokio::time::timeout(WAIT, conn.ws.next()).await.unwrap();
    assert!(matches!(reply, Some(Ok(Message::Close(_)))), "{reply:?}");

    manager.disconnect();
}

#[tokio::test]
async fn explicit_disconnect_closes_the_socket() {
    let (url, mut accepted) = spawn_server().await;
    let manager = manager(&url);

    manager.connect("0xabc");
    let mut conn = tokio::time::timeout(WAIT, accepted.recv()).await.unwrap().unwrap();
    wait_until(|| manager.is_connected()).await;

    manager.disconnect();

    // The server sees a close frame (or the stream ending), never a reconnect.
    let end = tokio::time::timeout(WAIT, conn.ws.next()).await.unwrap();
    assert!(matches!(end, None | Some(Ok(Message::Close(_))) | Some(Err(_))));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(accepted.try_recv().is_err());
}
