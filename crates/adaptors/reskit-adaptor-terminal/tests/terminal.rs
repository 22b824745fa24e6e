//! Terminal driver against a scripted Socket.IO peer

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures_util::{SinkExt, StreamExt};
use mockall::mock;
use reskit_adaptor_terminal::{Route, Terminal, TerminalConfig};
use reskit_core::*;
use reskit_provider_live::LiveConfig;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message as Frame};
use url::Url;

mock! {
    pub Api {}

    #[async_trait]
    impl ResearchApi for Api {
        async fn profile(&self) -> Result<User>;
        async fn login(&self, request: LoginRequest) -> Result<AuthResponse>;
        async fn register(&self, request: RegisterRequest) -> Result<AuthResponse>;
        async fn logout(&self) -> Result<()>;
        async fn projects(&self) -> Result<Vec<Project>>;
        async fn project(&self, id: &ProjectId) -> Result<Project>;
        async fn create_project(&self, name: &str) -> Result<Project>;
        async fn search(&self, query: &str, category: SearchCategory) -> Result<SearchResponse>;
        async fn upload(&self, project: &ProjectId, file: FileUpload) -> Result<UploadReceipt>;
        async fn send_message(&self, request: SendMessageRequest) -> Result<SendReceipt>;
        async fn read_messages(
            &self,
            project: &ProjectId,
            after: Option<NaiveDateTime>,
        ) -> Result<Vec<Message>>;
    }
}

const OPEN: &str = r#"0{"sid":"s1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;

/// Accept one websocket and relay its text frames both ways
async fn fake_server() -> (
    Url,
    mpsc::UnboundedSender<String>,
    mpsc::UnboundedReceiver<String>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (to_client, mut outgoing) = mpsc::unbounded_channel::<String>();
    let (incoming, from_client) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(ws) = accept_async(stream).await else {
            return;
        };
        let (mut sink, mut source) = ws.split();
        loop {
            tokio::select! {
                frame = outgoing.recv() => match frame {
                    Some(f) => {
                        if sink.send(Frame::Text(f)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                msg = source.next() => match msg {
                    Some(Ok(Frame::Text(t))) => {
                        let _ = incoming.send(t);
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                },
            }
        }
    });

    let url = Url::parse(&format!("ws://{}/socket.io/?EIO=4&transport=websocket", addr)).unwrap();
    (url, to_client, from_client)
}

async fn expect(from_client: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(Duration::from_secs(2), from_client.recv())
        .await
        .expect("frame in time")
        .expect("peer still open")
}

fn api() -> MockApi {
    let mut api = MockApi::new();
    api.expect_profile()
        .returning(|| Ok(serde_json::from_value(json!({"id": "u1", "username": "ada"})).unwrap()));
    api.expect_projects()
        .returning(|| Ok(vec![serde_json::from_value(json!({"id": 1, "name": "Graphs"})).unwrap()]));
    api.expect_read_messages().returning(|_, _| Ok(vec![]));
    api
}

#[tokio::test]
async fn test_shutdown_leaves_room_and_closes_channel() {
    let (url, to_client, mut from_client) = fake_server().await;
    let terminal = Terminal::new(
        Arc::new(api()),
        Session::in_memory(Some("tok")),
        LiveConfig {
            socket_url: url,
            connect_timeout: Duration::from_secs(2),
            reconnect: true,
            reconnect_delay: Duration::from_millis(50),
            max_reconnect_delay: Duration::from_millis(200),
        },
        TerminalConfig::default(),
    );
    let (_lines_tx, lines) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let script = async move {
        to_client.send(OPEN.to_string()).unwrap();
        assert_eq!(expect(&mut from_client).await, "40");
        to_client.send(r#"40{"sid":"n1"}"#.to_string()).unwrap();
        assert_eq!(expect(&mut from_client).await, r#"42["join",{"projectId":1}]"#);

        stop_tx.send(()).unwrap();
        assert_eq!(expect(&mut from_client).await, r#"42["leave",{"projectId":1}]"#);
        assert_eq!(expect(&mut from_client).await, "41");
    };
    let stop = async {
        let _ = stop_rx.await;
    };

    let (result, ()) = tokio::join!(
        timeout(
            Duration::from_secs(5),
            terminal.run_with(Route::project(Id::Numeric(1)), lines, stop)
        ),
        script
    );
    assert!(result.expect("terminal stops in time").is_ok());
}
