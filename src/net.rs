use std::sync::Arc;
use futures::{StreamExt, SinkExt};
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tungstenite::Message;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use motozen_physics::config::Customization;
use motozen_physics::input::InputSnapshot;

use crate::state::{ServerMessage, SharedServerState};

/// Everything a client may send, tagged by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Ping,
    /// Raw key event, DOM `KeyboardEvent.code` style ("KeyW", "Space").
    Key { code: String, pressed: bool },
    /// Whole control snapshot for clients that map keys themselves.
    Input(InputSnapshot),
    Customize(Customization),
}

impl ClientMessage {
    pub fn from_json(txt: &str) -> Option<Self> {
        match serde_json::from_str(txt) {
            Ok(msg) => Some(msg),
            Err(err) => {
                debug!(%err, "ignoring malformed client message");
                None
            }
        }
    }
}

pub async fn start_websocket_server(listener: TcpListener, state: Arc<Mutex<SharedServerState>>) {
    match listener.local_addr() {
        Ok(addr) => info!("🌐 WebSocket listening on ws://{}", addr),
        Err(err) => warn!(%err, "WebSocket listening on unknown address"),
    }

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(%err, "accept failed");
                continue;
            }
        };
        let state_clone = Arc::clone(&state);

        tokio::spawn(async move {
            debug!(%peer, "tcp connection");
            handle_client(raw, state_clone).await;
        });
    }
}

async fn handle_client(raw: TcpStream, state: Arc<Mutex<SharedServerState>>) {
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!(%err, "websocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing message channel
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let client_id = Uuid::new_v4();

    let scheme = {
        let mut server = state.lock().await;
        server.register_client(client_id, tx.clone());
        server.keyboard.scheme()
    };

    // -------------------------------
    // 2) Send loop
    // -------------------------------
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    info!(client = %client_id, "🟢 client connected");

    if let Some(welcome) = (ServerMessage::Welcome { client_id, scheme }).to_json() {
        let _ = tx.send(welcome);
    }

    // -------------------------------
    // 3) Receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(err) => {
                debug!(client = %client_id, %err, "read error");
                break;
            }
        };

        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }
        let text = match msg.to_text() {
            Ok(t) => t,
            Err(_) => continue,
        };

        let Some(parsed) = ClientMessage::from_json(text) else {
            continue;
        };

        match parsed {
            ClientMessage::Ping => {
                if let Some(pong) = ServerMessage::Pong.to_json() {
                    let _ = tx.send(pong);
                }
            }
            ClientMessage::Key { code, pressed } => {
                let mapped = state.lock().await.key_event(&code, pressed);
                if !mapped {
                    debug!(client = %client_id, code = %code, "unmapped key");
                }
            }
            ClientMessage::Input(input) => {
                state.lock().await.set_input(input);
            }
            ClientMessage::Customize(change) => {
                // applied by the tick loop, which owns the session
                state.lock().await.pending_customizations.push((client_id, change));
            }
        }
    }

    info!(client = %client_id, "🔴 client disconnected");
    state.lock().await.remove_client(&client_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use motozen_physics::config::TireKind;

    #[test]
    fn parses_every_message_kind() {
        assert!(matches!(ClientMessage::from_json(r#"{"type":"ping"}"#), Some(ClientMessage::Ping)));

        match ClientMessage::from_json(r#"{"type":"key","code":"KeyW","pressed":true}"#) {
            Some(ClientMessage::Key { code, pressed }) => {
                assert_eq!(code, "KeyW");
                assert!(pressed);
            }
            other => panic!("unexpected {other:?}"),
        }

        match ClientMessage::from_json(r#"{"type":"input","forward":true,"handbrake":true}"#) {
            Some(ClientMessage::Input(input)) => {
                assert!(input.forward && input.handbrake && !input.left);
            }
            other => panic!("unexpected {other:?}"),
        }

        match ClientMessage::from_json(r#"{"type":"customize","tires":"street"}"#) {
            Some(ClientMessage::Customize(change)) => {
                assert_eq!(change.tires, Some(TireKind::Street));
                assert!(change.color.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_and_malformed() {
        assert!(ClientMessage::from_json(r#"{"type":"teleport"}"#).is_none());
        assert!(ClientMessage::from_json("not json").is_none());
        assert!(ClientMessage::from_json(r#"{"type":"key","code":"KeyW"}"#).is_none());
    }
}
