use motozen_physics::config::Customization;
use motozen_physics::input::{InputSnapshot, KeyScheme, KeyboardState};
use motozen_physics::Snapshot;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};
use uuid::Uuid;

/// Where this tick's controls come from. A client that sends whole
/// snapshots takes over from the shared keyboard until it sends a key again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Keyboard,
    Direct(InputSnapshot),
}

/// State shared between the tick loop and the websocket tasks.
/// All clients drive the same rider.
pub struct SharedServerState {
    pub tick: u64,
    pub clients: HashMap<Uuid, UnboundedSender<String>>,
    pub keyboard: KeyboardState,
    pub source: InputSource,
    pub pending_customizations: Vec<(Uuid, Customization)>,
}

impl SharedServerState {
    pub fn new(scheme: KeyScheme) -> Self {
        Self {
            tick: 0,
            clients: HashMap::new(),
            keyboard: KeyboardState::new(scheme),
            source: InputSource::Keyboard,
            pending_customizations: Vec::new(),
        }
    }

    pub fn register_client(&mut self, id: Uuid, tx: UnboundedSender<String>) {
        self.clients.insert(id, tx);
    }

    /// Last client gone: drop held keys so the bike does not drive away.
    pub fn remove_client(&mut self, id: &Uuid) {
        self.clients.remove(id);
        self.pending_customizations.retain(|(owner, _)| owner != id);
        if self.clients.is_empty() {
            self.keyboard.release_all();
            self.source = InputSource::Keyboard;
        }
    }

    pub fn key_event(&mut self, code: &str, pressed: bool) -> bool {
        self.source = InputSource::Keyboard;
        self.keyboard.key_event(code, pressed)
    }

    pub fn set_input(&mut self, input: InputSnapshot) {
        self.source = InputSource::Direct(input);
    }

    /// Controls for the coming tick. Clears the keyboard's tap latch, so the
    /// tick loop calls this exactly once per tick.
    pub fn take_controls(&mut self) -> InputSnapshot {
        let keys = self.keyboard.take_snapshot();
        match self.source {
            InputSource::Keyboard => keys,
            InputSource::Direct(input) => input,
        }
    }

    pub fn take_customizations(&mut self) -> Vec<(Uuid, Customization)> {
        std::mem::take(&mut self.pending_customizations)
    }

    pub fn send_to(&self, id: &Uuid, text: String) {
        if let Some(tx) = self.clients.get(id) {
            let _ = tx.send(text);
        }
    }

    /// Serialize once and fan out to every client.
    pub fn broadcast_snapshot(&self, snapshot: &Snapshot) {
        if self.clients.is_empty() {
            return;
        }

        let json = match serde_json::to_string(&ServerMessage::Snapshot(snapshot)) {
            Ok(json) => json,
            Err(err) => {
                error!(tick = snapshot.tick, %err, "snapshot serialization failed");
                return;
            }
        };

        for (id, tx) in &self.clients {
            if tx.send(json.clone()).is_err() {
                debug!(client = %id, "send channel closed");
            }
        }
    }
}

/// Everything the server sends, tagged by `type`.
#[derive(serde::Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage<'a> {
    Welcome { client_id: Uuid, scheme: KeyScheme },
    Pong,
    Snapshot(&'a Snapshot),
    Customized { vehicle: &'a motozen_physics::VehicleConfig },
    Error { message: String },
}

impl ServerMessage<'_> {
    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(err) => {
                error!(%err, "failed to serialize server message");
                None
            }
        }
    }
}
