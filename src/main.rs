mod net;
mod state;

use crate::net::start_websocket_server;
use crate::state::{ServerMessage, SharedServerState};

use anyhow::Context;
use clap::Parser;
use motozen_physics::telemetry::ToneEngineSound;
use motozen_physics::{Session, SimConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "motozen-server", about = "Off-road bike simulation server")]
struct Args {
    /// TOML config file. A missing file runs the stock scene.
    #[arg(long, default_value = "motozen.toml")]
    config: PathBuf,

    /// Override `server.bind`.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = SimConfig::load(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    info!(
        config = %args.config.display(),
        bind = %config.server.bind,
        tick_hz = config.server.tick_hz,
        "🚀 Starting bike simulation server"
    );

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("binding websocket port {}", config.server.bind))?;

    let state = Arc::new(Mutex::new(SharedServerState::new(config.controls.scheme)));
    let mut session = Session::new(&config).with_sound(Box::new(ToneEngineSound::default()));

    // Start WebSocket server
    tokio::spawn(start_websocket_server(listener, Arc::clone(&state)));

    // Fixed timestep
    let dt = config.tick_dt();
    let mut ticker = interval(Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let mut server = state.lock().await;

        // Garage changes queued by clients since the last tick
        for (client, change) in server.take_customizations() {
            let reply = match session.customize(&change) {
                Ok(vehicle) => ServerMessage::Customized { vehicle }.to_json(),
                Err(err) => {
                    warn!(client = %client, %err, "customization refused");
                    ServerMessage::Error { message: err.to_string() }.to_json()
                }
            };
            if let Some(reply) = reply {
                server.send_to(&client, reply);
            }
        }

        let controls = server.take_controls();
        let Some(snapshot) = session.tick(&controls, dt) else {
            continue;
        };

        // Advance tick + broadcast snapshot
        server.tick = snapshot.tick;
        server.broadcast_snapshot(&snapshot);
    }
}
