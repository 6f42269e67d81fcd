// ==============================================================================
// telemetry.rs — ENGINE READOUT + ENGINE SOUND SINK
// ------------------------------------------------------------------------------
// Telemetry keeps the last engine state for gauges; readers get a copy.
//
// EngineSound is the audio capability the session talks to once per riding
// tick. It is fire-and-forget: nothing it does can feed back into physics.
// NullEngineSound is the default (headless / tests). ToneEngineSound keeps
// a sawtooth oscillator model a client can render:
//
//     frequency = 60 + rpm / 12000 * 150            Hz
//     volume    = 0.05 + load * 0.1 + rpm / 30000
//
// each approaching its target with a 0.1 s time constant.
// ==============================================================================

use crate::engine::{EngineState, REDLINE_RPM};
use serde::Serialize;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineReadout {
    pub rpm: f32,
    pub gear: u8,
    pub speed_kmh: i32,
    pub engine_running: bool,
    /// Needle position for the rev counter, 0..1.
    pub rpm_fraction: f32,
}

impl From<EngineState> for EngineReadout {
    fn from(s: EngineState) -> Self {
        Self {
            rpm: s.rpm,
            gear: s.gear,
            speed_kmh: s.speed_kmh.floor() as i32,
            engine_running: true,
            rpm_fraction: (s.rpm / REDLINE_RPM).clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Telemetry {
    latest: EngineReadout,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self { latest: EngineState::default().into() }
    }
}

impl Telemetry {
    pub fn publish(&mut self, state: EngineState) {
        self.latest = state.into();
    }

    pub fn latest(&self) -> EngineReadout {
        self.latest
    }
}

// ---------------------------------------------
// ENGINE SOUND
// ---------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineTone {
    pub frequency_hz: f32,
    pub volume: f32,
}

pub trait EngineSound: Send {
    fn start(&mut self);

    /// `load` is the throttle position, 0..1.
    fn update(&mut self, rpm: f32, load: f32, dt: f32);

    /// Current tone, if this sink renders one.
    fn tone(&self) -> Option<EngineTone> {
        None
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullEngineSound;

impl EngineSound for NullEngineSound {
    fn start(&mut self) {}
    fn update(&mut self, _rpm: f32, _load: f32, _dt: f32) {}
}

pub const TONE_TIME_CONSTANT: f32 = 0.1; // s

#[derive(Debug, Clone, Default)]
pub struct ToneEngineSound {
    started: bool,
    tone: Option<EngineTone>,
}

impl ToneEngineSound {
    pub fn target(rpm: f32, load: f32) -> EngineTone {
        EngineTone {
            frequency_hz: 60.0 + (rpm / 12000.0) * 150.0,
            volume: 0.05 + load * 0.1 + rpm / 30000.0,
        }
    }
}

impl EngineSound for ToneEngineSound {
    fn start(&mut self) {
        if !self.started {
            self.started = true;
            trace!("engine sound started");
        }
    }

    fn update(&mut self, rpm: f32, load: f32, dt: f32) {
        if !self.started {
            return;
        }
        let target = Self::target(rpm, load);
        let current = self.tone.unwrap_or(EngineTone { frequency_hz: target.frequency_hz, volume: 0.0 });
        let alpha = 1.0 - (-dt.max(0.0) / TONE_TIME_CONSTANT).exp();
        self.tone = Some(EngineTone {
            frequency_hz: current.frequency_hz + (target.frequency_hz - current.frequency_hz) * alpha,
            volume: current.volume + (target.volume - current.volume) * alpha,
        });
    }

    fn tone(&self) -> Option<EngineTone> {
        self.tone
    }
}
