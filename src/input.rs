// ==============================================================================
// input.rs — PER-TICK CONTROL INTENTS
// ------------------------------------------------------------------------------
// InputSnapshot is the only thing the simulation sees of the player's devices:
// seven independent booleans, rebuilt every tick and never mutated inside it.
//
// KeyboardState folds raw key press/release events (DOM-style codes such as
// "KeyW" or "Space") into a snapshot through a KeyScheme. Both deployed schemes
// map onto the same seven intents; the core never looks at key codes.
// Every press is also latched until the tick loop takes its snapshot, so a tap
// whose press and release land between two ticks still reaches the sim.
//
// EdgeDetector turns a held intent into a one-shot rising edge, used to gate
// the mount toggle against a key being held across many ticks.
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Logical control intents for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSnapshot {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub handbrake: bool,
    pub reset: bool,
    pub interact: bool,
}

impl InputSnapshot {
    pub fn throttle(&self) -> f32 {
        if self.forward { 1.0 } else { 0.0 }
    }

    /// +1 steers left, -1 right. Left wins when both are held.
    pub fn steer(&self) -> f32 {
        if self.left {
            1.0
        } else if self.right {
            -1.0
        } else {
            0.0
        }
    }

    pub fn set(&mut self, intent: Intent) {
        match intent {
            Intent::Forward => self.forward = true,
            Intent::Backward => self.backward = true,
            Intent::Left => self.left = true,
            Intent::Right => self.right = true,
            Intent::Handbrake => self.handbrake = true,
            Intent::Reset => self.reset = true,
            Intent::Interact => self.interact = true,
        }
    }

    pub fn union(self, other: InputSnapshot) -> InputSnapshot {
        InputSnapshot {
            forward: self.forward || other.forward,
            backward: self.backward || other.backward,
            left: self.left || other.left,
            right: self.right || other.right,
            handbrake: self.handbrake || other.handbrake,
            reset: self.reset || other.reset,
            interact: self.interact || other.interact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Forward,
    Backward,
    Left,
    Right,
    Handbrake,
    Reset,
    Interact,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScheme {
    /// W/S/A/D, Space handbrake, R reset, F interact.
    #[default]
    Wasd,
    /// Y/H/G/J, Space handbrake, R reset, K interact.
    Yghj,
}

impl KeyScheme {
    pub fn intent_for(&self, code: &str) -> Option<Intent> {
        let intent = match (self, code) {
            (_, "Space") => Intent::Handbrake,
            (_, "KeyR") => Intent::Reset,

            (KeyScheme::Wasd, "KeyW") => Intent::Forward,
            (KeyScheme::Wasd, "KeyS") => Intent::Backward,
            (KeyScheme::Wasd, "KeyA") => Intent::Left,
            (KeyScheme::Wasd, "KeyD") => Intent::Right,
            (KeyScheme::Wasd, "KeyF") => Intent::Interact,

            (KeyScheme::Yghj, "KeyY") => Intent::Forward,
            (KeyScheme::Yghj, "KeyH") => Intent::Backward,
            (KeyScheme::Yghj, "KeyG") => Intent::Left,
            (KeyScheme::Yghj, "KeyJ") => Intent::Right,
            (KeyScheme::Yghj, "KeyK") => Intent::Interact,

            _ => return None,
        };
        Some(intent)
    }
}

/// Collects key events between ticks.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    scheme: KeyScheme,
    held: HashSet<String>,
    /// intents pressed since the last take_snapshot
    latched: InputSnapshot,
}

impl KeyboardState {
    pub fn new(scheme: KeyScheme) -> Self {
        Self { scheme, held: HashSet::new(), latched: InputSnapshot::default() }
    }

    pub fn scheme(&self) -> KeyScheme {
        self.scheme
    }

    /// Returns false for codes the scheme does not map.
    pub fn key_event(&mut self, code: &str, pressed: bool) -> bool {
        let Some(intent) = self.scheme.intent_for(code) else {
            return false;
        };
        if pressed {
            self.latched.set(intent);
            self.held.insert(code.to_string());
        } else {
            self.held.remove(code);
        }
        true
    }

    pub fn release_all(&mut self) {
        self.held.clear();
        self.latched = InputSnapshot::default();
    }

    /// Keys held right now.
    pub fn snapshot(&self) -> InputSnapshot {
        let mut s = InputSnapshot::default();
        for intent in self.held.iter().filter_map(|code| self.scheme.intent_for(code)) {
            s.set(intent);
        }
        s
    }

    /// Held keys plus anything pressed since the previous call. Call once per tick.
    pub fn take_snapshot(&mut self) -> InputSnapshot {
        let s = self.snapshot().union(self.latched);
        self.latched = InputSnapshot::default();
        s
    }
}

/// Rising-edge detector for a boolean intent.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector {
    last: bool,
}

impl EdgeDetector {
    /// True only on the tick where `level` goes from false to true.
    pub fn rising(&mut self, level: bool) -> bool {
        let edge = level && !self.last;
        self.last = level;
        edge
    }
}
