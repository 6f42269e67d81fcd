// ==============================================================================
// dynamics.rs — ARCADE BIKE DYNAMICS (ONE TICK)
// ------------------------------------------------------------------------------
// Converts (controls, terrain, setup, body velocity, dt) into:
// - engine telemetry (rpm / gear / speed) via engine.rs
// - an updated heading (yaw is integrated here, never simulated by torque)
// - a horizontal force along the heading, applied at the chassis center
// - optionally a direct velocity override (handbrake)
//
// Pipeline:
//   1) effective surface:  tires modify terrain drag/traction (no clamping)
//   2) planar speed:       |(vx, vz)|, vertical velocity ignored
//   3) engine:             gear from speed, rpm eased toward target
//   4) steering:           heading += steer * dt * max(0.5, 2.5 - kmh/80)
//   5) drive force:        throttle < brake < handbrake, later modes overwrite
//   6) resistance:         terrain drag + air resistance, against the signed
//                          speed along the heading
//
// update() is pure apart from the DriveState it is handed; the caller applies
// the returned force / velocity to whatever rigid body backs the bike.
// ==============================================================================

use crate::config::{TireKind, VehicleConfig};
use crate::engine::{Engine, EngineState};
use crate::input::InputSnapshot;
use crate::terrain::TerrainState;
use nalgebra::Vector3;
use serde::Serialize;

pub const MS_TO_KMH: f32 = 3.6;
pub const TOP_SPEED_KMH: f32 = 180.0;

pub const DRIVE_FORCE: f32 = 1200.0;       // N at full traction
pub const GEAR_FORCE_PENALTY: f32 = 50.0;  // N per gear
pub const BRAKE_FORCE: f32 = 1250.0;       // N
pub const REVERSE_FORCE: f32 = 300.0;      // N, creep below BRAKE_MIN_KMH
pub const REVERSE_MAX_KMH: f32 = 15.0;     // creep stops pushing past this
pub const BRAKE_MIN_KMH: f32 = 1.0;        // forward speed needed to brake
pub const HANDBRAKE_SCALE: f32 = 0.9;      // per-tick horizontal velocity scale
pub const TERRAIN_DRAG_COEFF: f32 = 300.0; // N per (m/s * drag)
pub const AIR_DRAG_COEFF: f32 = 2.0;       // N per km/h

pub const STEER_MIN_KMH: f32 = 0.5;
pub const STEER_MIN_SENSITIVITY: f32 = 0.5;

/// Surface after tire adjustment. Values may leave [0,1] on purpose.
pub fn effective_surface(terrain: TerrainState, tires: TireKind) -> TerrainState {
    let mut traction = terrain.traction;
    let mut drag = terrain.drag;

    match tires {
        TireKind::Offroad => {
            if terrain.traction < 0.8 {
                traction += 0.2;
            }
            if terrain.drag > 0.0 {
                drag *= 0.6;
            }
        }
        TireKind::Street => {
            if terrain.traction < 0.8 {
                traction -= 0.1;
            }
        }
    }

    TerrainState { drag, traction }
}

#[inline]
pub fn planar_speed(velocity: &Vector3<f32>) -> f32 {
    (velocity.x * velocity.x + velocity.z * velocity.z).sqrt()
}

/// Unit forward vector on the ground plane for a yaw angle.
#[inline]
pub fn heading_forward(heading: f32) -> Vector3<f32> {
    Vector3::new(heading.sin(), 0.0, heading.cos())
}

/// rad/s of yaw per unit steer; authority falls off with speed.
pub fn steer_sensitivity(speed_kmh: f32) -> f32 {
    (2.5 - speed_kmh / 80.0).max(STEER_MIN_SENSITIVITY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveMode {
    Coast,
    Throttle,
    Brake,
    Reverse,
    Handbrake,
}

pub struct DriveInput<'a> {
    pub controls: &'a InputSnapshot,
    pub terrain: TerrainState,
    pub vehicle: &'a VehicleConfig,
    pub velocity: Vector3<f32>,
    pub dt: f32,
}

/// State the dynamics model owns across ticks.
#[derive(Debug, Clone, Default)]
pub struct DriveState {
    pub heading: f32, // rad
    pub engine: Engine,
}

impl DriveState {
    /// rpm / gear follow from speed on the next tick, so only yaw is zeroed.
    pub fn reset(&mut self) {
        self.heading = 0.0;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DriveOutput {
    pub mode: DriveMode,
    pub surface: TerrainState,
    pub engine: EngineState,
    pub heading: f32,
    /// Force chosen by the active drive mode, before resistance.
    pub drive_force: f32,
    /// Terrain drag + air resistance, opposing the motion along the heading.
    pub resistance: f32,
    /// drive_force + resistance, along the heading.
    pub longitudinal_force: f32,
    /// World-space force to apply at the chassis center (y is always 0).
    pub force: Vector3<f32>,
    /// Velocity to write directly into the body this tick.
    pub velocity_override: Option<Vector3<f32>>,
    /// Throttle position forwarded to the engine sound (0..1).
    pub load: f32,
}

/// Advance one tick. Returns None for a non-positive or non-finite dt.
pub fn update(state: &mut DriveState, input: &DriveInput) -> Option<DriveOutput> {
    let dt = input.dt;
    if !(dt > 0.0) || !dt.is_finite() {
        return None;
    }

    let controls = input.controls;
    let surface = effective_surface(input.terrain, input.vehicle.tires);

    let speed_kmh = planar_speed(&input.velocity) * MS_TO_KMH;

    // ------------------------------------------------------------
    // Engine
    // ------------------------------------------------------------
    let engine = state.engine.update(speed_kmh, controls.forward, dt);

    // ------------------------------------------------------------
    // Steering (yaw integration)
    // ------------------------------------------------------------
    if speed_kmh > STEER_MIN_KMH {
        state.heading += controls.steer() * dt * steer_sensitivity(speed_kmh);
    }

    // ------------------------------------------------------------
    // drive force: later modes overwrite earlier ones
    // ------------------------------------------------------------
    let forward = heading_forward(state.heading);
    let long_ms = input.velocity.dot(&forward); // negative while rolling backwards
    let long_kmh = long_ms * MS_TO_KMH;

    let mut mode = DriveMode::Coast;
    let mut drive_force = 0.0;
    let mut velocity_override = None;

    if controls.forward && speed_kmh < TOP_SPEED_KMH {
        let power = input.vehicle.suspension.power_multiplier();
        drive_force = DRIVE_FORCE * power * surface.traction
            - engine.gear as f32 * GEAR_FORCE_PENALTY;
        mode = DriveMode::Throttle;
    }

    if controls.backward {
        if long_kmh > BRAKE_MIN_KMH {
            drive_force = -BRAKE_FORCE;
            mode = DriveMode::Brake;
        } else {
            drive_force = if -long_kmh < REVERSE_MAX_KMH { -REVERSE_FORCE } else { 0.0 };
            mode = DriveMode::Reverse;
        }
    }

    if controls.handbrake {
        drive_force = 0.0;
        mode = DriveMode::Handbrake;
        let v = input.velocity;
        velocity_override = Some(Vector3::new(v.x * HANDBRAKE_SCALE, v.y, v.z * HANDBRAKE_SCALE));
    }

    // ------------------------------------------------------------
    // Resistance. The handbrake tick replaces force integration with the
    // velocity override, so nothing is applied on top of it.
    // ------------------------------------------------------------
    let mut resistance = 0.0;
    if mode != DriveMode::Handbrake {
        if surface.drag > 0.0 {
            resistance -= long_ms * TERRAIN_DRAG_COEFF * surface.drag;
        }
        resistance -= long_kmh * AIR_DRAG_COEFF;
    }

    let longitudinal_force = drive_force + resistance;
    let force = forward * longitudinal_force;

    Some(DriveOutput {
        mode,
        surface,
        engine,
        heading: state.heading,
        drive_force,
        resistance,
        longitudinal_force,
        force: Vector3::new(force.x, 0.0, force.z),
        velocity_override,
        load: controls.throttle(),
    })
}
