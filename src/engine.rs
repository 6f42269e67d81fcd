// ==============================================================================
// engine.rs — AUTOMATIC TRANSMISSION + RPM MODEL
// ------------------------------------------------------------------------------
// Gear is a pure function of planar speed (no hysteresis):
//
//     < 30 km/h → 1,  < 60 → 2,  < 90 → 3,  < 120 → 4,  else 5
//
// Each gear also owns a speed band that is wider than its shift window, so the
// ratio inside the band overlaps at the shift points:
//
//     1: [0,40]  2: [30,70]  3: [60,100]  4: [90,130]  5: [120,200]
//
//     ratio      = (speed - min) / (max - min)          (unclamped)
//     target_rpm = IDLE + ratio * (REDLINE - IDLE)
//
// A revving launch floors the target at 3000 rpm in first gear below 10 km/h
// while throttle is held. The actual rpm approaches max(IDLE, target) with
// first-order exponential smoothing at 5 /s, which stays stable for any dt.
// ==============================================================================

use serde::Serialize;

pub const IDLE_RPM: f32 = 1000.0;
pub const REDLINE_RPM: f32 = 10000.0;
pub const LAUNCH_RPM: f32 = 3000.0;
pub const LAUNCH_SPEED_KMH: f32 = 10.0;
pub const RPM_RESPONSE: f32 = 5.0; // 1/s

pub const TOP_GEAR: u8 = 5;
const UPSHIFT_KMH: [f32; 4] = [30.0, 60.0, 90.0, 120.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GearBand {
    pub min_kmh: f32,
    pub max_kmh: f32,
}

pub const GEAR_BANDS: [GearBand; TOP_GEAR as usize] = [
    GearBand { min_kmh: 0.0, max_kmh: 40.0 },
    GearBand { min_kmh: 30.0, max_kmh: 70.0 },
    GearBand { min_kmh: 60.0, max_kmh: 100.0 },
    GearBand { min_kmh: 90.0, max_kmh: 130.0 },
    GearBand { min_kmh: 120.0, max_kmh: 200.0 },
];

impl GearBand {
    pub fn for_gear(gear: u8) -> GearBand {
        let i = gear.clamp(1, TOP_GEAR) as usize - 1;
        GEAR_BANDS[i]
    }

    /// Position of `speed_kmh` inside the band. A collapsed band reads as 0.
    pub fn ratio(&self, speed_kmh: f32) -> f32 {
        let width = self.max_kmh - self.min_kmh;
        if !(width > 0.0) {
            return 0.0;
        }
        (speed_kmh - self.min_kmh) / width
    }
}

pub fn gear_for_speed(speed_kmh: f32) -> u8 {
    if !speed_kmh.is_finite() {
        return 1;
    }
    UPSHIFT_KMH.iter().take_while(|&&shift| speed_kmh >= shift).count() as u8 + 1
}

pub fn target_rpm(gear: u8, speed_kmh: f32, throttle: bool) -> f32 {
    let band = GearBand::for_gear(gear);
    let target = IDLE_RPM + band.ratio(speed_kmh) * (REDLINE_RPM - IDLE_RPM);
    if throttle && gear == 1 && speed_kmh < LAUNCH_SPEED_KMH {
        target.max(LAUNCH_RPM)
    } else {
        target
    }
}

/// Fraction of the remaining gap closed over `dt` at `rate` per second.
#[inline]
pub fn smoothing_alpha(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

/// Engine telemetry written once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineState {
    pub rpm: f32,
    pub gear: u8,
    pub speed_kmh: f32,
}

impl Default for EngineState {
    fn default() -> Self {
        Self { rpm: IDLE_RPM, gear: 1, speed_kmh: 0.0 }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Engine {
    state: EngineState,
}

impl Engine {
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Shift for the current speed and move rpm toward its target.
    pub fn update(&mut self, speed_kmh: f32, throttle: bool, dt: f32) -> EngineState {
        let gear = gear_for_speed(speed_kmh);
        let target = target_rpm(gear, speed_kmh, throttle).max(IDLE_RPM);
        self.state.rpm += (target - self.state.rpm) * smoothing_alpha(RPM_RESPONSE, dt);
        self.state.gear = gear;
        self.state.speed_kmh = speed_kmh;
        self.state
    }

    /// Unridden: the engine settles to idle whatever the wheels are doing.
    pub fn idle(&mut self, speed_kmh: f32, dt: f32) -> EngineState {
        self.state.rpm += (IDLE_RPM - self.state.rpm) * smoothing_alpha(RPM_RESPONSE, dt);
        self.state.gear = gear_for_speed(speed_kmh);
        self.state.speed_kmh = speed_kmh;
        self.state
    }
}
