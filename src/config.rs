//! Vehicle setup and simulation configuration (TOML).
//!
//! Every section defaults, so an empty or missing file runs the stock scene.

use crate::error::{Result, SimError};
use crate::input::KeyScheme;
use crate::terrain::ZoneKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------
// VEHICLE SETUP (garage)
// ---------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TireKind {
    /// Fast on road, slippy on mud.
    Street,
    /// Max grip in mud, stable.
    #[default]
    Offroad,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuspensionKind {
    #[default]
    Soft,
    Stiff,
}

impl SuspensionKind {
    pub fn power_multiplier(&self) -> f32 {
        match self {
            SuspensionKind::Soft => 1.0,
            SuspensionKind::Stiff => 1.1,
        }
    }
}

/// Display-only paint color, `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BodyColor(String);

impl BodyColor {
    pub const PALETTE: [&'static str; 7] = [
        "#f97316", "#ef4444", "#3b82f6", "#22c55e", "#a855f7", "#000000", "#ffffff",
    ];

    pub fn parse(s: &str) -> Result<Self> {
        let hex = s.strip_prefix('#').ok_or_else(|| SimError::InvalidColor(s.to_string()))?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SimError::InvalidColor(s.to_string()));
        }
        Ok(Self(format!("#{}", hex.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BodyColor {
    fn default() -> Self {
        Self(Self::PALETTE[0].to_string())
    }
}

impl TryFrom<String> for BodyColor {
    type Error = SimError;
    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<BodyColor> for String {
    fn from(c: BodyColor) -> String {
        c.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub tires: TireKind,
    pub suspension: SuspensionKind,
    pub color: BodyColor,
}

/// Partial garage update; unset fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Customization {
    pub tires: Option<TireKind>,
    pub suspension: Option<SuspensionKind>,
    pub color: Option<String>,
}

impl VehicleConfig {
    pub fn customized(&self, change: &Customization) -> Result<VehicleConfig> {
        let mut next = self.clone();
        if let Some(tires) = change.tires {
            next.tires = tires;
        }
        if let Some(suspension) = change.suspension {
            next.suspension = suspension;
        }
        if let Some(color) = &change.color {
            next.color = BodyColor::parse(color)?;
        }
        Ok(next)
    }
}

// ---------------------------------------------
// SIMULATION CONFIG
// ---------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPolicyKind {
    #[default]
    Smoothed,
    Rigid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub tick_hz: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:9001".to_string(), tick_hz: 60 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub scheme: KeyScheme,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub policy: CameraPolicyKind,
    pub distance: f32, // m behind the bike
    pub height: f32,   // m above the bike
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { policy: CameraPolicyKind::Smoothed, distance: 8.0, height: 3.5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub kind: ZoneKind,
    pub center: [f32; 3],
    pub half_extents: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub spawn: [f32; 3],
    pub character_spawn: [f32; 3],
    pub zones: Vec<ZoneConfig>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            spawn: [0.0, 2.0, 0.0],
            character_spawn: [2.0, 5.0, 2.0],
            zones: vec![
                ZoneConfig { kind: ZoneKind::Mud, center: [10.0, 0.05, 10.0], half_extents: [7.5, 0.05, 10.0] },
                ZoneConfig { kind: ZoneKind::Mud, center: [-50.0, 0.05, -20.0], half_extents: [10.0, 0.05, 10.0] },
                ZoneConfig { kind: ZoneKind::Water, center: [-40.0, 0.02, 0.0], half_extents: [7.5, 0.25, 50.0] },
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub server: ServerConfig,
    pub controls: ControlsConfig,
    pub camera: CameraConfig,
    pub vehicle: VehicleConfig,
    pub world: WorldConfig,
}

impl SimConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self> {
        let config: SimConfig = toml::from_str(text).map_err(|source| SimError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// A missing file is not an error: the stock scene is used.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| SimError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.tick_hz == 0 {
            return Err(SimError::InvalidConfig("server.tick_hz must be > 0".into()));
        }
        if !(self.camera.distance > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "camera.distance must be > 0, got {}",
                self.camera.distance
            )));
        }
        for (i, zone) in self.world.zones.iter().enumerate() {
            if zone.half_extents.iter().any(|e| !(*e > 0.0)) {
                return Err(SimError::InvalidConfig(format!(
                    "world.zones[{i}] half_extents must all be > 0"
                )));
            }
        }
        Ok(())
    }

    pub fn tick_dt(&self) -> f32 {
        1.0 / self.server.tick_hz as f32
    }
}
