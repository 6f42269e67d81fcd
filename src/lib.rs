//! Arcade off-road bike simulation core.
//!
//! The numeric pieces (`input`, `terrain`, `engine`, `dynamics`, `camera`,
//! `mount`, `character`, `telemetry`) are plain functions and small state
//! structs with no I/O. `world` bridges them to a rapier3d rigid-body world and
//! `session` drives one tick of everything in a fixed order.

pub mod camera;
pub mod character;
pub mod config;
pub mod dynamics;
pub mod engine;
pub mod error;
pub mod input;
pub mod mount;
pub mod session;
pub mod telemetry;
pub mod terrain;
pub mod world;

pub use config::{Customization, SimConfig, VehicleConfig};
pub use error::{Result, SimError};
pub use input::InputSnapshot;
pub use session::{Session, Snapshot};
