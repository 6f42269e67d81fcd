//! Crate-wide error type.
//!
//! The per-tick numeric core never fails; errors only come from loading
//! configuration and from customization requests made at the wrong time.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid body color {0:?} (expected #rrggbb)")]
    InvalidColor(String),

    /// Garage changes are only accepted while the bike is parked or unmounted.
    #[error("cannot customize the bike while driving ({speed_kmh:.1} km/h)")]
    CustomizeWhileDriving { speed_kmh: f32 },
}

pub type Result<T> = std::result::Result<T, SimError>;
