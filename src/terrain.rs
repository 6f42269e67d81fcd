// ==============================================================================
// terrain.rs — SURFACE DRAG / TRACTION UNDER THE BIKE
// ------------------------------------------------------------------------------
// Trigger volumes (mud pits, water) contribute a (drag, traction) pair while
// the bike chassis is inside them. Rather than a single global cell where the
// last enter/exit event wins, every active zone keeps its own contribution and
// the surface the dynamics model sees is the reduction:
//
//     drag     = max(drag_i)      (neutral 0)
//     traction = min(traction_i)  (neutral 1)
//
// so overlapping zones never silently cancel each other, and leaving one zone
// of an overlap restores the other instead of snapping to neutral.
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainState {
    pub drag: f32,     // 0 = normal, 1 = stuck
    pub traction: f32, // 1 = normal, 0.5 = slippery
}

impl TerrainState {
    pub const NEUTRAL: TerrainState = TerrainState { drag: 0.0, traction: 1.0 };

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

impl Default for TerrainState {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Mud,
    Water,
}

impl ZoneKind {
    pub fn surface(&self) -> TerrainState {
        match self {
            ZoneKind::Mud => TerrainState { drag: 0.8, traction: 0.4 },
            ZoneKind::Water => TerrainState { drag: 0.5, traction: 0.6 },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneKind::Mud => "mud",
            ZoneKind::Water => "water",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ZoneId(pub u32);

/// Arena of zones the chassis currently overlaps.
#[derive(Debug, Clone, Default)]
pub struct TerrainEffects {
    active: BTreeMap<ZoneId, TerrainState>,
}

impl TerrainEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-entering an already active zone just refreshes its contribution.
    pub fn enter(&mut self, id: ZoneId, surface: TerrainState) {
        self.active.insert(id, surface);
    }

    pub fn exit(&mut self, id: ZoneId) -> bool {
        self.active.remove(&id).is_some()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn active_zones(&self) -> usize {
        self.active.len()
    }

    pub fn current(&self) -> TerrainState {
        self.active.values().fold(TerrainState::NEUTRAL, |acc, s| TerrainState {
            drag: acc.drag.max(s.drag),
            traction: acc.traction.min(s.traction),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_neutral() {
        let t = TerrainEffects::new();
        assert!(t.current().is_neutral());
        assert_eq!(t.active_zones(), 0);
    }

    #[test]
    fn single_zone_applies_its_surface() {
        let mut t = TerrainEffects::new();
        t.enter(ZoneId(1), ZoneKind::Mud.surface());
        assert_eq!(t.current(), TerrainState { drag: 0.8, traction: 0.4 });
    }

    #[test]
    fn overlap_takes_worst_of_each() {
        let mut t = TerrainEffects::new();
        t.enter(ZoneId(1), TerrainState { drag: 0.5, traction: 0.3 });
        t.enter(ZoneId(2), TerrainState { drag: 0.8, traction: 0.6 });
        assert_eq!(t.current(), TerrainState { drag: 0.8, traction: 0.3 });
    }

    #[test]
    fn leaving_one_overlap_keeps_the_other() {
        let mut t = TerrainEffects::new();
        t.enter(ZoneId(1), ZoneKind::Mud.surface());
        t.enter(ZoneId(2), ZoneKind::Water.surface());
        assert!(t.exit(ZoneId(1)));
        assert_eq!(t.current(), ZoneKind::Water.surface());
        assert!(t.exit(ZoneId(2)));
        assert!(t.current().is_neutral());
    }

    #[test]
    fn exit_of_unknown_zone_is_ignored() {
        let mut t = TerrainEffects::new();
        assert!(!t.exit(ZoneId(7)));
        assert!(t.current().is_neutral());
    }
}
