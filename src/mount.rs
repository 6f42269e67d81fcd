// ==============================================================================
// mount.rs — RIDING / WALKING GATE
// ------------------------------------------------------------------------------
// Exactly one of {bike, character} consumes locomotion input at a time.
//
//   Riding  --interact edge, d < 3--------------->  Walking
//   Walking --interact edge, d < 3, can_mount---->  Riding
//
// The same gesture toggles both ways, so the toggle fires only on the rising
// edge of `interact`: holding the key near the bike never flips state twice.
// can_mount gates getting on; getting off is always allowed within range.
// ==============================================================================

use crate::input::EdgeDetector;
use nalgebra::Vector3;
use serde::Serialize;

pub const MOUNT_RADIUS: f32 = 3.0; // m
/// Where the character is placed on a toggle.
pub const TOGGLE_OFFSET: [f32; 3] = [0.0, 2.0, 0.0];
/// Where the character is pinned each tick while riding.
pub const RIDING_PIN_OFFSET: [f32; 3] = [0.0, 1.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MountState {
    Riding,
    Walking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountTransition {
    Mounted,
    Dismounted,
}

#[derive(Debug, Clone)]
pub struct MountController {
    state: MountState,
    can_mount: bool,
    interact: EdgeDetector,
}

impl Default for MountController {
    fn default() -> Self {
        Self { state: MountState::Riding, can_mount: true, interact: EdgeDetector::default() }
    }
}

impl MountController {
    pub fn state(&self) -> MountState {
        self.state
    }

    pub fn set_can_mount(&mut self, can_mount: bool) {
        self.can_mount = can_mount;
    }

    /// Feed one tick of the interact intent plus both positions.
    pub fn update(
        &mut self,
        interact: bool,
        character: &Vector3<f32>,
        vehicle: &Vector3<f32>,
    ) -> Option<MountTransition> {
        if !self.interact.rising(interact) {
            return None;
        }

        let in_range = (character - vehicle).norm() < MOUNT_RADIUS;
        if !in_range {
            return None;
        }

        match self.state {
            MountState::Riding => {
                self.state = MountState::Walking;
                Some(MountTransition::Dismounted)
            }
            MountState::Walking if self.can_mount => {
                self.state = MountState::Riding;
                Some(MountTransition::Mounted)
            }
            MountState::Walking => None,
        }
    }
}

pub fn toggle_position(vehicle: &Vector3<f32>) -> Vector3<f32> {
    vehicle + Vector3::from(TOGGLE_OFFSET)
}

pub fn riding_pin(vehicle: &Vector3<f32>) -> Vector3<f32> {
    vehicle + Vector3::from(RIDING_PIN_OFFSET)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Vector3<f32> {
        Vector3::zeros()
    }

    #[test]
    fn starts_riding() {
        let m = MountController::default();
        assert_eq!(m.state(), MountState::Riding);
    }

    #[test]
    fn held_interact_toggles_once() {
        let mut m = MountController::default();
        let near = Vector3::new(0.0, 1.0, 0.0);
        assert_eq!(m.update(true, &near, &origin()), Some(MountTransition::Dismounted));
        for _ in 0..30 {
            assert_eq!(m.update(true, &near, &origin()), None);
        }
        assert_eq!(m.state(), MountState::Walking);

        assert_eq!(m.update(false, &near, &origin()), None);
        assert_eq!(m.update(true, &near, &origin()), Some(MountTransition::Mounted));
        assert_eq!(m.state(), MountState::Riding);
    }

    #[test]
    fn out_of_range_does_nothing() {
        let mut m = MountController::default();
        let far = Vector3::new(3.0, 0.0, 0.0);
        assert_eq!(m.update(true, &far, &origin()), None);
        assert_eq!(m.state(), MountState::Riding);
    }

    #[test]
    fn press_started_out_of_range_does_not_fire_on_arrival() {
        let mut m = MountController::default();
        m.update(true, &Vector3::new(10.0, 0.0, 0.0), &origin());
        assert_eq!(m.update(true, &Vector3::new(1.0, 0.0, 0.0), &origin()), None);
    }

    #[test]
    fn can_mount_gates_only_getting_on() {
        let mut m = MountController::default();
        m.set_can_mount(false);
        let near = Vector3::new(1.0, 0.0, 0.0);
        assert_eq!(m.update(true, &near, &origin()), Some(MountTransition::Dismounted));
        m.update(false, &near, &origin());
        assert_eq!(m.update(true, &near, &origin()), None);
        assert_eq!(m.state(), MountState::Walking);
    }

    #[test]
    fn offsets() {
        let bike = Vector3::new(4.0, 0.5, -2.0);
        assert_eq!(toggle_position(&bike), Vector3::new(4.0, 2.5, -2.0));
        assert_eq!(riding_pin(&bike), Vector3::new(4.0, 1.5, -2.0));
    }
}
