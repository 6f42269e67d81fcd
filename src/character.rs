//! On-foot locomotion while the rider is off the bike.

use crate::dynamics::heading_forward;
use crate::input::InputSnapshot;
use nalgebra::Vector3;
use std::f32::consts::FRAC_PI_2;

pub const WALK_SPEED: f32 = 5.0; // m/s

/// Camera-relative walking velocity. Vertical velocity is left to gravity.
pub fn walk_velocity(controls: &InputSnapshot, camera_yaw: f32, vertical: f32) -> Vector3<f32> {
    let along = controls.forward as i8 as f32 - controls.backward as i8 as f32;
    let side = controls.left as i8 as f32 - controls.right as i8 as f32;

    let dir = heading_forward(camera_yaw) * along + heading_forward(camera_yaw + FRAC_PI_2) * side;
    let planar = match dir.try_normalize(1e-6) {
        Some(d) => d * WALK_SPEED,
        None => Vector3::zeros(),
    };

    Vector3::new(planar.x, vertical, planar.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn idle_keeps_only_vertical() {
        let v = walk_velocity(&InputSnapshot::default(), 0.3, -1.5);
        assert_eq!(v, Vector3::new(0.0, -1.5, 0.0));
    }

    #[test]
    fn forward_walks_where_the_camera_looks() {
        let controls = InputSnapshot { forward: true, ..Default::default() };
        let v = walk_velocity(&controls, PI, 0.0);
        assert!(v.x.abs() < 1e-4);
        assert!((v.z + WALK_SPEED).abs() < 1e-4);
    }

    #[test]
    fn diagonal_is_not_faster() {
        let controls = InputSnapshot { forward: true, left: true, ..Default::default() };
        let v = walk_velocity(&controls, 0.0, 0.0);
        assert!((Vector3::new(v.x, 0.0, v.z).norm() - WALK_SPEED).abs() < 1e-4);
    }

    #[test]
    fn opposite_keys_cancel() {
        let controls = InputSnapshot { forward: true, backward: true, ..Default::default() };
        let v = walk_velocity(&controls, 1.0, 0.0);
        assert!(v.x.abs() < 1e-6 && v.z.abs() < 1e-6);
    }
}
