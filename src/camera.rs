// ==============================================================================
// camera.rs — CHASE / WALKING CAMERA POLICIES
// ------------------------------------------------------------------------------
// A CameraPolicy turns the followed body's pose into a camera pose each tick.
//
// SmoothedFollow: target = bike + R_y(heading) * (0, height, -distance),
//   position eased at 5 /s and look-at eased at 10 /s toward bike + (0,2,0).
//   Lags behind during turns.
// RigidAttached: position = bike - forward(heading) * distance + (0,height,0),
//   look-at = bike + (0,1.5,0), both written directly. No lag.
// WalkingCamera: fixed world offset (0,3,5) from the character, no heading,
//   eased at the rate that matches the walking camera's 0.1-per-frame blend.
//
// All easing uses 1 - exp(-rate * dt), so perceived lag is the same at any
// frame rate.
// ==============================================================================

use crate::config::{CameraConfig, CameraPolicyKind};
use crate::dynamics::heading_forward;
use crate::engine::smoothing_alpha;
use nalgebra::Vector3;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraPose {
    pub position: [f32; 3],
    pub look_at: [f32; 3],
}

impl CameraPose {
    pub fn new(position: Vector3<f32>, look_at: Vector3<f32>) -> Self {
        Self { position: position.into(), look_at: look_at.into() }
    }

    pub fn position(&self) -> Vector3<f32> {
        Vector3::from(self.position)
    }

    pub fn look_at(&self) -> Vector3<f32> {
        Vector3::from(self.look_at)
    }

    /// Yaw of the view direction, same convention as the bike heading
    /// (0 looks down +z, positive turns toward +x).
    pub fn yaw(&self) -> f32 {
        let d = self.look_at() - self.position();
        d.x.atan2(d.z)
    }
}

/// Pose of whatever the camera follows.
#[derive(Debug, Clone, Copy)]
pub struct FollowTarget {
    pub position: Vector3<f32>,
    pub heading: f32,
}

pub trait CameraPolicy: Send {
    fn name(&self) -> &'static str;

    fn update(&mut self, target: &FollowTarget, dt: f32) -> CameraPose;

    /// Jump straight to the resting pose (spawn, reset, focus change).
    fn snap(&mut self, target: &FollowTarget) -> CameraPose;
}

pub fn chase_policy(config: &CameraConfig) -> Box<dyn CameraPolicy> {
    match config.policy {
        CameraPolicyKind::Smoothed => Box::new(SmoothedFollow::new(config.distance, config.height)),
        CameraPolicyKind::Rigid => Box::new(RigidAttached::new(config.distance, config.height)),
    }
}

#[inline]
fn ease(from: Vector3<f32>, to: Vector3<f32>, alpha: f32) -> Vector3<f32> {
    from + (to - from) * alpha
}

/// Offset behind a bike facing `heading`, lifted by `height`.
#[inline]
fn behind(heading: f32, distance: f32, height: f32) -> Vector3<f32> {
    Vector3::new(0.0, height, 0.0) - heading_forward(heading) * distance
}

// ---------------------------------------------
// SMOOTHED FOLLOW
// ---------------------------------------------
#[derive(Debug, Clone)]
pub struct SmoothedFollow {
    pub distance: f32,
    pub height: f32,
    pub look_height: f32,
    pub position_rate: f32, // 1/s
    pub look_rate: f32,     // 1/s
    pose: Option<CameraPose>,
}

impl SmoothedFollow {
    pub fn new(distance: f32, height: f32) -> Self {
        Self {
            distance,
            height,
            look_height: 2.0,
            position_rate: 5.0,
            look_rate: 10.0,
            pose: None,
        }
    }

    fn resting(&self, target: &FollowTarget) -> CameraPose {
        CameraPose::new(
            target.position + behind(target.heading, self.distance, self.height),
            target.position + Vector3::new(0.0, self.look_height, 0.0),
        )
    }
}

impl CameraPolicy for SmoothedFollow {
    fn name(&self) -> &'static str {
        "smoothed"
    }

    fn update(&mut self, target: &FollowTarget, dt: f32) -> CameraPose {
        let rest = self.resting(target);
        let Some(current) = self.pose else {
            return self.snap(target);
        };
        if !(dt > 0.0) {
            return current;
        }

        let pose = CameraPose::new(
            ease(current.position(), rest.position(), smoothing_alpha(self.position_rate, dt)),
            ease(current.look_at(), rest.look_at(), smoothing_alpha(self.look_rate, dt)),
        );
        self.pose = Some(pose);
        pose
    }

    fn snap(&mut self, target: &FollowTarget) -> CameraPose {
        let pose = self.resting(target);
        self.pose = Some(pose);
        pose
    }
}

// ---------------------------------------------
// RIGID ATTACHED
// ---------------------------------------------
#[derive(Debug, Clone)]
pub struct RigidAttached {
    pub distance: f32,
    pub height: f32,
    pub look_height: f32,
}

impl RigidAttached {
    pub fn new(distance: f32, height: f32) -> Self {
        Self { distance, height, look_height: 1.5 }
    }
}

impl CameraPolicy for RigidAttached {
    fn name(&self) -> &'static str {
        "rigid"
    }

    fn update(&mut self, target: &FollowTarget, _dt: f32) -> CameraPose {
        self.snap(target)
    }

    fn snap(&mut self, target: &FollowTarget) -> CameraPose {
        CameraPose::new(
            target.position + behind(target.heading, self.distance, self.height),
            target.position + Vector3::new(0.0, self.look_height, 0.0),
        )
    }
}

// ---------------------------------------------
// WALKING (third person, fixed offset)
// ---------------------------------------------
#[derive(Debug, Clone)]
pub struct WalkingCamera {
    pub offset: Vector3<f32>,
    pub look_offset: Vector3<f32>,
    pub rate: f32,
    pose: Option<CameraPose>,
}

impl Default for WalkingCamera {
    fn default() -> Self {
        Self {
            offset: Vector3::new(0.0, 3.0, 5.0),
            look_offset: Vector3::new(0.0, 1.0, 0.0),
            // 0.1 of the gap per frame at 60 Hz
            rate: -(0.9_f32.ln()) * 60.0,
            pose: None,
        }
    }
}

impl CameraPolicy for WalkingCamera {
    fn name(&self) -> &'static str {
        "walking"
    }

    fn update(&mut self, target: &FollowTarget, dt: f32) -> CameraPose {
        let Some(current) = self.pose else {
            return self.snap(target);
        };
        if !(dt > 0.0) {
            return current;
        }
        let position = ease(current.position(), target.position + self.offset, smoothing_alpha(self.rate, dt));
        // look-at is not eased: the character stays centred
        let pose = CameraPose::new(position, target.position + self.look_offset);
        self.pose = Some(pose);
        pose
    }

    fn snap(&mut self, target: &FollowTarget) -> CameraPose {
        let pose = CameraPose::new(target.position + self.offset, target.position + self.look_offset);
        self.pose = Some(pose);
        pose
    }
}
