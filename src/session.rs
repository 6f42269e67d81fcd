// ==============================================================================
// session.rs — ONE RIDER, ONE BIKE, ONE TICK AT A TIME
// ------------------------------------------------------------------------------
// Session owns every piece of per-session state and advances it in a fixed
// order, so nothing depends on callback scheduling:
//
//   1) mount      interact edge + proximity  -> Riding / Walking, teleport
//   2) riding     reset (level-triggered) or dynamics -> force / velocity /
//                 heading, telemetry, engine sound; character pinned on top
//      walking    bike force cleared, engine idles, character walks
//   3) physics    world.step(dt), trigger events folded into terrain
//   4) camera     chase camera (riding) or walking camera from the new pose
//
// A tick with dt <= 0 changes nothing and returns None. A missing rigid body
// only skips the commands that target it.
// ==============================================================================

use nalgebra::Vector3;
use serde::Serialize;
use tracing::{info, trace, warn};

use crate::camera::{chase_policy, CameraPolicy, CameraPose, FollowTarget, WalkingCamera};
use crate::character::walk_velocity;
use crate::config::{Customization, SimConfig, VehicleConfig};
use crate::dynamics::{self, planar_speed, DriveInput, DriveState, MS_TO_KMH};
use crate::error::{Result, SimError};
use crate::input::{EdgeDetector, InputSnapshot};
use crate::mount::{riding_pin, toggle_position, MountController, MountState, MountTransition};
use crate::telemetry::{EngineReadout, EngineSound, EngineTone, NullEngineSound, Telemetry};
use crate::terrain::TerrainState;
use crate::world::{BodyKinematics, BodyRole, PhysicsWorld, TerrainEvent};

/// Garage changes are refused while riding at or above this speed.
pub const CUSTOMIZE_MAX_KMH: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleView {
    pub position: [f32; 3],
    pub heading: f32,
    pub velocity: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CharacterView {
    pub position: [f32; 3],
}

/// Everything a client needs to draw one frame.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub mount: MountState,
    pub vehicle: Option<VehicleView>,
    pub character: Option<CharacterView>,
    pub camera: CameraPose,
    pub telemetry: EngineReadout,
    pub tone: Option<EngineTone>,
    pub terrain: TerrainState,
}

pub struct Session {
    world: PhysicsWorld,
    vehicle: VehicleConfig,
    spawn: Vector3<f32>,

    drive: DriveState,
    mount: MountController,
    chase: Box<dyn CameraPolicy>,
    walking: WalkingCamera,
    camera: CameraPose,

    telemetry: Telemetry,
    sound: Box<dyn EngineSound>,
    sound_started: bool,

    reset_edge: EdgeDetector,
    tick: u64,
}

impl Session {
    /// Session over a freshly built world, with a silent engine.
    pub fn new(config: &SimConfig) -> Self {
        Self::with_world(config, PhysicsWorld::from_config(&config.world))
    }

    pub fn with_world(config: &SimConfig, world: PhysicsWorld) -> Self {
        let spawn = Vector3::from(config.world.spawn);
        let mut chase = chase_policy(&config.camera);
        let camera = chase.snap(&FollowTarget { position: spawn, heading: 0.0 });

        Self {
            world,
            vehicle: config.vehicle.clone(),
            spawn,
            drive: DriveState::default(),
            mount: MountController::default(),
            chase,
            walking: WalkingCamera::default(),
            camera,
            telemetry: Telemetry::default(),
            sound: Box::new(NullEngineSound),
            sound_started: false,
            reset_edge: EdgeDetector::default(),
            tick: 0,
        }
    }

    pub fn with_sound(mut self, sound: Box<dyn EngineSound>) -> Self {
        self.sound = sound;
        self
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn vehicle_config(&self) -> &VehicleConfig {
        &self.vehicle
    }

    pub fn mount_state(&self) -> MountState {
        self.mount.state()
    }

    /// Gates getting back on. Getting off stays allowed.
    pub fn set_can_mount(&mut self, can_mount: bool) {
        self.mount.set_can_mount(can_mount);
    }

    pub fn heading(&self) -> f32 {
        self.drive.heading
    }

    pub fn telemetry(&self) -> EngineReadout {
        self.telemetry.latest()
    }

    pub fn camera(&self) -> CameraPose {
        self.camera
    }

    pub fn terrain(&self) -> TerrainState {
        self.world.terrain()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Garage change. Refused while the bike is being ridden at speed.
    pub fn customize(&mut self, change: &Customization) -> Result<&VehicleConfig> {
        if self.mount.state() == MountState::Riding {
            let speed_kmh = self
                .world
                .kinematics(BodyRole::Vehicle)
                .map(|k| planar_speed(&k.velocity) * MS_TO_KMH)
                .unwrap_or(0.0);
            if speed_kmh >= CUSTOMIZE_MAX_KMH {
                warn!(speed_kmh, "customization rejected while driving");
                return Err(SimError::CustomizeWhileDriving { speed_kmh });
            }
        }

        self.vehicle = self.vehicle.customized(change)?;
        info!(
            tires = ?self.vehicle.tires,
            suspension = ?self.vehicle.suspension,
            color = self.vehicle.color.as_str(),
            "vehicle customized"
        );
        Ok(&self.vehicle)
    }

    /// Put the bike back on the spawn point, at rest, facing +z.
    /// Calling it again without a tick in between changes nothing.
    pub fn reset_vehicle(&mut self) {
        self.drive.reset();
        self.world.set_position(BodyRole::Vehicle, self.spawn);
        self.world.set_velocity(BodyRole::Vehicle, Vector3::zeros());
        self.world.clear_force(BodyRole::Vehicle);
        self.world.set_heading(BodyRole::Vehicle, 0.0);
    }

    pub fn tick(&mut self, controls: &InputSnapshot, dt: f32) -> Option<Snapshot> {
        if !(dt > 0.0) || !dt.is_finite() {
            return None;
        }
        self.tick += 1;

        let focus_changed = self.update_mount(controls);

        match self.mount.state() {
            MountState::Riding => self.ride(controls, dt),
            MountState::Walking => self.walk(controls, dt),
        }

        for event in self.world.step(dt) {
            match event {
                TerrainEvent::Entered(id, kind) => info!(
                    zone = id.0,
                    kind = kind.as_str(),
                    overlapping = self.world.terrain_effects().active_zones(),
                    "bike entered terrain zone"
                ),
                TerrainEvent::Exited(id, kind) => info!(
                    zone = id.0,
                    kind = kind.as_str(),
                    overlapping = self.world.terrain_effects().active_zones(),
                    "bike left terrain zone"
                ),
            }
        }

        self.update_camera(focus_changed, dt);

        let snapshot = self.snapshot();
        trace!(
            tick = snapshot.tick,
            rpm = snapshot.telemetry.rpm,
            gear = snapshot.telemetry.gear,
            speed_kmh = snapshot.telemetry.speed_kmh,
            "tick"
        );
        Some(snapshot)
    }

    pub fn snapshot(&self) -> Snapshot {
        let vehicle = self.world.kinematics(BodyRole::Vehicle).map(|k| VehicleView {
            position: k.position.into(),
            heading: self.drive.heading,
            velocity: k.velocity.into(),
        });
        let character = self
            .world
            .kinematics(BodyRole::Character)
            .map(|k| CharacterView { position: k.position.into() });

        Snapshot {
            tick: self.tick,
            mount: self.mount.state(),
            vehicle,
            character,
            camera: self.camera,
            telemetry: self.telemetry.latest(),
            tone: self.sound.tone(),
            terrain: self.world.terrain(),
        }
    }

    // ---------------------------------------------
    // 1) MOUNT / DISMOUNT
    // ---------------------------------------------
    fn update_mount(&mut self, controls: &InputSnapshot) -> bool {
        let (Some(character), Some(vehicle)) = (
            self.world.kinematics(BodyRole::Character),
            self.world.kinematics(BodyRole::Vehicle),
        ) else {
            return false;
        };

        let Some(transition) = self.mount.update(controls.interact, &character.position, &vehicle.position)
        else {
            return false;
        };

        let parked = toggle_position(&vehicle.position);
        self.world.set_position(BodyRole::Character, parked);
        self.world.set_velocity(BodyRole::Character, Vector3::zeros());

        match transition {
            MountTransition::Dismounted => {
                self.world.clear_force(BodyRole::Vehicle);
                info!(at = ?vehicle.position, "🚶 dismounted");
            }
            MountTransition::Mounted => {
                self.world.clear_force(BodyRole::Character);
                info!(at = ?vehicle.position, "🏍️ mounted");
            }
        }
        true
    }

    // ---------------------------------------------
    // 2a) RIDING
    // ---------------------------------------------
    fn ride(&mut self, controls: &InputSnapshot, dt: f32) {
        let reset_pressed = self.reset_edge.rising(controls.reset);

        if let Some(vehicle) = self.world.kinematics(BodyRole::Vehicle) {
            if controls.reset {
                if reset_pressed {
                    info!(spawn = ?self.spawn, "vehicle reset");
                }
                self.reset_vehicle();
                let engine = self.drive.engine.idle(0.0, dt);
                self.telemetry.publish(engine);
                self.chase.snap(&FollowTarget { position: self.spawn, heading: 0.0 });
            } else {
                self.drive_vehicle(controls, vehicle, dt);
            }
        }

        self.pin_character();
    }

    fn drive_vehicle(&mut self, controls: &InputSnapshot, vehicle: BodyKinematics, dt: f32) {
        let input = DriveInput {
            controls,
            terrain: self.world.terrain(),
            vehicle: &self.vehicle,
            velocity: vehicle.velocity,
            dt,
        };
        let Some(out) = dynamics::update(&mut self.drive, &input) else {
            return;
        };

        self.world.apply_force(BodyRole::Vehicle, out.force);
        if let Some(velocity) = out.velocity_override {
            self.world.set_velocity(BodyRole::Vehicle, velocity);
        }
        self.world.set_heading(BodyRole::Vehicle, out.heading);

        self.telemetry.publish(out.engine);

        if !self.sound_started && (controls.forward || controls.backward) {
            self.sound.start();
            self.sound_started = true;
        }
        self.sound.update(out.engine.rpm, out.load, dt);
    }

    fn pin_character(&mut self) {
        let Some(vehicle) = self.world.kinematics(BodyRole::Vehicle) else {
            return;
        };
        self.world.set_position(BodyRole::Character, riding_pin(&vehicle.position));
        self.world.set_velocity(BodyRole::Character, Vector3::zeros());
    }

    // ---------------------------------------------
    // 2b) WALKING
    // ---------------------------------------------
    fn walk(&mut self, controls: &InputSnapshot, dt: f32) {
        // reset is a riding gesture; keep the edge state current
        self.reset_edge.rising(controls.reset);

        if let Some(vehicle) = self.world.kinematics(BodyRole::Vehicle) {
            self.world.clear_force(BodyRole::Vehicle);
            let engine = self.drive.engine.idle(planar_speed(&vehicle.velocity) * MS_TO_KMH, dt);
            self.telemetry.publish(engine);
        }

        if let Some(character) = self.world.kinematics(BodyRole::Character) {
            let velocity = walk_velocity(controls, self.camera.yaw(), character.velocity.y);
            self.world.set_velocity(BodyRole::Character, velocity);
        }
    }

    // ---------------------------------------------
    // 4) CAMERA
    // ---------------------------------------------
    fn update_camera(&mut self, focus_changed: bool, dt: f32) {
        let (role, heading) = match self.mount.state() {
            MountState::Riding => (BodyRole::Vehicle, self.drive.heading),
            MountState::Walking => (BodyRole::Character, 0.0),
        };
        let Some(body) = self.world.kinematics(role) else {
            return;
        };
        let target = FollowTarget { position: body.position, heading };

        self.camera = match self.mount.state() {
            MountState::Riding => follow(self.chase.as_mut(), &target, focus_changed, dt),
            MountState::Walking => follow(&mut self.walking, &target, focus_changed, dt),
        };
    }
}

fn follow(camera: &mut dyn CameraPolicy, target: &FollowTarget, snap: bool, dt: f32) -> CameraPose {
    if snap {
        camera.snap(target)
    } else {
        camera.update(target, dt)
    }
}
