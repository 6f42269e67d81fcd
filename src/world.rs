// src/world.rs
// ==============================================================================
// world.rs — RAPIER WORLD: BIKE, RIDER, GROUND, TERRAIN TRIGGERS
// ------------------------------------------------------------------------------
// The rigid-body solver is rapier's; this module only owns the handles and
// exposes the handful of commands the session needs:
// - kinematics(role)          read position / linear velocity
// - apply_force(role, f)      replace the persistent user force
// - set_velocity / set_position / set_heading
// - step(dt)                  integrate, then fold trigger events into terrain
//
// Terrain volumes are sensor colliders. Collision events are raised from
// inside the pipeline through TriggerCollector, which only queues them behind a
// mutex (the EventHandler contract is &self + Send + Sync). After the step the
// queue is drained on the tick thread and applied to the TerrainEffects arena.
// Only the collider tagged "bike-chassis" changes the surface.
//
// Any missing handle makes the corresponding command a no-op returning false.
// ==============================================================================

use rapier3d::prelude::*;
use rapier3d::na::UnitQuaternion;
use nalgebra::Vector3;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::config::WorldConfig;
use crate::terrain::{TerrainEffects, TerrainState, ZoneId, ZoneKind};

const GROUP_GROUND: Group    = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group   = Group::from_bits_truncate(0b0010);
const GROUP_CHARACTER: Group = Group::from_bits_truncate(0b0100);
const GROUP_ZONE: Group      = Group::from_bits_truncate(0b1000);

// --- bike chassis: a ball that never tumbles; yaw is written, not simulated ---
pub const BIKE_RADIUS: f32 = 0.5;          // m
pub const BIKE_MASS: f32 = 150.0;          // kg
pub const BIKE_LINEAR_DAMPING: f32 = 0.05;
pub const BIKE_FRICTION: f32 = 0.05;

// --- rider on foot ---
pub const CHARACTER_RADIUS: f32 = 0.5;     // m
pub const CHARACTER_MASS: f32 = 1.0;       // kg
pub const CHARACTER_LINEAR_DAMPING: f32 = 0.9; // stops quickly

/// Bodies further than this from the origin are considered exploded.
pub const WORLD_LIMIT: f32 = 1_000.0;

/// Collider tags carried in rapier's `user_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyTag {
    Ground,
    BikeChassis,
    Character,
    TerrainZone,
}

impl BodyTag {
    pub const fn code(self) -> u128 {
        match self {
            BodyTag::Ground => 1,
            BodyTag::BikeChassis => 2,
            BodyTag::Character => 3,
            BodyTag::TerrainZone => 4,
        }
    }

    pub fn from_code(code: u128) -> Option<Self> {
        match code {
            1 => Some(BodyTag::Ground),
            2 => Some(BodyTag::BikeChassis),
            3 => Some(BodyTag::Character),
            4 => Some(BodyTag::TerrainZone),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyTag::Ground => "ground",
            BodyTag::BikeChassis => "bike-chassis",
            BodyTag::Character => "character",
            BodyTag::TerrainZone => "terrain-zone",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRole {
    Vehicle,
    Character,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyKinematics {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainEvent {
    Entered(ZoneId, ZoneKind),
    Exited(ZoneId, ZoneKind),
}

#[derive(Default)]
struct TriggerCollector {
    events: Mutex<Vec<CollisionEvent>>,
}

impl TriggerCollector {
    fn drain(&self) -> Vec<CollisionEvent> {
        let mut queue = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *queue)
    }
}

impl EventHandler for TriggerCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if !event.sensor() {
            return;
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,               // gravity vector
    pub pipeline: PhysicsPipeline,           // physics pipeline
    pub island_manager: IslandManager,       // manages islands of bodies
    pub broad_phase: DefaultBroadPhase,      // broad-phase collision detection
    pub narrow_phase: NarrowPhase,           // collision detection
    pub bodies: RigidBodySet,                // for rigid bodies
    pub colliders: ColliderSet,              // for collision shapes
    pub joints: ImpulseJointSet,             // for constraints
    pub multibody_joints: MultibodyJointSet, // for articulated bodies
    pub ccd: CCDSolver,                      // continuous collision detection
    pub query_pipeline: QueryPipeline,       // for raycasting

    vehicle: Option<RigidBodyHandle>,
    character: Option<RigidBodyHandle>,
    chassis_collider: Option<ColliderHandle>,
    zones: HashMap<ColliderHandle, (ZoneId, ZoneKind)>,
    next_zone: u32,
    terrain: TerrainEffects,
    triggers: TriggerCollector,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Empty world with a flat static ground whose top surface is y = 0.
    pub fn new() -> Self {
        let gravity = vector![0.0, -9.81, 0.0];

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -0.1, 0.0])
            .build();
        let ground_handle = bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::cuboid(500.0, 0.1, 500.0)
            .collision_groups(InteractionGroups::new(
                GROUP_GROUND,
                GROUP_CHASSIS | GROUP_CHARACTER,
            ))
            .friction(0.8)
            .restitution(0.1)
            .user_data(BodyTag::Ground.code())
            .build();
        colliders.insert_with_parent(ground_collider, ground_handle, &mut bodies);

        debug!(bodies = bodies.len(), colliders = colliders.len(), "🌎 ground inserted");

        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            vehicle: None,
            character: None,
            chassis_collider: None,
            zones: HashMap::new(),
            next_zone: 0,
            terrain: TerrainEffects::new(),
            triggers: TriggerCollector::default(),
        }
    }

    /// Ground, bike, rider and every configured terrain zone.
    pub fn from_config(config: &WorldConfig) -> Self {
        let mut world = Self::new();
        world.spawn_vehicle(Vector3::from(config.spawn));
        world.spawn_character(Vector3::from(config.character_spawn));
        for zone in &config.zones {
            world.add_terrain_zone(zone.kind, Vector3::from(zone.center), Vector3::from(zone.half_extents));
        }
        info!(
            zones = config.zones.len(),
            spawn = ?config.spawn,
            "world ready"
        );
        world
    }

    pub fn spawn_vehicle(&mut self, position: Vector3<f32>) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::dynamic()
            .translation(position)
            .linear_damping(BIKE_LINEAR_DAMPING)
            .lock_rotations()
            .ccd_enabled(true)
            .build();

        let collider = ColliderBuilder::ball(BIKE_RADIUS)
            .collision_groups(InteractionGroups::new(
                GROUP_CHASSIS,
                GROUP_GROUND | GROUP_ZONE,
            ))
            .mass(BIKE_MASS)
            .friction(BIKE_FRICTION)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .restitution(0.0)
            .user_data(BodyTag::BikeChassis.code())
            .build();

        let handle = self.bodies.insert(rb);
        let collider = self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        self.vehicle = Some(handle);
        self.chassis_collider = Some(collider);
        handle
    }

    pub fn spawn_character(&mut self, position: Vector3<f32>) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::dynamic()
            .translation(position)
            .linear_damping(CHARACTER_LINEAR_DAMPING)
            .lock_rotations()
            .build();

        let collider = ColliderBuilder::ball(CHARACTER_RADIUS)
            .collision_groups(InteractionGroups::new(GROUP_CHARACTER, GROUP_GROUND))
            .mass(CHARACTER_MASS)
            .user_data(BodyTag::Character.code())
            .build();

        let handle = self.bodies.insert(rb);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        self.character = Some(handle);
        handle
    }

    /// Static sensor box; the bike inside it feels `kind`'s surface.
    pub fn add_terrain_zone(
        &mut self,
        kind: ZoneKind,
        center: Vector3<f32>,
        half_extents: Vector3<f32>,
    ) -> ZoneId {
        let id = ZoneId(self.next_zone);
        self.next_zone += 1;

        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(center)
            .sensor(true)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .collision_groups(InteractionGroups::new(GROUP_ZONE, GROUP_CHASSIS))
            .user_data(BodyTag::TerrainZone.code())
            .build();

        let handle = self.colliders.insert(collider);
        self.zones.insert(handle, (id, kind));
        debug!(zone = id.0, kind = kind.as_str(), ?center, "terrain zone added");
        id
    }

    /// Drop a body (and its colliders). Later commands for the role no-op.
    pub fn remove_body(&mut self, role: BodyRole) -> bool {
        let slot = match role {
            BodyRole::Vehicle => &mut self.vehicle,
            BodyRole::Character => &mut self.character,
        };
        let Some(handle) = slot.take() else { return false };

        if role == BodyRole::Vehicle {
            self.chassis_collider = None;
            self.terrain.clear();
        }

        self.bodies
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    fn handle(&self, role: BodyRole) -> Option<RigidBodyHandle> {
        match role {
            BodyRole::Vehicle => self.vehicle,
            BodyRole::Character => self.character,
        }
    }

    fn body_mut(&mut self, role: BodyRole) -> Option<&mut RigidBody> {
        let handle = self.handle(role)?;
        self.bodies.get_mut(handle)
    }

    pub fn kinematics(&self, role: BodyRole) -> Option<BodyKinematics> {
        let body = self.bodies.get(self.handle(role)?)?;
        Some(BodyKinematics {
            position: *body.translation(),
            velocity: *body.linvel(),
        })
    }

    /// Replace the body's user force (rapier keeps forces until reset).
    pub fn apply_force(&mut self, role: BodyRole, force: Vector3<f32>) -> bool {
        let Some(body) = self.body_mut(role) else { return false };
        body.reset_forces(false);
        body.add_force(force, true);
        true
    }

    pub fn clear_force(&mut self, role: BodyRole) -> bool {
        let Some(body) = self.body_mut(role) else { return false };
        body.reset_forces(false);
        true
    }

    pub fn set_velocity(&mut self, role: BodyRole, velocity: Vector3<f32>) -> bool {
        let Some(body) = self.body_mut(role) else { return false };
        body.set_linvel(velocity, true);
        true
    }

    pub fn set_position(&mut self, role: BodyRole, position: Vector3<f32>) -> bool {
        let Some(body) = self.body_mut(role) else { return false };
        body.set_translation(position, true);
        true
    }

    /// Visual yaw only; rotations are locked so the solver never changes it.
    pub fn set_heading(&mut self, role: BodyRole, heading: f32) -> bool {
        let Some(body) = self.body_mut(role) else { return false };
        body.set_rotation(UnitQuaternion::from_axis_angle(&Vector3::y_axis(), heading), false);
        true
    }

    pub fn heading(&self, role: BodyRole) -> Option<f32> {
        let body = self.bodies.get(self.handle(role)?)?;
        // pure yaw, so the scaled axis is (0, heading, 0)
        Some(body.rotation().scaled_axis().y)
    }

    pub fn terrain(&self) -> TerrainState {
        self.terrain.current()
    }

    pub fn terrain_effects(&self) -> &TerrainEffects {
        &self.terrain
    }

    pub fn step(&mut self, dt: Real) -> Vec<TerrainEvent> {
        let hooks = ();

        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &hooks,
            &self.triggers,
        );

        self.recover_exploded_bodies();
        self.apply_trigger_events()
    }

    fn is_chassis(&self, collider: ColliderHandle) -> bool {
        match self.colliders.get(collider) {
            Some(c) => BodyTag::from_code(c.user_data) == Some(BodyTag::BikeChassis),
            // already removed: fall back to the remembered handle
            None => self.chassis_collider == Some(collider),
        }
    }

    fn apply_trigger_events(&mut self) -> Vec<TerrainEvent> {
        let mut out = Vec::new();

        for event in self.triggers.drain() {
            let (a, b) = (event.collider1(), event.collider2());
            let (zone, other) = match (self.zones.get(&a), self.zones.get(&b)) {
                (Some(z), _) => (*z, b),
                (None, Some(z)) => (*z, a),
                (None, None) => continue,
            };
            if !self.is_chassis(other) {
                continue;
            }

            let (id, kind) = zone;
            if event.started() {
                self.terrain.enter(id, kind.surface());
                out.push(TerrainEvent::Entered(id, kind));
            } else if self.terrain.exit(id) {
                out.push(TerrainEvent::Exited(id, kind));
            }
        }

        out
    }

    /// Reset any body with a non-finite or runaway position.
    fn recover_exploded_bodies(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            if !body.is_dynamic() {
                continue;
            }
            let pos = *body.translation();

            let bad = !pos.iter().all(|c| c.is_finite()) || pos.iter().any(|c| c.abs() > WORLD_LIMIT);

            if bad {
                let safe = vector![0.0, 1.0, 0.0];
                body.set_translation(safe, true);
                body.set_linvel(vector![0.0, 0.0, 0.0], true);
                body.set_angvel(vector![0.0, 0.0, 0.0], true);
                warn!(from = ?pos, "⚠️ reset exploding body back to {:?}", safe);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn settle(world: &mut PhysicsWorld, ticks: usize) {
        for _ in 0..ticks {
            world.step(DT);
        }
    }

    #[test]
    fn bike_comes_to_rest_on_the_ground() {
        let mut world = PhysicsWorld::new();
        world.spawn_vehicle(Vector3::new(0.0, 2.0, 0.0));
        settle(&mut world, 180);
        let k = world.kinematics(BodyRole::Vehicle).unwrap();
        assert!((k.position.y - BIKE_RADIUS).abs() < 0.05, "y = {}", k.position.y);
    }

    #[test]
    fn forward_force_moves_bike_along_z() {
        let mut world = PhysicsWorld::new();
        world.spawn_vehicle(Vector3::new(0.0, 0.5, 0.0));
        settle(&mut world, 30);
        for _ in 0..60 {
            world.apply_force(BodyRole::Vehicle, Vector3::new(0.0, 0.0, 1150.0));
            world.step(DT);
        }
        let k = world.kinematics(BodyRole::Vehicle).unwrap();
        assert!(k.velocity.z > 1.0);
        assert!(k.position.z > 0.5);
    }

    #[test]
    fn driving_through_mud_enters_and_exits() {
        let mut world = PhysicsWorld::new();
        world.spawn_vehicle(Vector3::new(0.0, 0.5, 0.0));
        let zone = world.add_terrain_zone(
            ZoneKind::Mud,
            Vector3::new(0.0, 0.05, 10.0),
            Vector3::new(5.0, 0.05, 2.0),
        );
        settle(&mut world, 30);
        assert!(world.terrain().is_neutral());

        let mut entered = false;
        let mut exited = false;
        for _ in 0..600 {
            world.set_velocity(BodyRole::Vehicle, Vector3::new(0.0, 0.0, 10.0));
            for event in world.step(DT) {
                match event {
                    TerrainEvent::Entered(id, ZoneKind::Mud) if id == zone => {
                        entered = true;
                        assert_eq!(world.terrain(), ZoneKind::Mud.surface());
                    }
                    TerrainEvent::Exited(id, _) if id == zone => exited = true,
                    _ => {}
                }
            }
            if exited {
                break;
            }
        }
        assert!(entered && exited);
        assert!(world.terrain().is_neutral());
    }

    #[test]
    fn character_does_not_trigger_zones() {
        let mut world = PhysicsWorld::new();
        world.spawn_character(Vector3::new(0.0, 0.5, 0.0));
        world.add_terrain_zone(ZoneKind::Water, Vector3::zeros(), Vector3::new(5.0, 1.0, 5.0));
        settle(&mut world, 30);
        assert!(world.terrain().is_neutral());
    }

    #[test]
    fn commands_on_missing_body_are_no_ops() {
        let mut world = PhysicsWorld::new();
        assert!(world.kinematics(BodyRole::Vehicle).is_none());
        assert!(!world.apply_force(BodyRole::Vehicle, Vector3::x()));
        assert!(!world.set_velocity(BodyRole::Vehicle, Vector3::x()));
        assert!(!world.set_heading(BodyRole::Vehicle, 1.0));

        world.spawn_vehicle(Vector3::new(0.0, 1.0, 0.0));
        assert!(world.remove_body(BodyRole::Vehicle));
        assert!(!world.remove_body(BodyRole::Vehicle));
        world.step(DT);
    }

    #[test]
    fn heading_is_written_as_yaw() {
        let mut world = PhysicsWorld::new();
        world.spawn_vehicle(Vector3::new(0.0, 1.0, 0.0));
        world.set_heading(BodyRole::Vehicle, 0.75);
        let yaw = world.heading(BodyRole::Vehicle).unwrap();
        assert!((yaw - 0.75).abs() < 1e-5);
    }

    #[test]
    fn runaway_body_is_recovered() {
        let mut world = PhysicsWorld::new();
        world.spawn_vehicle(Vector3::new(0.0, 1.0, 0.0));
        world.set_position(BodyRole::Vehicle, Vector3::new(5_000.0, 1.0, 0.0));
        world.step(DT);
        let k = world.kinematics(BodyRole::Vehicle).unwrap();
        assert!(k.position.x.abs() < 1.0);
        assert_eq!(k.velocity, Vector3::zeros());
    }

    #[test]
    fn tags_round_trip() {
        for tag in [BodyTag::Ground, BodyTag::BikeChassis, BodyTag::Character, BodyTag::TerrainZone] {
            assert_eq!(BodyTag::from_code(tag.code()), Some(tag));
        }
        assert_eq!(BodyTag::BikeChassis.as_str(), "bike-chassis");
        assert_eq!(BodyTag::from_code(99), None);
    }
}
