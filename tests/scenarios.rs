//! End-to-end ticks of a full session over a real rapier world.

use motozen_physics::config::{
    CameraPolicyKind, SuspensionKind, TireKind, WorldConfig, ZoneConfig,
};
use motozen_physics::dynamics::{planar_speed, MS_TO_KMH};
use motozen_physics::engine::IDLE_RPM;
use motozen_physics::mount::MountState;
use motozen_physics::terrain::ZoneKind;
use motozen_physics::world::BodyRole;
use motozen_physics::{Customization, InputSnapshot, Session, SimConfig, SimError};

const DT: f32 = 1.0 / 60.0;

fn street_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.world = WorldConfig { zones: Vec::new(), ..WorldConfig::default() };
    config.vehicle.tires = TireKind::Street;
    config.vehicle.suspension = SuspensionKind::Soft;
    config
}

fn idle() -> InputSnapshot {
    InputSnapshot::default()
}

fn forward() -> InputSnapshot {
    InputSnapshot { forward: true, ..Default::default() }
}

fn run(session: &mut Session, controls: InputSnapshot, ticks: usize) {
    for _ in 0..ticks {
        session.tick(&controls, DT);
    }
}

/// Spawned bike dropped onto the ground and left to settle.
fn settled(config: &SimConfig) -> Session {
    let mut session = Session::new(config);
    run(&mut session, idle(), 90);
    session
}

fn bike(session: &Session) -> motozen_physics::world::BodyKinematics {
    session.world().kinematics(BodyRole::Vehicle).unwrap()
}

fn character(session: &Session) -> motozen_physics::world::BodyKinematics {
    session.world().kinematics(BodyRole::Character).unwrap()
}

#[test]
fn bike_settles_on_the_ground_at_spawn() {
    let session = settled(&street_config());
    let k = bike(&session);
    assert!((k.position.y - 0.5).abs() < 0.05, "y = {}", k.position.y);
    assert!(k.position.x.abs() < 1e-3 && k.position.z.abs() < 1e-3);
    assert_eq!(session.mount_state(), MountState::Riding);
}

#[test]
fn launch_from_rest_revs_and_pulls_forward() {
    let mut session = settled(&street_config());

    let snap = session.tick(&forward(), DT).unwrap();
    assert_eq!(snap.telemetry.gear, 1);
    assert!(snap.telemetry.rpm > IDLE_RPM);
    assert!(snap.telemetry.rpm < 3000.0);

    run(&mut session, forward(), 59);
    let k = bike(&session);
    assert!(k.velocity.z > 5.0, "vz = {}", k.velocity.z);
    assert!(k.velocity.x.abs() < 1e-3);
    assert_eq!(session.heading(), 0.0);

    // telemetry is computed from the velocity read before the step
    let t = session.telemetry();
    let now_kmh = planar_speed(&k.velocity) * MS_TO_KMH;
    assert!((t.speed_kmh as f32 - now_kmh).abs() < 1.5);
}

#[test]
fn braking_slows_the_bike() {
    let mut session = settled(&street_config());
    run(&mut session, forward(), 120);
    let before = planar_speed(&bike(&session).velocity);

    let brake = InputSnapshot { backward: true, ..Default::default() };
    run(&mut session, brake, 30);
    let after = planar_speed(&bike(&session).velocity);
    assert!(after < before - 3.0, "{before} -> {after}");
}

#[test]
fn forward_and_backward_together_brake() {
    let mut session = settled(&street_config());
    run(&mut session, forward(), 120);
    let before = planar_speed(&bike(&session).velocity);

    let both = InputSnapshot { forward: true, backward: true, ..Default::default() };
    run(&mut session, both, 10);
    assert!(planar_speed(&bike(&session).velocity) < before);
}

#[test]
fn holding_backward_from_rest_is_a_slow_reverse() {
    let mut session = settled(&street_config());
    let back = InputSnapshot { backward: true, ..Default::default() };

    for _ in 0..600 {
        session.tick(&back, DT);
        let kmh = planar_speed(&bike(&session).velocity) * MS_TO_KMH;
        assert!(kmh < 20.0, "reverse ran away at {kmh} km/h");
    }
    let k = bike(&session);
    assert!(k.velocity.z < 0.0);
    assert!(k.position.z < -5.0, "z = {}", k.position.z);
}

#[test]
fn handbrake_cuts_horizontal_speed_by_a_tenth() {
    let mut session = settled(&street_config());
    session
        .world_mut()
        .set_velocity(BodyRole::Vehicle, nalgebra::Vector3::new(0.0, 0.0, 10.0));

    let handbrake = InputSnapshot { handbrake: true, ..Default::default() };
    session.tick(&handbrake, DT);
    let vz = bike(&session).velocity.z;
    assert!((vz - 9.0).abs() < 0.05, "vz = {vz}");
}

#[test]
fn steering_turns_left_only_when_moving() {
    let mut session = settled(&street_config());
    let left = InputSnapshot { left: true, ..Default::default() };
    session.tick(&left, DT);
    assert_eq!(session.heading(), 0.0);

    run(&mut session, forward(), 60);
    let turning = InputSnapshot { forward: true, left: true, ..Default::default() };
    run(&mut session, turning, 30);
    assert!(session.heading() > 0.0);
    assert!(bike(&session).velocity.x > 0.0);
}

#[test]
fn reset_is_idempotent() {
    let mut session = settled(&street_config());
    let turning = InputSnapshot { forward: true, right: true, ..Default::default() };
    run(&mut session, turning, 120);

    session.reset_vehicle();
    let first = bike(&session);
    let heading = session.heading();
    session.reset_vehicle();
    let second = bike(&session);

    assert_eq!(first, second);
    assert_eq!(heading, 0.0);
    assert_eq!(session.heading(), 0.0);
    assert_eq!(second.velocity, nalgebra::Vector3::zeros());
    assert_eq!(second.position, nalgebra::Vector3::new(0.0, 2.0, 0.0));
}

#[test]
fn held_reset_keeps_the_bike_at_spawn() {
    let mut session = settled(&street_config());
    let turning = InputSnapshot { forward: true, left: true, ..Default::default() };
    run(&mut session, turning, 120);

    let reset = InputSnapshot { reset: true, forward: true, ..Default::default() };
    run(&mut session, reset, 20);
    let k = bike(&session);
    assert_eq!(session.heading(), 0.0);
    assert!(k.position.x.abs() < 1e-3 && k.position.z.abs() < 1e-3);
    // only one step of gravity since the last re-zero
    assert!((k.position.y - 2.0).abs() < 0.01);
}

#[test]
fn held_interact_dismounts_exactly_once() {
    let mut session = settled(&street_config());
    let interact = InputSnapshot { interact: true, ..Default::default() };

    session.tick(&interact, DT);
    assert_eq!(session.mount_state(), MountState::Walking);
    for _ in 0..60 {
        session.tick(&interact, DT);
        assert_eq!(session.mount_state(), MountState::Walking);
    }

    session.tick(&idle(), DT);
    session.tick(&interact, DT);
    assert_eq!(session.mount_state(), MountState::Riding);
}

#[test]
fn dismount_parks_the_character_above_the_bike() {
    let mut session = settled(&street_config());
    let interact = InputSnapshot { interact: true, ..Default::default() };
    session.tick(&interact, DT);

    let bike_pos = bike(&session).position;
    let rider = character(&session).position;
    assert!((rider.x - bike_pos.x).abs() < 1e-3);
    assert!((rider.z - bike_pos.z).abs() < 1e-3);
    assert!(rider.y > bike_pos.y + 1.5);
}

#[test]
fn walking_moves_the_character_not_the_bike() {
    let mut session = settled(&street_config());
    session.tick(&InputSnapshot { interact: true, ..Default::default() }, DT);
    session.tick(&idle(), DT);
    run(&mut session, idle(), 30);

    let start = character(&session).position;
    let rpm_before = session.telemetry().rpm;
    run(&mut session, forward(), 60);

    let end = character(&session).position;
    // the walking camera looks down -z
    assert!(end.z < start.z - 3.0, "{start:?} -> {end:?}");
    assert!(planar_speed(&bike(&session).velocity) < 0.1);
    assert!(session.telemetry().rpm <= rpm_before + 1e-3);
}

#[test]
fn riding_pins_the_character_to_the_bike() {
    let mut session = settled(&street_config());
    run(&mut session, forward(), 60);
    let b = bike(&session).position;
    let c = character(&session).position;
    // pinned before the step, so the two drift apart by at most one tick
    assert!((c - b).norm() < 1.5);
}

#[test]
fn mud_zone_slows_the_bike_and_clears_on_exit() {
    let mut config = street_config();
    config.vehicle.tires = TireKind::Offroad;
    config.world.zones = vec![ZoneConfig {
        kind: ZoneKind::Mud,
        center: [0.0, 0.05, 12.0],
        half_extents: [5.0, 0.05, 3.0],
    }];
    let mut session = settled(&config);

    let mut saw_mud = false;
    for _ in 0..600 {
        let snap = session.tick(&forward(), DT).unwrap();
        if snap.terrain == ZoneKind::Mud.surface() {
            saw_mud = true;
        }
        if saw_mud && snap.terrain.is_neutral() {
            break;
        }
    }
    assert!(saw_mud);
    assert!(session.terrain().is_neutral());
    assert!(bike(&session).position.z > 15.0);
}

#[test]
fn customization_is_refused_while_driving() {
    let mut session = settled(&street_config());
    let change = Customization { tires: Some(TireKind::Offroad), ..Default::default() };

    run(&mut session, forward(), 60);
    match session.customize(&change) {
        Err(SimError::CustomizeWhileDriving { speed_kmh }) => assert!(speed_kmh >= 1.0),
        other => panic!("expected refusal, got {other:?}"),
    }
    assert_eq!(session.vehicle_config().tires, TireKind::Street);

    // parked and off the bike it goes through
    session.tick(&InputSnapshot { interact: true, ..Default::default() }, DT);
    assert!(session.customize(&change).is_ok());
    assert_eq!(session.vehicle_config().tires, TireKind::Offroad);
}

#[test]
fn rigid_camera_sits_directly_behind() {
    let mut config = street_config();
    config.camera.policy = CameraPolicyKind::Rigid;
    let mut session = settled(&config);
    session.tick(&idle(), DT);

    let b = bike(&session).position;
    let cam = session.camera();
    assert!((cam.position[0] - b.x).abs() < 1e-3);
    assert!((cam.position[1] - (b.y + 3.5)).abs() < 1e-3);
    assert!((cam.position[2] - (b.z - 8.0)).abs() < 1e-3);
}

#[test]
fn smoothed_camera_trails_a_moving_bike() {
    let mut session = settled(&street_config());
    run(&mut session, forward(), 60);
    let b = bike(&session).position;
    let cam = session.camera();
    // further back than the resting offset while accelerating
    assert!(b.z - cam.position[2] > 8.0);
}

#[test]
fn missing_vehicle_body_does_not_stop_the_loop() {
    let mut session = settled(&street_config());
    assert!(session.world_mut().remove_body(BodyRole::Vehicle));

    let everything = InputSnapshot {
        forward: true,
        left: true,
        handbrake: true,
        reset: true,
        interact: true,
        ..Default::default()
    };
    for _ in 0..30 {
        let snap = session.tick(&everything, DT).unwrap();
        assert!(snap.vehicle.is_none());
        assert!(snap.character.is_some());
    }
}

#[test]
fn snapshot_serializes_to_json() {
    let mut session = settled(&street_config());
    let snap = session.tick(&forward(), DT).unwrap();
    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["mount"], "riding");
    assert!(json["vehicle"]["position"].is_array());
    assert!(json["telemetry"]["gear"].is_number());
    assert!(json["terrain"]["traction"].is_number());
}
