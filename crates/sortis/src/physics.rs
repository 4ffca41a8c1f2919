//! # Dice Physics
//!
//! A small rigid-body model, just enough for a convincing tumble:
//!
//! - Gravity and a flat floor
//! - Restitution on impact, friction while in contact
//! - Angular velocity integrated into the orientation
//!
//! Which face is up is read from the orientation: the face whose rotated
//! normal points most along world +Y.

use std::f32::consts::{FRAC_PI_2, PI};

use rand::Rng;

use crate::math::{Quaternion, Vec3};

/// Gravity (units per second squared).
pub const GRAVITY: f32 = 30.0;

/// Half the edge length of a die.
pub const HALF_SIZE: f32 = 0.5;

/// Fraction of vertical speed kept on a bounce.
pub const RESTITUTION: f32 = 0.35;

/// Velocity kept per frame of floor contact.
pub const FLOOR_FRICTION: f32 = 0.85;

/// Angular velocity kept per frame of floor contact.
pub const SPIN_FRICTION: f32 = 0.85;

/// Bounces slower than this stop dead.
pub const REST_SPEED: f32 = 0.5;

/// Local face normals and the value printed on each.
pub const FACES: [(Vec3, u8); 6] = [
    (Vec3::new(0.0, 1.0, 0.0), 1),
    (Vec3::new(0.0, -1.0, 0.0), 6),
    (Vec3::new(1.0, 0.0, 0.0), 2),
    (Vec3::new(-1.0, 0.0, 0.0), 5),
    (Vec3::new(0.0, 0.0, 1.0), 3),
    (Vec3::new(0.0, 0.0, -1.0), 4),
];

/// Orientation (before yaw) that puts `face` on top.
///
/// Returns `None` outside 1..=6.
#[must_use]
pub fn face_up_orientation(face: u8) -> Option<Quaternion> {
    let q = match face {
        1 => Quaternion::IDENTITY,
        6 => Quaternion::from_axis_angle(Vec3::X, PI),
        2 => Quaternion::from_axis_angle(Vec3::Z, FRAC_PI_2),
        5 => Quaternion::from_axis_angle(Vec3::Z, -FRAC_PI_2),
        3 => Quaternion::from_axis_angle(Vec3::X, -FRAC_PI_2),
        4 => Quaternion::from_axis_angle(Vec3::X, FRAC_PI_2),
        _ => return None,
    };
    Some(q)
}

/// Face on top for an orientation.
#[must_use]
pub fn top_face(orientation: Quaternion) -> u8 {
    let mut best = (f32::NEG_INFINITY, 1);
    for (normal, value) in FACES {
        let up = orientation.rotate(normal).y;
        if up > best.0 {
            best = (up, value);
        }
    }
    best.1
}

/// One die.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DieBody {
    /// Center position.
    pub position: Vec3,
    /// Linear velocity.
    pub velocity: Vec3,
    /// Orientation.
    pub orientation: Quaternion,
    /// Angular velocity (rad/s).
    pub angular_velocity: Vec3,
}

impl Default for DieBody {
    fn default() -> Self {
        Self::resting(Vec3::new(0.0, HALF_SIZE, 0.0))
    }
}

impl DieBody {
    /// A die lying still at `position`, 1 up.
    #[must_use]
    pub fn resting(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            orientation: Quaternion::IDENTITY,
            angular_velocity: Vec3::ZERO,
        }
    }

    /// Throws the die from above lane `lane` with random spin.
    pub fn launch<R: Rng + ?Sized>(&mut self, lane: usize, rng: &mut R) {
        #[allow(clippy::cast_precision_loss)]
        let x = (lane as f32 - 1.0) * 1.5;
        self.position = Vec3::new(x, rng.gen_range(3.0..5.0), rng.gen_range(-0.5..0.5));
        self.velocity = Vec3::new(
            rng.gen_range(-2.0..2.0),
            rng.gen_range(2.0..6.0),
            rng.gen_range(-4.0..-1.0),
        );
        self.orientation = Quaternion::from_axis_angle(Vec3::X, rng.gen_range(0.0..PI))
            * Quaternion::from_axis_angle(Vec3::Z, rng.gen_range(0.0..PI));
        self.angular_velocity = Vec3::new(
            rng.gen_range(-15.0..15.0),
            rng.gen_range(-15.0..15.0),
            rng.gen_range(-15.0..15.0),
        );
    }

    /// True while touching the floor.
    #[must_use]
    pub fn on_floor(&self) -> bool {
        self.position.y <= HALF_SIZE + 1e-4
    }

    /// Advances by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        self.velocity.y -= GRAVITY * dt;
        self.position += self.velocity * dt;
        self.orientation = self.orientation.integrate(self.angular_velocity, dt);

        if self.position.y <= HALF_SIZE {
            self.position.y = HALF_SIZE;
            if self.velocity.y < 0.0 {
                self.velocity.y = -self.velocity.y * RESTITUTION;
                if self.velocity.y < REST_SPEED {
                    self.velocity.y = 0.0;
                }
            }
            self.velocity.x *= FLOOR_FRICTION;
            self.velocity.z *= FLOOR_FRICTION;
            self.angular_velocity = self.angular_velocity * SPIN_FRICTION;
        }
    }

    /// True once both speeds fall below `threshold` on the floor.
    #[must_use]
    pub fn is_still(&self, threshold: f32) -> bool {
        self.on_floor()
            && self.velocity.length() < threshold
            && self.angular_velocity.length() < threshold
    }

    /// Face currently on top.
    #[must_use]
    pub fn top_face(&self) -> u8 {
        top_face(self.orientation)
    }

    /// Lays the die flat with `face` up, keeping its heading. Out-of-range
    /// faces leave the die untouched and return false.
    pub fn snap_to(&mut self, face: u8) -> bool {
        let Some(base) = face_up_orientation(face) else {
            return false;
        };
        let heading = Quaternion::from_axis_angle(Vec3::Y, self.orientation.yaw());
        self.orientation = (heading * base).normalize();
        self.velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.position.y = HALF_SIZE;
        true
    }
}
