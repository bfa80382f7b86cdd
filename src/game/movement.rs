//! Kinematic integrator: look, camera-relative movement, gravity, jump,
//! recoil decay and the timed slide state

use std::f32::consts::FRAC_PI_2;
use std::time::{Duration, Instant};

use glam::Vec3;

use crate::util::time::Deadline;

use super::TickInput;

/// Player movement constants, expressed per simulation tick
#[derive(Debug, Clone, Copy)]
pub struct MovementTuning {
    /// Horizontal displacement per pressed direction per tick
    pub move_speed: f32,
    /// Horizontal displacement while sliding
    pub slide_speed: f32,
    /// Radians per pixel of pointer movement
    pub look_speed: f32,
    /// Vertical velocity lost per airborne tick
    pub gravity: f32,
    /// Vertical velocity set by a jump
    pub jump_force: f32,
    /// Multiplier applied to recoil every tick
    pub recoil_decay: f32,
    /// Pitch offset applied when a slide starts
    pub slide_tilt: f32,
    pub slide_duration: Duration,
    /// Camera height above the feet
    pub eye_height: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            move_speed: 0.25,
            slide_speed: 0.4,
            look_speed: 0.003,
            gravity: 0.006,
            jump_force: 0.3,
            recoil_decay: 0.95,
            slide_tilt: -0.25,
            slide_duration: Duration::from_millis(500),
            eye_height: 1.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementMode {
    Normal,
    Sliding { until: Deadline },
}

impl MovementMode {
    pub fn is_sliding(&self) -> bool {
        matches!(self, Self::Sliding { .. })
    }
}

/// Local player kinematic state, owned by the session tick
#[derive(Debug, Clone, PartialEq)]
pub struct LocalPlayerState {
    /// Eye (camera) position
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub velocity: Vec3,
    pub grounded: bool,
    /// Accumulated recoil, negative after firing, decays toward zero
    pub recoil: f32,
    pub mode: MovementMode,
}

impl LocalPlayerState {
    /// Standing at the origin at eye height
    pub fn spawn(tuning: &MovementTuning) -> Self {
        Self {
            position: Vec3::new(0.0, tuning.eye_height, 0.0),
            yaw: 0.0,
            pitch: 0.0,
            velocity: Vec3::ZERO,
            grounded: true,
            recoil: 0.0,
            mode: MovementMode::Normal,
        }
    }

    /// Pitch as rendered: look pitch with recoil kick applied
    pub fn view_pitch(&self) -> f32 {
        self.pitch - self.recoil
    }

    /// Euler rotation (pitch, yaw, roll) as sent to peers
    pub fn rotation(&self) -> Vec3 {
        Vec3::new(self.pitch, self.yaw, 0.0)
    }
}

/// Output of one integration step, before collision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proposal {
    pub position: Vec3,
    pub velocity_y: f32,
    pub grounded: bool,
}

pub struct Integrator;

impl Integrator {
    /// Start a slide if not already sliding. Returns true when a slide began.
    pub fn begin_slide(state: &mut LocalPlayerState, tuning: &MovementTuning, now: Instant) -> bool {
        if state.mode.is_sliding() {
            return false;
        }
        state.mode = MovementMode::Sliding {
            until: Deadline::after(now, tuning.slide_duration),
        };
        state.pitch = state.recoil + tuning.slide_tilt;
        true
    }

    /// End an expired slide. Pitch returns to level, not to its pre-slide value.
    pub fn expire_slide(state: &mut LocalPlayerState, now: Instant) -> bool {
        match state.mode {
            MovementMode::Sliding { until } if until.is_due(now) => {
                state.mode = MovementMode::Normal;
                state.pitch = 0.0;
                true
            }
            _ => false,
        }
    }

    /// Apply pointer look deltas. Pitch is clamped, yaw is unbounded.
    pub fn apply_look(state: &mut LocalPlayerState, input: &TickInput, tuning: &MovementTuning) {
        state.pitch = (state.pitch - input.look_dy * tuning.look_speed).clamp(-FRAC_PI_2, FRAC_PI_2);
        state.yaw -= input.look_dx * tuning.look_speed;
    }

    /// Advance one tick. Mutates look, jump and recoil on `state`; returns the
    /// proposed position for the collision resolver.
    pub fn step(state: &mut LocalPlayerState, input: &TickInput, tuning: &MovementTuning) -> Proposal {
        Self::apply_look(state, input, tuning);

        if input.jump && state.grounded {
            state.velocity.y = tuning.jump_force;
            state.grounded = false;
        }

        state.recoil *= tuning.recoil_decay;

        let mut velocity_y = state.velocity.y;
        if !state.grounded {
            velocity_y -= tuning.gravity;
        }

        let mut position = state.position;
        position.y += velocity_y;
        position += Self::horizontal_displacement(state, input, tuning);

        Proposal {
            position,
            velocity_y,
            grounded: state.grounded,
        }
    }

    /// Camera-relative displacement. Pressed directions add up without
    /// normalization, so diagonals move faster than a single axis.
    pub fn horizontal_displacement(
        state: &LocalPlayerState,
        input: &TickInput,
        tuning: &MovementTuning,
    ) -> Vec3 {
        let speed = if state.mode.is_sliding() {
            tuning.slide_speed
        } else {
            tuning.move_speed
        };
        let (sin, cos) = state.yaw.sin_cos();
        let forward = Vec3::new(-sin, 0.0, -cos);
        let right = Vec3::new(cos, 0.0, -sin);

        let mut delta = Vec3::ZERO;
        if input.forward {
            delta += forward * speed;
        }
        if input.backward {
            delta -= forward * speed;
        }
        if input.left {
            delta -= right * speed;
        }
        if input.right {
            delta += right * speed;
        }
        delta
    }
}
