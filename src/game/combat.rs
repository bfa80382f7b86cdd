//! Combat system - ammunition, reload and grenade state, hit-scan resolution

use std::time::{Duration, Instant};

use glam::{EulerRot, Quat, Vec3};

use crate::util::time::Deadline;

use super::geometry::{ray_ground_distance, Aabb};
use super::map::StaticGeometry;

/// Weapon constants
#[derive(Debug, Clone, Copy)]
pub struct WeaponTuning {
    pub max_ammo: u32,
    pub max_grenades: u32,
    pub reload_time: Duration,
    /// Minimum interval between shots
    pub fire_interval: Duration,
    pub muzzle_flash_time: Duration,
    /// Added to the player's recoil offset per shot
    pub recoil_impulse: f32,
    pub projectile_lifetime: Duration,
    pub hitscan_range: f32,
    /// Ray origin offset below the camera
    pub muzzle_drop: f32,
    /// Ray origin offset along the camera forward vector
    pub muzzle_forward: f32,
}

impl Default for WeaponTuning {
    fn default() -> Self {
        Self {
            max_ammo: 30,
            max_grenades: 5,
            reload_time: Duration::from_millis(2000),
            fire_interval: Duration::from_millis(100),
            muzzle_flash_time: Duration::from_millis(50),
            recoil_impulse: -0.02,
            projectile_lifetime: Duration::from_millis(500),
            hitscan_range: 1000.0,
            muzzle_drop: 0.1,
            muzzle_forward: 0.5,
        }
    }
}

/// Weapon state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponPhase {
    Ready,
    Cooldown { until: Deadline },
    Reloading { until: Deadline },
}

/// Result of a fire request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// A round was spent; the caller runs the hit-scan
    Fired,
    /// Magazine was empty, a reload started instead
    ReloadStarted,
    Refused(FireRefusal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireRefusal {
    Reloading,
    Cooldown,
}

/// Ammunition and grenade state for the local weapon
#[derive(Debug, Clone, PartialEq)]
pub struct CombatState {
    pub ammo: u32,
    pub grenades: u32,
    pub phase: WeaponPhase,
    pub muzzle_flash: bool,
    muzzle_flash_until: Option<Deadline>,
    max_ammo: u32,
}

impl CombatState {
    pub fn new(tuning: &WeaponTuning) -> Self {
        Self {
            ammo: tuning.max_ammo,
            grenades: tuning.max_grenades,
            phase: WeaponPhase::Ready,
            muzzle_flash: false,
            muzzle_flash_until: None,
            max_ammo: tuning.max_ammo,
        }
    }

    pub fn is_reloading(&self) -> bool {
        matches!(self.phase, WeaponPhase::Reloading { .. })
    }

    /// Expire due timers. Returns true if a reload completed on this call.
    pub fn advance(&mut self, now: Instant) -> bool {
        if let Some(until) = self.muzzle_flash_until {
            if until.is_due(now) {
                self.muzzle_flash = false;
                self.muzzle_flash_until = None;
            }
        }

        match self.phase {
            WeaponPhase::Cooldown { until } if until.is_due(now) => {
                self.phase = WeaponPhase::Ready;
                false
            }
            WeaponPhase::Reloading { until } if until.is_due(now) => {
                self.ammo = self.max_ammo;
                self.phase = WeaponPhase::Ready;
                true
            }
            _ => false,
        }
    }

    /// Attempt to fire. Call [`CombatState::advance`] first on the same tick.
    pub fn fire(&mut self, now: Instant, tuning: &WeaponTuning) -> FireOutcome {
        match self.phase {
            WeaponPhase::Reloading { .. } => FireOutcome::Refused(FireRefusal::Reloading),
            WeaponPhase::Cooldown { .. } => FireOutcome::Refused(FireRefusal::Cooldown),
            WeaponPhase::Ready if self.ammo == 0 => {
                self.start_reload(now, tuning);
                FireOutcome::ReloadStarted
            }
            WeaponPhase::Ready => {
                self.ammo -= 1;
                self.phase = WeaponPhase::Cooldown {
                    until: Deadline::after(now, tuning.fire_interval),
                };
                self.muzzle_flash = true;
                self.muzzle_flash_until = Some(Deadline::after(now, tuning.muzzle_flash_time));
                FireOutcome::Fired
            }
        }
    }

    /// Explicit reload. Ignored while reloading or with a full magazine.
    pub fn request_reload(&mut self, now: Instant, tuning: &WeaponTuning) -> bool {
        if self.is_reloading() || self.ammo >= self.max_ammo {
            return false;
        }
        self.start_reload(now, tuning);
        true
    }

    fn start_reload(&mut self, now: Instant, tuning: &WeaponTuning) {
        self.phase = WeaponPhase::Reloading {
            until: Deadline::after(now, tuning.reload_time),
        };
    }

    /// Spend a grenade if any remain
    pub fn throw_grenade(&mut self) -> bool {
        if self.grenades == 0 {
            return false;
        }
        self.grenades -= 1;
        true
    }
}

/// Transient tracer for a fired round
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: u64,
    pub origin: Vec3,
    pub direction: Vec3,
    pub created_at: Instant,
    pub expires: Deadline,
    /// Where the hit-scan landed, if it hit anything
    pub impact: Option<Vec3>,
}

impl Projectile {
    pub fn new(id: u64, ray: &Ray, now: Instant, impact: Option<Vec3>, tuning: &WeaponTuning) -> Self {
        Self {
            id,
            origin: ray.origin,
            direction: ray.direction,
            created_at: now,
            expires: Deadline::after(now, tuning.projectile_lifetime),
            impact,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires.is_due(now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
}

/// What the hit-scan ray struck first
#[derive(Debug, Clone, PartialEq)]
pub enum HitTarget {
    /// Ground, platform or wall
    World,
    /// Index into the map's target list
    Target(usize),
    /// Remote player hit-box
    Player(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitScanResult {
    pub target: HitTarget,
    pub distance: f32,
    pub point: Vec3,
}

/// Remote player capsule (radius 0.3, height 1.6) approximated as a box
/// centred 0.7 below the eye position.
pub const PLAYER_HITBOX_HALF: Vec3 = Vec3::new(0.3, 0.8, 0.3);
pub const PLAYER_HITBOX_DROP: f32 = 0.7;

pub fn player_hitbox(eye: Vec3) -> Aabb {
    let center = eye - Vec3::new(0.0, PLAYER_HITBOX_DROP, 0.0);
    Aabb::new(center - PLAYER_HITBOX_HALF, center + PLAYER_HITBOX_HALF)
}

/// Combat helpers for hit-scan resolution
pub struct CombatSystem;

impl CombatSystem {
    /// Camera forward vector for a YXZ (yaw, pitch) camera looking down -Z
    pub fn camera_forward(yaw: f32, pitch: f32) -> Vec3 {
        Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0) * Vec3::NEG_Z
    }

    /// Ray used by the hit-scan: starts below and ahead of the camera
    pub fn muzzle_ray(eye: Vec3, yaw: f32, view_pitch: f32, tuning: &WeaponTuning) -> Ray {
        let direction = Self::camera_forward(yaw, view_pitch).normalize();
        let origin = eye - Vec3::new(0.0, tuning.muzzle_drop, 0.0) + direction * tuning.muzzle_forward;
        Ray { origin, direction }
    }

    /// Cast against world geometry, targets and remote hit-boxes. The nearest
    /// intersection wins; on equal distance the earlier category wins
    /// (world, then targets, then players in iteration order).
    pub fn hit_scan<'a>(
        ray: &Ray,
        geometry: &StaticGeometry,
        players: impl IntoIterator<Item = (&'a str, Vec3)>,
        range: f32,
    ) -> Option<HitScanResult> {
        let mut best: Option<(f32, HitTarget)> = None;
        let mut consider = |distance: Option<f32>, target: HitTarget| {
            if let Some(d) = distance {
                if best.as_ref().map_or(true, |(b, _)| d < *b) {
                    best = Some((d, target));
                }
            }
        };

        consider(
            ray_ground_distance(
                ray.origin,
                ray.direction,
                geometry.ground_height,
                geometry.arena_half_extent + 1.0,
                range,
            ),
            HitTarget::World,
        );
        for volume in geometry.platforms.iter().chain(&geometry.walls) {
            consider(volume.ray_distance(ray.origin, ray.direction, range), HitTarget::World);
        }
        for (index, target) in geometry.targets.iter().enumerate() {
            consider(target.ray_distance(ray.origin, ray.direction, range), HitTarget::Target(index));
        }
        for (id, eye) in players {
            consider(
                player_hitbox(eye).ray_distance(ray.origin, ray.direction, range),
                HitTarget::Player(id.to_string()),
            );
        }

        best.map(|(distance, target)| HitScanResult {
            point: ray.origin + ray.direction * distance,
            target,
            distance,
        })
    }
}
