//! Collision resolver: arena bounds, platform landing and the ground plane

use glam::Vec3;

use super::map::StaticGeometry;
use super::movement::Proposal;

/// Player footprint radius kept inside the arena bounds
pub const PLAYER_RADIUS: f32 = 0.5;

/// Extra height above a platform top that still counts as standing on it
pub const PLATFORM_TOLERANCE: f32 = 0.1;

/// Corrected kinematic state after collision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub position: Vec3,
    pub velocity_y: f32,
    pub grounded: bool,
    /// Index of the platform stood on, if any
    pub platform: Option<usize>,
}

pub struct CollisionResolver;

impl CollisionResolver {
    /// Resolve a proposed eye position against static geometry.
    ///
    /// Horizontal axes outside the arena keep their previous value for this
    /// tick; vertical motion always applies. The first platform in map order
    /// whose footprint and height band contain the player wins.
    pub fn resolve(
        previous: Vec3,
        proposal: &Proposal,
        geometry: &StaticGeometry,
        eye_height: f32,
    ) -> Resolution {
        let limit = geometry.arena_half_extent - PLAYER_RADIUS;
        let x = if proposal.position.x.abs() < limit {
            proposal.position.x
        } else {
            previous.x
        };
        let z = if proposal.position.z.abs() < limit {
            proposal.position.z
        } else {
            previous.z
        };

        let mut position = Vec3::new(x, proposal.position.y, z);
        let mut velocity_y = proposal.velocity_y;
        let mut grounded = proposal.grounded;

        let feet = position.y - eye_height;
        let platform = geometry.platforms.iter().position(|volume| {
            volume.contains_xz(position.x, position.z)
                && feet >= volume.min.y
                && feet <= volume.max.y + PLATFORM_TOLERANCE
        });

        if let Some(index) = platform {
            position.y = geometry.platforms[index].max.y + eye_height;
            velocity_y = 0.0;
            grounded = true;
        } else {
            let baseline = geometry.ground_height + eye_height;
            if position.y <= baseline {
                position.y = baseline;
                velocity_y = 0.0;
                grounded = true;
            } else {
                grounded = false;
            }
        }

        Resolution {
            position,
            velocity_y,
            grounded,
            platform,
        }
    }
}
