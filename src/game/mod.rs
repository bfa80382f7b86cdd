//! Client simulation modules

pub mod collision;
pub mod combat;
pub mod geometry;
pub mod map;
pub mod movement;
pub mod session;
pub mod snapshot;

pub use session::{ClientSession, InputSource, SessionSummary};
pub use snapshot::FrameSnapshot;

/// Input intent for a single tick, derived from raw key and pointer state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    /// Jump pressed this tick
    pub jump: bool,
    /// Fire button held
    pub fire: bool,
    /// Aim button held
    pub aim: bool,
    pub reload: bool,
    pub grenade: bool,
    pub slide: bool,
    /// Pointer movement since last tick, in pixels
    pub look_dx: f32,
    pub look_dy: f32,
}

/// Things that happened during a tick, for the renderer and logs
#[derive(Debug, Clone, PartialEq)]
pub enum CombatEvent {
    Fired { projectile_id: u64 },
    /// Hit-scan struck a map target (index into the map's target list)
    TargetHit(usize),
    /// Hit-scan struck a remote player's hit-box
    PlayerHit { target_id: String },
    ReloadStarted,
    ReloadCompleted,
    GrenadeThrown,
    SlideStarted,
}
