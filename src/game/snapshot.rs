//! Per-tick read-only projection of simulation state for the renderer

use std::time::Instant;

use glam::Vec3;

use crate::sync::registry::RemotePlayerRegistry;

use super::combat::{CombatState, Projectile};
use super::movement::LocalPlayerState;
use super::CombatEvent;

#[derive(Debug, Clone, PartialEq)]
pub struct LocalView {
    pub player_id: Option<String>,
    pub position: Vec3,
    pub yaw: f32,
    /// Pitch including recoil, as the camera should show it
    pub view_pitch: f32,
    pub grounded: bool,
    pub sliding: bool,
    pub aiming: bool,
    pub health: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombatView {
    pub ammo: u32,
    pub grenades: u32,
    pub reloading: bool,
    pub muzzle_flash: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteView {
    pub id: String,
    pub position: Vec3,
    pub rotation: Vec3,
    pub shooting: bool,
}

/// Everything a renderer needs for one frame. Owns its data; holds no
/// references back into the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub tick: u64,
    pub local: LocalView,
    pub combat: CombatView,
    pub remotes: Vec<RemoteView>,
    pub projectiles: Vec<Projectile>,
    /// Events raised during this tick
    pub events: Vec<CombatEvent>,
}

impl FrameSnapshot {
    /// Players on screen, counting the local one once it has an id
    pub fn player_count(&self) -> usize {
        self.remotes.len() + usize::from(self.local.player_id.is_some())
    }
}

/// Borrowed view of the session state a snapshot is built from
pub struct SnapshotSource<'a> {
    pub tick: u64,
    pub now: Instant,
    pub player_id: Option<&'a str>,
    pub player: &'a LocalPlayerState,
    pub combat: &'a CombatState,
    pub health: f32,
    pub aiming: bool,
    pub registry: &'a RemotePlayerRegistry,
    pub projectiles: &'a [Projectile],
}

/// Builds snapshots and keeps counters for the session summary
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    stats: SnapshotStats,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(&mut self, source: SnapshotSource<'_>, events: Vec<CombatEvent>) -> FrameSnapshot {
        let remotes: Vec<RemoteView> = source
            .registry
            .iter()
            .map(|entry| RemoteView {
                id: entry.id.clone(),
                position: entry.position,
                rotation: entry.rotation,
                shooting: entry.is_shooting(source.now),
            })
            .collect();

        self.stats.record(remotes.len());

        FrameSnapshot {
            tick: source.tick,
            local: LocalView {
                player_id: source.player_id.map(str::to_string),
                position: source.player.position,
                yaw: source.player.yaw,
                view_pitch: source.player.view_pitch(),
                grounded: source.player.grounded,
                sliding: source.player.mode.is_sliding(),
                aiming: source.aiming,
                health: source.health,
            },
            combat: CombatView {
                ammo: source.combat.ammo,
                grenades: source.combat.grenades,
                reloading: source.combat.is_reloading(),
                muzzle_flash: source.combat.muzzle_flash,
            },
            remotes,
            projectiles: source.projectiles.to_vec(),
            events,
        }
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }
}

/// Snapshot counters for debugging
#[derive(Debug, Default, Clone)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub avg_remotes_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, remote_count: usize) {
        self.total_snapshots += 1;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_remotes_per_snapshot =
            self.avg_remotes_per_snapshot * ((n - 1.0) / n) + (remote_count as f32 / n);
    }
}
