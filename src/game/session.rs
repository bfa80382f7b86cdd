//! Client session and its fixed-step tick loop

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use tracing::{debug, info};

use crate::sync::handler::{LocalEffect, SyncHandler, SyncStats};
use crate::sync::transport::Transport;

use super::collision::CollisionResolver;
use super::combat::{
    CombatState, CombatSystem, FireOutcome, HitTarget, Projectile, WeaponTuning,
};
use super::map::StaticGeometry;
use super::movement::{Integrator, LocalPlayerState, MovementTuning};
use super::snapshot::{FrameSnapshot, SnapshotBuilder, SnapshotSource};
use super::{CombatEvent, TickInput};

pub const DEFAULT_HEALTH: f32 = 100.0;

/// Supplies the input for each tick (keyboard/mouse adapter, bot, replay)
pub trait InputSource {
    fn next_input(&mut self, latest: &FrameSnapshot) -> TickInput;
}

/// Gameplay counters for the session summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub shots_fired: u32,
    pub player_hits: u32,
    pub target_hits: u32,
    pub reloads: u32,
    pub grenades_thrown: u32,
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub player_id: Option<String>,
    pub ticks: u64,
    pub health: f32,
    pub remote_players: usize,
    pub stats: SessionStats,
    pub sync: SyncStats,
}

/// One local player: simulation, combat, and the sync handler that owns the
/// remote registry. Every mutation happens inside [`ClientSession::tick`].
pub struct ClientSession {
    tick: u64,
    geometry: Arc<StaticGeometry>,
    movement: MovementTuning,
    weapon: WeaponTuning,
    player: LocalPlayerState,
    combat: CombatState,
    health: f32,
    aiming: bool,
    sync: SyncHandler,
    transport: Box<dyn Transport>,
    projectiles: Vec<Projectile>,
    next_projectile_id: u64,
    snapshot_builder: SnapshotBuilder,
    snapshot_tx: watch::Sender<Arc<FrameSnapshot>>,
    stats: SessionStats,
}

impl ClientSession {
    pub fn new(geometry: Arc<StaticGeometry>, transport: Box<dyn Transport>) -> Self {
        Self::with_tuning(
            geometry,
            transport,
            MovementTuning::default(),
            WeaponTuning::default(),
        )
    }

    pub fn with_tuning(
        geometry: Arc<StaticGeometry>,
        transport: Box<dyn Transport>,
        movement: MovementTuning,
        weapon: WeaponTuning,
    ) -> Self {
        let player = LocalPlayerState::spawn(&movement);
        let combat = CombatState::new(&weapon);
        let sync = SyncHandler::new();
        let mut snapshot_builder = SnapshotBuilder::new();

        let initial = snapshot_builder.build(
            SnapshotSource {
                tick: 0,
                now: Instant::now(),
                player_id: None,
                player: &player,
                combat: &combat,
                health: DEFAULT_HEALTH,
                aiming: false,
                registry: sync.registry(),
                projectiles: &[],
            },
            Vec::new(),
        );
        let (snapshot_tx, _) = watch::channel(Arc::new(initial));

        Self {
            tick: 0,
            geometry,
            movement,
            weapon,
            player,
            combat,
            health: DEFAULT_HEALTH,
            aiming: false,
            sync,
            transport,
            projectiles: Vec::new(),
            next_projectile_id: 0,
            snapshot_builder,
            snapshot_tx,
            stats: SessionStats::default(),
        }
    }

    pub fn player(&self) -> &LocalPlayerState {
        &self.player
    }

    /// Mutable access for spawning and scripted setups outside the tick
    pub fn player_mut(&mut self) -> &mut LocalPlayerState {
        &mut self.player
    }

    pub fn combat(&self) -> &CombatState {
        &self.combat
    }

    pub fn combat_mut(&mut self) -> &mut CombatState {
        &mut self.combat
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn sync(&self) -> &SyncHandler {
        &self.sync
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Latest published snapshot
    pub fn latest(&self) -> Arc<FrameSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Receiver that always holds the newest snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<FrameSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Queue one raw inbound channel event for the next dispatch point
    pub fn enqueue_inbound(&mut self, text: &str) {
        self.sync.enqueue_raw(text);
    }

    /// Advance the simulation by one fixed step
    pub fn tick(&mut self, now: Instant, input: &TickInput) -> Arc<FrameSnapshot> {
        self.tick += 1;
        let mut events = Vec::new();

        // Dispatch phase: the only place the registry changes
        for effect in self.sync.dispatch(now) {
            match effect {
                LocalEffect::IdAssigned(id) => debug!(player_id = %id, "Session id set"),
                LocalEffect::Health(health) => self.health = health,
            }
        }

        // Timed state
        Integrator::expire_slide(&mut self.player, now);
        if self.combat.advance(now) {
            self.stats.reloads += 1;
            events.push(CombatEvent::ReloadCompleted);
        }
        self.projectiles.retain(|p| !p.is_expired(now));

        // Movement
        self.aiming = input.aim;
        if input.slide && Integrator::begin_slide(&mut self.player, &self.movement, now) {
            events.push(CombatEvent::SlideStarted);
        }
        let previous = self.player.position;
        let proposal = Integrator::step(&mut self.player, input, &self.movement);
        let resolved = CollisionResolver::resolve(
            previous,
            &proposal,
            &self.geometry,
            self.movement.eye_height,
        );
        self.player.position = resolved.position;
        self.player.velocity.y = resolved.velocity_y;
        self.player.grounded = resolved.grounded;

        // Combat
        if input.reload && self.combat.request_reload(now, &self.weapon) {
            events.push(CombatEvent::ReloadStarted);
        }
        if input.grenade && self.combat.throw_grenade() {
            self.stats.grenades_thrown += 1;
            events.push(CombatEvent::GrenadeThrown);
        }
        if input.fire {
            self.fire(now, &mut events);
        }

        // Outbound pose
        if let Some(update) = self
            .sync
            .player_update(self.player.position, self.player.rotation())
        {
            self.sync.send(self.transport.as_ref(), &update);
        }

        let snapshot = Arc::new(self.snapshot_builder.build(
            SnapshotSource {
                tick: self.tick,
                now,
                player_id: self.sync.local_id(),
                player: &self.player,
                combat: &self.combat,
                health: self.health,
                aiming: self.aiming,
                registry: self.sync.registry(),
                projectiles: &self.projectiles,
            },
            events,
        ));
        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }

    fn fire(&mut self, now: Instant, events: &mut Vec<CombatEvent>) {
        match self.combat.fire(now, &self.weapon) {
            FireOutcome::Fired => {}
            FireOutcome::ReloadStarted => {
                events.push(CombatEvent::ReloadStarted);
                return;
            }
            FireOutcome::Refused(_) => return,
        }

        // Ray follows the camera as it was shown when the trigger was pulled
        let ray = CombatSystem::muzzle_ray(
            self.player.position,
            self.player.yaw,
            self.player.view_pitch(),
            &self.weapon,
        );
        self.player.recoil += self.weapon.recoil_impulse;

        let hit = CombatSystem::hit_scan(
            &ray,
            &self.geometry,
            self.sync.registry().iter().map(|e| (e.id.as_str(), e.position)),
            self.weapon.hitscan_range,
        );

        let projectile_id = self.next_projectile_id;
        self.next_projectile_id += 1;
        self.projectiles.push(Projectile::new(
            projectile_id,
            &ray,
            now,
            hit.as_ref().map(|h| h.point),
            &self.weapon,
        ));
        self.stats.shots_fired += 1;
        events.push(CombatEvent::Fired { projectile_id });

        if let Some(shoot) = self.sync.player_shoot() {
            self.sync.send(self.transport.as_ref(), &shoot);
        }

        match hit.map(|h| h.target) {
            Some(HitTarget::Player(target_id)) => {
                self.stats.player_hits += 1;
                if let Some(msg) = self.sync.player_hit(&target_id) {
                    self.sync.send(self.transport.as_ref(), &msg);
                }
                events.push(CombatEvent::PlayerHit { target_id });
            }
            Some(HitTarget::Target(index)) => {
                self.stats.target_hits += 1;
                events.push(CombatEvent::TargetHit(index));
            }
            Some(HitTarget::World) | None => {}
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            player_id: self.sync.local_id().map(str::to_string),
            ticks: self.tick,
            health: self.health,
            remote_players: self.sync.registry().len(),
            stats: self.stats.clone(),
            sync: self.sync.stats().clone(),
        }
    }

    /// Drive the session in real time until `shutdown` flips or the input
    /// source's channel closes. Inbound events are queued as they arrive and
    /// applied at the start of the next tick.
    pub async fn run<I: InputSource>(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<String>,
        mut input: I,
        tick_duration: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> SessionSummary {
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut inbound_open = true;

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    let latest = self.latest();
                    let tick_input = input.next_input(&latest);
                    self.tick(Instant::now(), &tick_input);
                }
                maybe_text = inbound.recv(), if inbound_open => {
                    match maybe_text {
                        Some(text) => self.enqueue_inbound(&text),
                        None => {
                            info!(player_id = ?self.sync.local_id(), "Relay channel closed");
                            inbound_open = false;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        let summary = self.summary();
        info!(
            player_id = ?summary.player_id,
            ticks = summary.ticks,
            shots = summary.stats.shots_fired,
            hits = summary.stats.player_hits,
            "Session stopped"
        );
        summary
    }
}
