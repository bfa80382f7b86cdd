//! Synchronization protocol handler
//!
//! Inbound messages are queued as they arrive and applied only when the
//! session drains the queue at its dispatch point, so the registry has a
//! single writer. Outbound messages are built from local simulation output.

use std::collections::VecDeque;
use std::time::Instant;

use glam::Vec3;
use tracing::{debug, info, trace};

use super::protocol::{
    GameStatePayload, Message, PlayerHitPayload, PlayerShootPayload, PlayerUpdatePayload,
};
use super::registry::{RemotePlayerEntry, RemotePlayerRegistry, Upsert};
use super::transport::Transport;

/// Changes to local (non-registry) state requested by inbound messages
#[derive(Debug, Clone, PartialEq)]
pub enum LocalEffect {
    /// The relay told us our identifier
    IdAssigned(String),
    Health(f32),
}

/// Counters for the session summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub received: u64,
    pub dropped_malformed: u64,
    pub dropped_stale: u64,
    pub sent: u64,
    pub send_skipped: u64,
}

#[derive(Debug, Default)]
pub struct SyncHandler {
    local_id: Option<String>,
    registry: RemotePlayerRegistry,
    inbox: VecDeque<Message>,
    next_seq: u64,
    stats: SyncStats,
}

impl SyncHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    pub fn registry(&self) -> &RemotePlayerRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    fn is_self(&self, id: &str) -> bool {
        self.local_id.as_deref() == Some(id)
    }

    /// Parse and queue one raw channel event. Malformed input is dropped.
    pub fn enqueue_raw(&mut self, text: &str) -> bool {
        self.stats.received += 1;
        match Message::decode(text) {
            Ok(msg) => {
                self.inbox.push_back(msg);
                true
            }
            Err(e) => {
                self.stats.dropped_malformed += 1;
                debug!(error = %e, "Dropping inbound message");
                false
            }
        }
    }

    pub fn enqueue(&mut self, msg: Message) {
        self.inbox.push_back(msg);
    }

    /// Apply every queued message in arrival order
    pub fn dispatch(&mut self, now: Instant) -> Vec<LocalEffect> {
        let mut effects = Vec::new();
        while let Some(msg) = self.inbox.pop_front() {
            self.apply(msg, now, &mut effects);
        }
        effects
    }

    /// Apply a single message
    pub fn apply(&mut self, msg: Message, now: Instant, effects: &mut Vec<LocalEffect>) {
        match msg {
            Message::GameState(state) => self.apply_game_state(state, effects),
            Message::PlayerJoin(join) => {
                if !self.is_self(&join.id) {
                    debug!(player_id = %join.id, "Player joined");
                    self.registry.insert(RemotePlayerEntry::new(
                        join.id,
                        join.position.into(),
                        join.rotation.into(),
                    ));
                }
            }
            Message::PlayerLeave(leave) => {
                if self.registry.remove(&leave.player_id).is_some() {
                    debug!(player_id = %leave.player_id, "Player left");
                }
            }
            Message::PlayerUpdate(update) => {
                if self.is_self(&update.id) {
                    if let Some(health) = update.health {
                        effects.push(LocalEffect::Health(health));
                    }
                } else if self.registry.upsert(
                    &update.id,
                    update.position.into(),
                    update.rotation.into(),
                    update.health,
                    update.seq,
                ) == Upsert::Stale
                {
                    self.stats.dropped_stale += 1;
                    trace!(player_id = %update.id, seq = ?update.seq, "Stale update discarded");
                }
            }
            Message::PlayerHit(hit) => {
                if self.is_self(&hit.target_id) {
                    if let Some(health) = hit.health {
                        effects.push(LocalEffect::Health(health));
                    }
                }
            }
            Message::PlayerShoot(shoot) => {
                if !self.is_self(&shoot.player_id) {
                    self.registry.record_shot(&shoot.player_id, now);
                }
            }
        }
    }

    fn apply_game_state(&mut self, state: GameStatePayload, effects: &mut Vec<LocalEffect>) {
        // Adopt the id before filtering so the first roster never lists us
        if self.local_id.is_none() {
            if let Some(id) = state.player_id {
                info!(player_id = %id, "Assigned player id");
                self.local_id = Some(id.clone());
                effects.push(LocalEffect::IdAssigned(id));
            }
        }

        let mut entries = Vec::with_capacity(state.players.len());
        for record in state.players {
            if self.is_self(&record.id) {
                if let Some(health) = record.health {
                    effects.push(LocalEffect::Health(health));
                }
                continue;
            }
            let mut entry =
                RemotePlayerEntry::new(record.id, record.position.into(), record.rotation.into());
            entry.health = record.health;
            entries.push(entry);
        }
        self.registry.replace_all(entries);
    }

    /// Per-tick pose broadcast; `None` until an id is assigned
    pub fn player_update(&mut self, position: Vec3, rotation: Vec3) -> Option<Message> {
        let id = self.local_id.clone()?;
        self.next_seq += 1;
        Some(Message::PlayerUpdate(PlayerUpdatePayload {
            id,
            position: position.into(),
            rotation: rotation.into(),
            health: None,
            seq: Some(self.next_seq),
        }))
    }

    pub fn player_shoot(&self) -> Option<Message> {
        let player_id = self.local_id.clone()?;
        Some(Message::PlayerShoot(PlayerShootPayload { player_id }))
    }

    pub fn player_hit(&self, target_id: &str) -> Option<Message> {
        self.local_id.as_ref()?;
        Some(Message::PlayerHit(PlayerHitPayload {
            target_id: target_id.to_string(),
            health: None,
        }))
    }

    /// Encode and send. Skipped silently when the channel is not open.
    pub fn send(&mut self, transport: &dyn Transport, msg: &Message) {
        if !transport.is_open() {
            self.stats.send_skipped += 1;
            trace!(kind = msg.kind(), "Transport not open, skipping send");
            return;
        }
        let result = msg
            .encode()
            .map_err(|e| e.to_string())
            .and_then(|text| transport.send_text(text).map_err(|e| e.to_string()));
        match result {
            Ok(()) => self.stats.sent += 1,
            Err(e) => {
                self.stats.send_skipped += 1;
                trace!(kind = msg.kind(), error = %e, "Send failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::protocol::{
        PlayerJoinPayload, PlayerLeavePayload, PlayerRecord, WireVec3,
    };
    use crate::sync::transport::ChannelTransport;

    fn v(x: f32, y: f32, z: f32) -> WireVec3 {
        WireVec3 { x, y, z }
    }

    fn with_id(id: &str) -> SyncHandler {
        let mut handler = SyncHandler::new();
        handler.enqueue(Message::GameState(GameStatePayload {
            players: vec![],
            player_id: Some(id.to_string()),
        }));
        handler.dispatch(Instant::now());
        handler
    }

    fn update(id: &str, position: WireVec3, health: Option<f32>) -> Message {
        Message::PlayerUpdate(PlayerUpdatePayload {
            id: id.to_string(),
            position,
            rotation: v(0.0, 1.0, 0.0),
            health,
            seq: None,
        })
    }

    #[test]
    fn join_update_leave_sequence() {
        let mut handler = with_id("me");
        handler.enqueue(Message::PlayerJoin(PlayerJoinPayload {
            id: "p2".to_string(),
            position: v(1.0, 1.7, 1.0),
            rotation: v(0.0, 0.0, 0.0),
        }));
        handler.enqueue(update("p2", v(2.0, 1.7, 2.0), None));
        handler.dispatch(Instant::now());

        assert_eq!(
            handler.registry().get("p2").unwrap().position,
            Vec3::new(2.0, 1.7, 2.0)
        );

        handler.enqueue(Message::PlayerLeave(PlayerLeavePayload { player_id: "p2".to_string() }));
        handler.dispatch(Instant::now());
        assert!(!handler.registry().contains("p2"));
    }

    #[test]
    fn duplicate_update_is_idempotent() {
        let now = Instant::now();
        let mut once = with_id("me");
        once.enqueue(update("p2", v(3.0, 1.7, 3.0), Some(50.0)));
        once.dispatch(now);

        let mut twice = with_id("me");
        twice.enqueue(update("p2", v(3.0, 1.7, 3.0), Some(50.0)));
        twice.enqueue(update("p2", v(3.0, 1.7, 3.0), Some(50.0)));
        twice.dispatch(now);

        assert_eq!(once.registry(), twice.registry());
    }

    #[test]
    fn leave_for_unknown_id_is_noop() {
        let mut handler = with_id("me");
        let before = handler.registry().clone();
        handler.enqueue(Message::PlayerLeave(PlayerLeavePayload { player_id: "ghost".to_string() }));
        assert!(handler.dispatch(Instant::now()).is_empty());
        assert_eq!(handler.registry(), &before);
    }

    #[test]
    fn first_game_state_adopts_id_and_excludes_self() {
        let mut handler = SyncHandler::new();
        handler.enqueue(Message::GameState(GameStatePayload {
            players: vec![
                PlayerRecord { id: "me".to_string(), position: v(0.0, 1.7, 0.0), rotation: v(0.0, 0.0, 0.0), health: Some(75.0) },
                PlayerRecord { id: "p2".to_string(), position: v(5.0, 1.7, 5.0), rotation: v(0.0, 0.0, 0.0), health: Some(100.0) },
            ],
            player_id: Some("me".to_string()),
        }));

        let effects = handler.dispatch(Instant::now());
        assert_eq!(
            effects,
            vec![LocalEffect::IdAssigned("me".to_string()), LocalEffect::Health(75.0)]
        );
        assert_eq!(handler.local_id(), Some("me"));
        assert!(!handler.registry().contains("me"));
        assert_eq!(handler.registry().len(), 1);
    }

    #[test]
    fn later_game_state_keeps_first_id_and_replaces_roster() {
        let mut handler = with_id("me");
        handler.enqueue(update("old", v(1.0, 1.7, 1.0), None));
        handler.enqueue(Message::GameState(GameStatePayload {
            players: vec![PlayerRecord {
                id: "p3".to_string(),
                position: v(0.0, 1.7, 0.0),
                rotation: v(0.0, 0.0, 0.0),
                health: None,
            }],
            player_id: Some("someone-else".to_string()),
        }));

        let effects = handler.dispatch(Instant::now());
        assert!(effects.is_empty());
        assert_eq!(handler.local_id(), Some("me"));
        assert!(!handler.registry().contains("old"));
        assert!(handler.registry().contains("p3"));
    }

    #[test]
    fn messages_about_self_only_touch_health() {
        let mut handler = with_id("me");
        handler.enqueue(update("me", v(9.0, 9.0, 9.0), Some(60.0)));
        handler.enqueue(Message::PlayerJoin(PlayerJoinPayload {
            id: "me".to_string(),
            position: v(9.0, 9.0, 9.0),
            rotation: v(0.0, 0.0, 0.0),
        }));
        handler.enqueue(Message::PlayerHit(PlayerHitPayload { target_id: "me".to_string(), health: Some(40.0) }));
        handler.enqueue(Message::PlayerHit(PlayerHitPayload { target_id: "p2".to_string(), health: Some(10.0) }));
        handler.enqueue(Message::PlayerShoot(PlayerShootPayload { player_id: "me".to_string() }));

        let effects = handler.dispatch(Instant::now());
        assert_eq!(effects, vec![LocalEffect::Health(60.0), LocalEffect::Health(40.0)]);
        assert!(handler.registry().is_empty());
    }

    #[test]
    fn remote_shot_is_recorded() {
        let now = Instant::now();
        let mut handler = with_id("me");
        handler.enqueue(update("p2", v(1.0, 1.7, 1.0), None));
        handler.enqueue(Message::PlayerShoot(PlayerShootPayload { player_id: "p2".to_string() }));
        handler.dispatch(now);

        assert!(handler.registry().get("p2").unwrap().is_shooting(now));
    }

    #[test]
    fn malformed_input_is_dropped_without_effect() {
        let mut handler = with_id("me");
        assert!(!handler.enqueue_raw("{garbage"));
        assert!(!handler.enqueue_raw(r#"{"type":"teleport","payload":{}}"#));
        assert_eq!(handler.pending(), 0);
        assert_eq!(handler.stats().dropped_malformed, 2);

        assert!(handler.enqueue_raw(
            r#"{"type":"player-join","payload":{"id":"p2","position":{"x":1,"y":1.7,"z":1},"rotation":{"x":0,"y":0,"z":0}}}"#
        ));
        handler.dispatch(Instant::now());
        assert!(handler.registry().contains("p2"));
    }

    #[test]
    fn outbound_requires_assigned_id() {
        let mut handler = SyncHandler::new();
        assert!(handler.player_update(Vec3::ZERO, Vec3::ZERO).is_none());
        assert!(handler.player_shoot().is_none());
        assert!(handler.player_hit("p2").is_none());

        let mut handler = with_id("me");
        let Some(Message::PlayerUpdate(first)) = handler.player_update(Vec3::ZERO, Vec3::ZERO) else {
            panic!("expected update");
        };
        let Some(Message::PlayerUpdate(second)) = handler.player_update(Vec3::ZERO, Vec3::ZERO) else {
            panic!("expected update");
        };
        assert_eq!(first.id, "me");
        assert!(second.seq > first.seq);
    }

    #[test]
    fn send_skips_when_channel_unavailable() {
        let mut handler = with_id("me");
        let msg = handler.player_shoot().unwrap();

        handler.send(&ChannelTransport::not_open(), &msg);
        assert_eq!(handler.stats().send_skipped, 1);

        let (transport, mut rx) = ChannelTransport::pair();
        handler.send(&transport, &msg);
        assert_eq!(handler.stats().sent, 1);
        assert_eq!(Message::decode(&rx.try_recv().unwrap()).unwrap(), msg);
    }
}
