//! In-process relay hub
//!
//! Stands in for the remote relay: assigns each connecting client an id,
//! sends it the current roster, and fans player events out to everyone else.
//! Hit claims are turned into health changes here so all clients agree.

use std::sync::Arc;

use dashmap::DashMap;
use glam::Vec3;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::protocol::{
    GameStatePayload, Message, PlayerHitPayload, PlayerJoinPayload, PlayerLeavePayload,
    PlayerRecord, PlayerUpdatePayload,
};
use super::transport::{ChannelTransport, RelayLink};

pub const MAX_HEALTH: f32 = 100.0;
const SPAWN_EYE_HEIGHT: f32 = 1.7;

/// Relay-side view of one connected client
#[derive(Debug, Clone)]
struct RelayPeer {
    tx: mpsc::UnboundedSender<String>,
    position: Vec3,
    rotation: Vec3,
    health: f32,
}

impl RelayPeer {
    fn record(&self, id: &str) -> PlayerRecord {
        PlayerRecord {
            id: id.to_string(),
            position: self.position.into(),
            rotation: self.rotation.into(),
            health: Some(self.health),
        }
    }
}

pub struct LoopbackRelay {
    peers: DashMap<String, RelayPeer>,
    hit_damage: f32,
}

impl LoopbackRelay {
    pub fn new(hit_damage: f32) -> Arc<Self> {
        Arc::new(Self {
            peers: DashMap::new(),
            hit_damage,
        })
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn health_of(&self, id: &str) -> Option<f32> {
        self.peers.get(id).map(|p| p.value().health)
    }

    /// Connect a new client. Must be called inside a tokio runtime; the
    /// relay spawns a reader task that lives until the client's transport
    /// is dropped.
    pub fn connect(self: &Arc<Self>) -> (String, RelayLink) {
        let id = Uuid::new_v4().to_string();
        let (to_client_tx, to_client_rx) = mpsc::unbounded_channel();
        let (from_client_tx, mut from_client_rx) = mpsc::unbounded_channel::<String>();

        let peer = RelayPeer {
            tx: to_client_tx,
            position: Vec3::new(0.0, SPAWN_EYE_HEIGHT, 0.0),
            rotation: Vec3::ZERO,
            health: MAX_HEALTH,
        };
        self.peers.insert(id.clone(), peer.clone());

        let roster: Vec<PlayerRecord> = self
            .peers
            .iter()
            .map(|entry| entry.value().record(entry.key()))
            .collect();
        self.send_to(
            &id,
            &Message::GameState(GameStatePayload {
                players: roster,
                player_id: Some(id.clone()),
            }),
        );
        self.broadcast_except(
            &id,
            &Message::PlayerJoin(PlayerJoinPayload {
                id: id.clone(),
                position: peer.position.into(),
                rotation: peer.rotation.into(),
            }),
        );
        info!(player_id = %id, peers = self.peers.len(), "Client connected to relay");

        let relay = Arc::clone(self);
        let reader_id = id.clone();
        tokio::spawn(async move {
            while let Some(text) = from_client_rx.recv().await {
                relay.handle(&reader_id, &text);
            }
            relay.disconnect(&reader_id);
        });

        let link = RelayLink {
            transport: ChannelTransport::new(from_client_tx),
            inbound: to_client_rx,
        };
        (id, link)
    }

    /// Remove a client and tell everyone else
    pub fn disconnect(&self, id: &str) {
        if self.peers.remove(id).is_some() {
            info!(player_id = %id, "Client left relay");
            self.broadcast_except(
                id,
                &Message::PlayerLeave(PlayerLeavePayload { player_id: id.to_string() }),
            );
        }
    }

    /// Handle one raw message from client `from`
    pub fn handle(&self, from: &str, text: &str) {
        let msg = match Message::decode(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(player_id = %from, error = %e, "Relay dropping malformed message");
                return;
            }
        };

        match msg {
            Message::PlayerUpdate(update) => {
                if update.id != from {
                    warn!(player_id = %from, claimed = %update.id, "Update for another player ignored");
                    return;
                }
                let health = match self.peers.get_mut(from) {
                    Some(mut peer) => {
                        peer.position = update.position.into();
                        peer.rotation = update.rotation.into();
                        peer.health
                    }
                    None => return,
                };
                self.broadcast_except(
                    from,
                    &Message::PlayerUpdate(PlayerUpdatePayload {
                        health: Some(health),
                        ..update
                    }),
                );
            }
            Message::PlayerShoot(shoot) => {
                if shoot.player_id == from {
                    self.broadcast_except(from, &Message::PlayerShoot(shoot));
                }
            }
            Message::PlayerHit(hit) => {
                if hit.target_id == from {
                    return;
                }
                let health = match self.peers.get_mut(&hit.target_id) {
                    Some(mut target) => {
                        target.health = (target.health - self.hit_damage).max(0.0);
                        target.health
                    }
                    None => {
                        debug!(player_id = %from, target_id = %hit.target_id, "Hit on unknown player");
                        return;
                    }
                };
                debug!(player_id = %from, target_id = %hit.target_id, health, "Hit applied");
                self.broadcast(&Message::PlayerHit(PlayerHitPayload {
                    target_id: hit.target_id,
                    health: Some(health),
                }));
            }
            other => {
                debug!(player_id = %from, kind = other.kind(), "Relay ignoring client message");
            }
        }
    }

    fn send_to(&self, id: &str, msg: &Message) {
        let Some(peer) = self.peers.get(id) else {
            return;
        };
        match msg.encode() {
            Ok(text) => {
                if peer.tx.send(text).is_err() {
                    debug!(player_id = %id, "Client receiver dropped");
                }
            }
            Err(e) => warn!(error = %e, "Relay failed to encode message"),
        }
    }

    fn broadcast(&self, msg: &Message) {
        self.fan_out(None, msg);
    }

    fn broadcast_except(&self, skip: &str, msg: &Message) {
        self.fan_out(Some(skip), msg);
    }

    fn fan_out(&self, skip: Option<&str>, msg: &Message) {
        let text = match msg.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Relay failed to encode message");
                return;
            }
        };
        for entry in self.peers.iter() {
            if Some(entry.key().as_str()) == skip {
                continue;
            }
            // Receivers that have gone away are cleaned up by their reader task
            let _ = entry.value().tx.send(text.clone());
        }
    }
}
