//! Remote player registry - last known pose and health of every peer

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use glam::Vec3;

/// How long a remote player is shown as shooting after a `player-shoot`
pub const SHOOT_DISPLAY_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayerEntry {
    pub id: String,
    /// Eye position
    pub position: Vec3,
    /// Euler rotation (pitch, yaw, roll)
    pub rotation: Vec3,
    pub health: Option<f32>,
    pub last_shot: Option<Instant>,
    /// Highest `seq` applied from this peer's updates
    pub last_seq: Option<u64>,
}

impl RemotePlayerEntry {
    pub fn new(id: String, position: Vec3, rotation: Vec3) -> Self {
        Self {
            id,
            position,
            rotation,
            health: None,
            last_shot: None,
            last_seq: None,
        }
    }

    pub fn is_shooting(&self, now: Instant) -> bool {
        self.last_shot
            .is_some_and(|shot| now.saturating_duration_since(shot) < SHOOT_DISPLAY_WINDOW)
    }
}

/// Outcome of applying a pose update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
    /// Carried a `seq` no newer than one already applied
    Stale,
}

/// Peer id → last known state. Only the sync handler mutates it; everything
/// else reads it through the per-tick snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemotePlayerRegistry {
    players: BTreeMap<String, RemotePlayerEntry>,
}

impl RemotePlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&RemotePlayerEntry> {
        self.players.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Entries in id order
    pub fn iter(&self) -> impl Iterator<Item = &RemotePlayerEntry> {
        self.players.values()
    }

    /// Replace the whole roster
    pub fn replace_all(&mut self, entries: impl IntoIterator<Item = RemotePlayerEntry>) {
        self.players = entries.into_iter().map(|e| (e.id.clone(), e)).collect();
    }

    /// Insert a fresh entry, discarding whatever was stored under its id
    pub fn insert(&mut self, entry: RemotePlayerEntry) {
        self.players.insert(entry.id.clone(), entry);
    }

    /// Insert or overwrite a pose. Last write wins unless both the stored
    /// entry and the update carry sequence numbers and the update is not newer.
    pub fn upsert(
        &mut self,
        id: &str,
        position: Vec3,
        rotation: Vec3,
        health: Option<f32>,
        seq: Option<u64>,
    ) -> Upsert {
        match self.players.get_mut(id) {
            Some(entry) => {
                if let (Some(last), Some(seq)) = (entry.last_seq, seq) {
                    if seq <= last {
                        return Upsert::Stale;
                    }
                }
                entry.position = position;
                entry.rotation = rotation;
                if health.is_some() {
                    entry.health = health;
                }
                if seq.is_some() {
                    entry.last_seq = seq;
                }
                Upsert::Updated
            }
            None => {
                let mut entry = RemotePlayerEntry::new(id.to_string(), position, rotation);
                entry.health = health;
                entry.last_seq = seq;
                self.players.insert(id.to_string(), entry);
                Upsert::Inserted
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<RemotePlayerEntry> {
        self.players.remove(id)
    }

    /// Record a shot for display. Returns false if the id is unknown.
    pub fn record_shot(&mut self, id: &str, at: Instant) -> bool {
        match self.players.get_mut(id) {
            Some(entry) => {
                entry.last_shot = Some(at);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_inserts_then_overwrites() {
        let mut registry = RemotePlayerRegistry::new();
        let a = Vec3::new(1.0, 1.7, 1.0);
        let b = Vec3::new(2.0, 1.7, 2.0);

        assert_eq!(registry.upsert("p2", a, Vec3::ZERO, None, None), Upsert::Inserted);
        assert_eq!(registry.upsert("p2", b, Vec3::ZERO, Some(90.0), None), Upsert::Updated);

        let entry = registry.get("p2").unwrap();
        assert_eq!(entry.position, b);
        assert_eq!(entry.health, Some(90.0));
    }

    #[test]
    fn stale_sequence_is_discarded() {
        let mut registry = RemotePlayerRegistry::new();
        registry.upsert("p2", Vec3::ONE, Vec3::ZERO, None, Some(5));

        assert_eq!(registry.upsert("p2", Vec3::ZERO, Vec3::ZERO, None, Some(4)), Upsert::Stale);
        assert_eq!(registry.upsert("p2", Vec3::ZERO, Vec3::ZERO, None, Some(5)), Upsert::Stale);
        assert_eq!(registry.get("p2").unwrap().position, Vec3::ONE);

        // Unsequenced updates fall back to last-write-wins
        assert_eq!(registry.upsert("p2", Vec3::X, Vec3::ZERO, None, None), Upsert::Updated);
        assert_eq!(registry.get("p2").unwrap().last_seq, Some(5));
    }

    #[test]
    fn shot_window_is_short() {
        let mut registry = RemotePlayerRegistry::new();
        registry.upsert("p2", Vec3::ONE, Vec3::ZERO, None, None);
        let now = Instant::now();

        assert!(registry.record_shot("p2", now));
        assert!(!registry.record_shot("ghost", now));

        let entry = registry.get("p2").unwrap();
        assert!(entry.is_shooting(now + Duration::from_millis(99)));
        assert!(!entry.is_shooting(now + Duration::from_millis(100)));
    }

    #[test]
    fn iterates_in_id_order() {
        let mut registry = RemotePlayerRegistry::new();
        for id in ["c", "a", "b"] {
            registry.upsert(id, Vec3::ZERO, Vec3::ZERO, None, None);
        }
        let ids: Vec<_> = registry.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
