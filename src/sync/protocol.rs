//! Relay protocol message definitions
//! Every message is a JSON record `{ "type": ..., "payload": { ... } }`

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// 3-vector as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WireVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for WireVec3 {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<WireVec3> for Vec3 {
    fn from(v: WireVec3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Messages exchanged with the relay, in both directions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Message {
    /// Full roster, sent by the relay on connect
    GameState(GameStatePayload),
    PlayerJoin(PlayerJoinPayload),
    PlayerLeave(PlayerLeavePayload),
    PlayerUpdate(PlayerUpdatePayload),
    PlayerHit(PlayerHitPayload),
    PlayerShoot(PlayerShootPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatePayload {
    pub players: Vec<PlayerRecord>,
    /// Identifier the relay assigned to the receiving client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: String,
    pub position: WireVec3,
    pub rotation: WireVec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoinPayload {
    pub id: String,
    pub position: WireVec3,
    pub rotation: WireVec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeavePayload {
    pub player_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerUpdatePayload {
    pub id: String,
    pub position: WireVec3,
    pub rotation: WireVec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
    /// Per-sender monotonic counter; absent from peers that do not send one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerHitPayload {
    pub target_id: String,
    /// Target's health after the hit; filled in by the relay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerShootPayload {
    pub player_id: String,
}

/// Protocol decode/encode errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

impl Message {
    /// Parse one inbound channel event. Unknown `type` values are malformed.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Malformed)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Wire name of the message kind, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GameState(_) => "game-state",
            Self::PlayerJoin(_) => "player-join",
            Self::PlayerLeave(_) => "player-leave",
            Self::PlayerUpdate(_) => "player-update",
            Self::PlayerHit(_) => "player-hit",
            Self::PlayerShoot(_) => "player-shoot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_game_state() {
        let text = json!({
            "type": "game-state",
            "payload": {
                "players": [
                    { "id": "a", "position": { "x": 1, "y": 1.7, "z": 2 },
                      "rotation": { "x": 0, "y": 0.5, "z": 0 }, "health": 80 }
                ],
                "playerId": "b"
            }
        })
        .to_string();

        let Message::GameState(state) = Message::decode(&text).unwrap() else {
            panic!("expected game-state");
        };
        assert_eq!(state.player_id.as_deref(), Some("b"));
        assert_eq!(state.players[0].position, WireVec3 { x: 1.0, y: 1.7, z: 2.0 });
        assert_eq!(state.players[0].health, Some(80.0));
    }

    #[test]
    fn decodes_each_roster_message() {
        let join = Message::decode(
            r#"{"type":"player-join","payload":{"id":"p2","position":{"x":1,"y":1.7,"z":1},"rotation":{"x":0,"y":0,"z":0}}}"#,
        )
        .unwrap();
        assert_eq!(join.kind(), "player-join");

        let leave = Message::decode(r#"{"type":"player-leave","payload":{"playerId":"p2"}}"#).unwrap();
        assert_eq!(
            leave,
            Message::PlayerLeave(PlayerLeavePayload { player_id: "p2".to_string() })
        );

        let hit = Message::decode(r#"{"type":"player-hit","payload":{"targetId":"me","health":70}}"#)
            .unwrap();
        assert_eq!(
            hit,
            Message::PlayerHit(PlayerHitPayload { target_id: "me".to_string(), health: Some(70.0) })
        );

        let shoot = Message::decode(r#"{"type":"player-shoot","payload":{"playerId":"p3"}}"#).unwrap();
        assert_eq!(shoot.kind(), "player-shoot");
    }

    #[test]
    fn update_without_health_or_seq_is_accepted() {
        let update = Message::decode(
            r#"{"type":"player-update","payload":{"id":"p2","position":{"x":2,"y":1.7,"z":2},"rotation":{"x":0,"y":1,"z":0}}}"#,
        )
        .unwrap();
        let Message::PlayerUpdate(update) = update else {
            panic!("expected player-update");
        };
        assert_eq!(update.health, None);
        assert_eq!(update.seq, None);
    }

    #[test]
    fn rejects_unknown_type_and_bad_payloads() {
        assert!(Message::decode(r#"{"type":"chat","payload":{"text":"hi"}}"#).is_err());
        assert!(Message::decode(r#"{"type":"player-leave","payload":{}}"#).is_err());
        assert!(Message::decode("not json").is_err());
        assert!(Message::decode(r#"{"payload":{"playerId":"x"}}"#).is_err());
    }

    #[test]
    fn encodes_outbound_shapes() {
        let msg = Message::PlayerShoot(PlayerShootPayload { player_id: "me".to_string() });
        let value: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value, json!({ "type": "player-shoot", "payload": { "playerId": "me" } }));

        let msg = Message::PlayerHit(PlayerHitPayload { target_id: "p2".to_string(), health: None });
        let value: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value, json!({ "type": "player-hit", "payload": { "targetId": "p2" } }));

        let msg = Message::PlayerUpdate(PlayerUpdatePayload {
            id: "me".to_string(),
            position: Vec3::new(1.0, 2.0, 3.0).into(),
            rotation: WireVec3::default(),
            health: None,
            seq: Some(7),
        });
        let value: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "player-update");
        assert_eq!(value["payload"]["position"], json!({ "x": 1.0, "y": 2.0, "z": 3.0 }));
        assert_eq!(value["payload"]["seq"], 7);
        assert!(value["payload"].get("health").is_none());
    }
}
