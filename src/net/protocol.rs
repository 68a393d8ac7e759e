//! Wire messages
//!
//! Every frame is a JSON object `{ "type": "...", "payload": { ... } }`. There
//! is no versioning field; unknown tags fail to decode and are ignored by the
//! receiver.

use serde::{Deserialize, Serialize};

use crate::game::match_state::MatchEndReason;
use crate::game::state::{GameState, MatchPhase, Obstacle, Player, PlayerId, Role, RoleCounts};
use crate::util::vec2::Vec2;

/// Every message either side can send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Client -> host: join the session
    Join(JoinPayload),
    /// Client -> host: latest movement direction
    Input(InputPayload),
    /// Host -> client: full session snapshot, sent in reply to Join
    Welcome(WelcomePayload),
    /// Host -> all: per-tick snapshot
    State(StatePayload),
    /// Host -> all: match ended
    GameOver(GameOverPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPayload {
    pub nickname: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputPayload {
    pub dx: f32,
    pub dy: f32,
}

impl InputPayload {
    pub fn direction(&self) -> Vec2 {
        Vec2::new(self.dx, self.dy)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomePayload {
    /// Identity the host assigned to the receiving connection
    pub self_id: PlayerId,
    pub players: Vec<PlayerRecord>,
    pub obstacles: Vec<Obstacle>,
    pub phase: MatchPhase,
    pub time_left: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    pub players: Vec<PlayerRecord>,
    pub time_left: f32,
    pub phase: MatchPhase,
    #[serde(default)]
    pub counts: RoleCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameOverPayload {
    pub reason: MatchEndReason,
}

/// Player as seen on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub nickname: String,
    pub x: f32,
    pub y: f32,
    pub role: Role,
    #[serde(default)]
    pub is_bot: bool,
}

impl PlayerRecord {
    pub fn from_player(player: &Player) -> Self {
        Self {
            id: player.id,
            nickname: player.name.clone(),
            x: player.position.x,
            y: player.position.y,
            role: player.role(),
            is_bot: player.is_bot,
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

fn player_records(state: &GameState) -> Vec<PlayerRecord> {
    state.players.iter().map(PlayerRecord::from_player).collect()
}

impl Message {
    pub fn join(nickname: impl Into<String>) -> Self {
        Message::Join(JoinPayload {
            nickname: nickname.into(),
        })
    }

    /// Input message with the direction clamped to length 1
    pub fn input(direction: Vec2) -> Self {
        let d = if direction.is_finite() {
            direction.clamp_length(1.0)
        } else {
            Vec2::ZERO
        };
        Message::Input(InputPayload { dx: d.x, dy: d.y })
    }

    /// Full snapshot including obstacles for a newly joined connection
    pub fn welcome(state: &GameState, self_id: PlayerId) -> Self {
        Message::Welcome(WelcomePayload {
            self_id,
            players: player_records(state),
            obstacles: state.obstacles.clone(),
            phase: state.match_state.phase(),
            time_left: state.match_state.time_left(),
        })
    }

    /// Per-tick snapshot (no obstacles)
    pub fn state(state: &GameState) -> Self {
        Message::State(StatePayload {
            players: player_records(state),
            time_left: state.match_state.time_left(),
            phase: state.match_state.phase(),
            counts: state.counts,
        })
    }

    pub fn game_over(reason: MatchEndReason) -> Self {
        Message::GameOver(GameOverPayload { reason })
    }

    /// Wire tag, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Join(_) => "JOIN",
            Message::Input(_) => "INPUT",
            Message::Welcome(_) => "WELCOME",
            Message::State(_) => "STATE",
            Message::GameOver(_) => "GAME_OVER",
        }
    }
}

/// Encode a message as a JSON text frame
pub fn encode(message: &Message) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(message)?)
}

/// Decode a JSON text frame
pub fn decode(text: &str) -> Result<Message, DecodeError> {
    Ok(serde_json::from_str(text)?)
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(#[from] serde_json::Error);
